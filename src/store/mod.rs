//! Sound record storage
//!
//! The dispatcher persists every successful analysis through a `SoundStore`,
//! and the responder serves `clear_sounds`/`insert_sound`/`fetch_sounds`
//! from the same store.

mod json_file;
mod memory;

pub use json_file::JsonStore;
pub use memory::MemoryStore;

use crate::error::Result;
use crate::model::{SoundMetadata, SoundQuery};
use std::path::PathBuf;
use std::sync::Arc;

/// Storage backend for analyzed sounds
///
/// Inserts arrive concurrently from every pool worker.
pub trait SoundStore: Send + Sync {
    /// Persist one record. Inserting the same record twice stores it twice.
    fn insert(&self, record: &SoundMetadata) -> Result<()>;

    /// All records matching the query, in insertion order
    fn query(&self, filter: &SoundQuery) -> Result<Vec<SoundMetadata>>;

    /// Remove every record, returning how many were removed
    fn clear(&self) -> Result<usize>;
}

/// Open the configured store: a JSON-lines file, or memory when no path is given
pub fn open_store(path: Option<PathBuf>) -> Result<Arc<dyn SoundStore>> {
    match path {
        Some(path) => {
            log::info!("Using sound store at {:?}", path);
            Ok(Arc::new(JsonStore::open(path)?))
        }
        None => {
            log::info!("Using in-memory sound store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
