//! Analyzer trait definition

use crate::model::SoundMetadata;
use anyhow::Result;
use std::path::Path;

/// Sound analyzer trait - allows swapping between stub and real implementations
///
/// Implementations are shared by every worker of the pool, so `analyze`
/// may run concurrently on different files.
pub trait SoundAnalyzer: Send + Sync {
    /// Analyze an audio file and return its metadata record
    fn analyze(&self, audio_path: &Path) -> Result<SoundMetadata>;

    /// Short name for logs
    fn name(&self) -> &'static str {
        "analyzer"
    }
}
