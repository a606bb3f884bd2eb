//! Data model shared by the dispatcher, the store and the protocol
//!
//! These types are independent of how files are analyzed, where records
//! are stored, and how messages travel.

mod outcome;
mod query;
mod sound;

pub use outcome::{AnalysisOutcome, BatchSummary};
pub use query::SoundQuery;
pub use sound::{sound_id, AnalysisRequest, SoundFile, SoundMetadata};
