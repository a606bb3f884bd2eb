//! Soundboy - concurrent sound library analysis over a request/response channel
//!
//! A folder of audio files is enumerated, analyzed by a fixed-size worker
//! pool, persisted to a sound store and streamed back to the caller one
//! outcome at a time over a channel-based protocol.

pub mod analysis;
pub mod bridge;
pub mod config;
pub mod discovery;
pub mod error;
pub mod model;
pub mod pool;
pub mod protocol;
pub mod service;
pub mod store;

pub use config::AnalyzerConfig;
pub use error::{ErrorInfo, Result, SoundboyError};
pub use protocol::{IpcClient, Responder};
pub use service::{AnalysisReport, SoundClient};
