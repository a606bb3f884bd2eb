//! Worker pool dispatcher
//!
//! Runs a batch of files through a fixed set of analysis workers, persists
//! each success and reports every outcome as soon as it settles.

mod cancel;
mod dispatcher;

pub use cancel::CancelToken;
pub use dispatcher::{BatchEvent, WorkerPool, DEFAULT_POOL_SIZE};
