//! Streams batch analysis outcomes back over the protocol
//!
//! The bridge enumerates the requested folder, hands the files to the worker
//! pool and forwards each outcome the moment it settles. A batch ends with
//! exactly one terminal response: `{ done: true }` after the last outcome,
//! or a single error if the folder cannot be enumerated.

use crate::discovery;
use crate::error::{Result, SoundboyError};
use crate::model::{AnalysisOutcome, AnalysisRequest, BatchSummary};
use crate::pool::{BatchEvent, CancelToken, WorkerPool};
use crate::protocol::{Reply, Response};
use std::sync::Arc;

/// Connects analysis requests to the worker pool
#[derive(Clone)]
pub struct AnalysisBridge {
    pool: Arc<WorkerPool>,
}

impl AnalysisBridge {
    pub fn new(pool: Arc<WorkerPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<WorkerPool> {
        &self.pool
    }

    /// Analyze `request.root_folder`, replying through `reply`
    ///
    /// On `Err` nothing terminal has been sent yet; the caller reports the
    /// error as the one terminal response.
    pub async fn run(
        &self,
        request: AnalysisRequest,
        reply: &Reply,
        cancel: CancelToken,
    ) -> Result<BatchSummary> {
        let root = request.root_folder;
        let files = tokio::task::spawn_blocking(move || discovery::enumerate(&root))
            .await
            .map_err(|e| SoundboyError::InvalidRequest(format!("enumeration task failed: {}", e)))??;

        let mut events = self.pool.dispatch_to_channel(files, cancel.clone())?;
        let mut summary = None;

        while let Some(event) = events.recv().await {
            match event {
                BatchEvent::Outcome(outcome) => {
                    if reply.send(&outcome_response(outcome)).is_err() && !cancel.is_cancelled() {
                        log::info!(
                            "Nobody is reading {}, skipping the remaining files",
                            reply.channel()
                        );
                        cancel.cancel();
                    }
                }
                BatchEvent::Complete(done) => {
                    summary = Some(done);
                    break;
                }
            }
        }

        let Some(summary) = summary else {
            log::error!("Dispatcher for {} stopped before completing", reply.channel());
            return Err(SoundboyError::Cancelled);
        };

        if let Err(e) = reply.send(&Response::done()) {
            log::debug!("Could not send completion on {}: {}", reply.channel(), e);
        }
        Ok(summary)
    }
}

/// Wire shape of one outcome
///
/// Successes carry the record as `result`. Failures carry the error plus
/// `result.filename` so the caller knows which file failed.
pub fn outcome_response(outcome: AnalysisOutcome) -> Response {
    match outcome {
        AnalysisOutcome::Success { metadata } => match serde_json::to_value(&metadata) {
            Ok(value) => Response::result(value),
            Err(e) => {
                log::error!("Cannot serialize record for {}: {}", metadata.filename, e);
                Response::file_failure(SoundboyError::from(e).into(), &metadata.filename)
            }
        },
        AnalysisOutcome::Failure { file_path, error } => {
            Response::file_failure(error, &file_path.to_string_lossy())
        }
    }
}
