//! Bounded worker pool for batch analysis

use super::cancel::CancelToken;
use crate::analysis::SoundAnalyzer;
use crate::error::{ErrorInfo, Result, SoundboyError};
use crate::model::{AnalysisOutcome, BatchSummary, SoundFile};
use crate::store::SoundStore;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tokio::sync::mpsc;

/// Number of workers used when no size is configured
pub const DEFAULT_POOL_SIZE: usize = 8;

/// Event emitted by a batch running in the background
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// One file settled
    Outcome(AnalysisOutcome),
    /// Every file settled, nothing follows
    Complete(BatchSummary),
}

/// Fixed-size pool of analysis workers
///
/// The worker threads are created once in `new` and reused for every file
/// of every batch, so at most `size` analyses run at any instant.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    size: usize,
    analyzer: Arc<dyn SoundAnalyzer>,
    store: Arc<dyn SoundStore>,
}

impl WorkerPool {
    /// Create a pool with `size` workers
    pub fn new(
        size: usize,
        analyzer: Arc<dyn SoundAnalyzer>,
        store: Arc<dyn SoundStore>,
    ) -> Result<Self> {
        if size == 0 {
            return Err(SoundboyError::Config(
                "worker pool size must be at least 1".to_string(),
            ));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("soundboy-worker-{}", i))
            .build()
            .map_err(|e| SoundboyError::Config(format!("Failed to create worker pool: {}", e)))?;

        log::info!(
            "Worker pool ready: {} workers, {} analyzer",
            size,
            analyzer.name()
        );

        Ok(Self {
            pool,
            size,
            analyzer,
            store,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn store(&self) -> &Arc<dyn SoundStore> {
        &self.store
    }

    /// Analyze a batch of files
    ///
    /// `on_outcome` runs on the worker that produced the outcome, so it is
    /// called concurrently and in completion order. `on_complete` runs once,
    /// after every outcome has been delivered.
    pub fn dispatch<F, C>(
        &self,
        files: Vec<SoundFile>,
        cancel: &CancelToken,
        on_outcome: F,
        on_complete: C,
    ) -> BatchSummary
    where
        F: Fn(AnalysisOutcome) + Sync,
        C: FnOnce(&BatchSummary),
    {
        let start = Instant::now();
        let total = files.len();
        log::info!("Dispatching {} files to {} workers", total, self.size);

        let succeeded = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let persist_failures = AtomicUsize::new(0);

        self.pool.install(|| {
            files.par_iter().for_each(|file| {
                let outcome = self.process(file, cancel, &persist_failures);
                if outcome.is_success() {
                    succeeded.fetch_add(1, Ordering::Relaxed);
                } else {
                    failed.fetch_add(1, Ordering::Relaxed);
                }
                on_outcome(outcome);
            });
        });

        let summary = BatchSummary {
            total,
            succeeded: succeeded.into_inner(),
            failed: failed.into_inner(),
            persist_failures: persist_failures.into_inner(),
            elapsed: start.elapsed(),
        };

        log::info!(
            "Batch complete in {:.2}s - {} succeeded, {} failed, {} not persisted",
            summary.elapsed.as_secs_f64(),
            summary.succeeded,
            summary.failed,
            summary.persist_failures
        );

        on_complete(&summary);
        summary
    }

    /// Run a batch on a background thread and receive its events in
    /// completion order
    ///
    /// The last event is always `BatchEvent::Complete`.
    pub fn dispatch_to_channel(
        self: &Arc<Self>,
        files: Vec<SoundFile>,
        cancel: CancelToken,
    ) -> Result<mpsc::UnboundedReceiver<BatchEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let pool = Arc::clone(self);

        thread::Builder::new()
            .name("soundboy-dispatch".to_string())
            .spawn(move || {
                let done_tx = tx.clone();
                pool.dispatch(
                    files,
                    &cancel,
                    |outcome| {
                        // Receiver gone means nobody is listening anymore
                        let _ = tx.send(BatchEvent::Outcome(outcome));
                    },
                    |summary| {
                        let _ = done_tx.send(BatchEvent::Complete(summary.clone()));
                    },
                );
            })?;

        Ok(rx)
    }

    /// Analyze and persist a single file
    fn process(
        &self,
        file: &SoundFile,
        cancel: &CancelToken,
        persist_failures: &AtomicUsize,
    ) -> AnalysisOutcome {
        if cancel.is_cancelled() {
            log::debug!("Skipping {:?}: batch cancelled", file.path);
            return AnalysisOutcome::Failure {
                file_path: file.path.clone(),
                error: ErrorInfo::from(SoundboyError::Cancelled),
            };
        }

        let analyzer = &self.analyzer;
        let result = panic::catch_unwind(AssertUnwindSafe(|| analyzer.analyze(&file.path)));

        match result {
            Ok(Ok(metadata)) => {
                if let Err(e) = self.store.insert(&metadata) {
                    log::warn!("Failed to persist {:?}: {}", file.path, e);
                    persist_failures.fetch_add(1, Ordering::Relaxed);
                }
                AnalysisOutcome::Success { metadata }
            }
            Ok(Err(e)) => {
                log::warn!("Analysis failed for {:?}: {:#}", file.path, e);
                AnalysisOutcome::Failure {
                    file_path: file.path.clone(),
                    error: ErrorInfo::from(SoundboyError::analysis(&file.path, format!("{:#}", e))),
                }
            }
            Err(panic_info) => {
                let message = panic_message(panic_info);
                log::error!("Analyzer panicked on {:?}: {}", file.path, message);
                AnalysisOutcome::Failure {
                    file_path: file.path.clone(),
                    error: ErrorInfo::from(SoundboyError::analysis(
                        &file.path,
                        format!("analyzer panicked: {}", message),
                    )),
                }
            }
        }
    }
}

fn panic_message(panic_info: Box<dyn Any + Send>) -> String {
    if let Some(s) = panic_info.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
