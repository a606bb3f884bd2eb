use super::SoundMetadata;
use crate::error::ErrorInfo;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of analyzing one sound file
///
/// The dispatcher produces exactly one of these per submitted file.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Success { metadata: SoundMetadata },
    Failure { file_path: PathBuf, error: ErrorInfo },
}

impl AnalysisOutcome {
    /// Path of the file this outcome belongs to
    pub fn file_path(&self) -> &Path {
        match self {
            AnalysisOutcome::Success { metadata } => metadata.path(),
            AnalysisOutcome::Failure { file_path, .. } => file_path,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisOutcome::Success { .. })
    }
}

/// Counts for a finished batch, handed to the completion callback
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    /// Files submitted
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Successful analyses the store rejected
    pub persist_failures: usize,
    pub elapsed: Duration,
}

impl BatchSummary {
    /// Number of outcomes delivered
    pub fn settled(&self) -> usize {
        self.succeeded + self.failed
    }
}
