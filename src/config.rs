//! Analyzer configuration

use crate::analysis::{RealAnalyzer, SoundAnalyzer, StubAnalyzer};
use crate::error::{Result, SoundboyError};
use crate::pool::{WorkerPool, DEFAULT_POOL_SIZE};
use crate::store::{self, SoundStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for the analysis service
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Number of analysis workers
    pub pool_size: usize,

    /// JSON-lines store file (None = in-memory store)
    pub store_path: Option<PathBuf>,

    /// Whether to run tempo/key detection
    pub detect_tempo: bool,

    pub min_bpm: f32,
    pub max_bpm: f32,

    /// Upper bound on decoded audio per file, in seconds
    pub max_decode_secs: f32,

    /// Record file-level data only, without decoding
    pub quick: bool,
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self {
            pool_size: DEFAULT_POOL_SIZE,
            store_path: None,
            detect_tempo: true,
            min_bpm: 70.0,
            max_bpm: 170.0,
            max_decode_secs: 120.0,
            quick: false,
        }
    }

    /// Set the number of workers
    pub fn with_pool_size(mut self, size: usize) -> Self {
        self.pool_size = size;
        self
    }

    /// Persist records to a JSON-lines file; `~` is expanded
    pub fn with_store_path(mut self, path: impl AsRef<str>) -> Self {
        let expanded = shellexpand::tilde(path.as_ref()).to_string();
        self.store_path = Some(PathBuf::from(expanded));
        self
    }

    pub fn with_tempo(mut self, enable: bool) -> Self {
        self.detect_tempo = enable;
        self
    }

    pub fn with_bpm_range(mut self, min: f32, max: f32) -> Self {
        self.min_bpm = min;
        self.max_bpm = max;
        self
    }

    pub fn with_max_decode_secs(mut self, secs: f32) -> Self {
        self.max_decode_secs = secs;
        self
    }

    /// Skip decoding entirely
    pub fn with_quick(mut self, quick: bool) -> Self {
        self.quick = quick;
        self
    }

    /// Check the values before anything is built
    pub fn validate(&self) -> Result<()> {
        if self.pool_size == 0 {
            return Err(SoundboyError::Config(
                "worker pool size must be at least 1".to_string(),
            ));
        }
        if !(self.min_bpm > 0.0 && self.min_bpm < self.max_bpm) {
            return Err(SoundboyError::Config(format!(
                "invalid BPM range {}-{}",
                self.min_bpm, self.max_bpm
            )));
        }
        if self.max_decode_secs <= 0.0 {
            return Err(SoundboyError::Config(
                "max decode length must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Analyzer selected by this configuration
    pub fn analyzer(&self) -> Arc<dyn SoundAnalyzer> {
        if self.quick {
            log::info!("Using stub analyzer (quick mode, no decoding)");
            Arc::new(StubAnalyzer::new())
        } else {
            log::info!(
                "Using real analyzer (tempo: {}, range {}-{} BPM)",
                if self.detect_tempo { "on" } else { "off" },
                self.min_bpm,
                self.max_bpm
            );
            Arc::new(
                RealAnalyzer::new()
                    .with_tempo(self.detect_tempo)
                    .with_bpm_range(self.min_bpm, self.max_bpm)
                    .with_max_decode_secs(self.max_decode_secs),
            )
        }
    }

    pub fn open_store(&self) -> Result<Arc<dyn SoundStore>> {
        store::open_store(self.store_path.clone())
    }

    /// Build the worker pool with this configuration's analyzer and store
    pub fn build_pool(&self) -> Result<WorkerPool> {
        self.validate()?;
        WorkerPool::new(self.pool_size, self.analyzer(), self.open_store()?)
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.pool_size, 8);
        assert!(config.store_path.is_none());
        assert!(config.detect_tempo);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AnalyzerConfig::new().with_pool_size(0).validate().is_err());
        assert!(AnalyzerConfig::new()
            .with_bpm_range(180.0, 90.0)
            .validate()
            .is_err());
        assert!(AnalyzerConfig::new()
            .with_max_decode_secs(0.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_tilde_expanded() {
        let config = AnalyzerConfig::new().with_store_path("~/sounds.jsonl");
        let path = config.store_path.unwrap();
        assert!(path.ends_with("sounds.jsonl"));
        if std::env::var_os("HOME").is_some() {
            assert!(!path.to_string_lossy().starts_with('~'));
        }
    }

    #[test]
    fn test_quick_selects_stub() {
        assert_eq!(AnalyzerConfig::new().with_quick(true).analyzer().name(), "stub");
        assert_eq!(AnalyzerConfig::new().analyzer().name(), "real");
    }

    #[test]
    fn test_build_pool_with_file_store() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sounds.jsonl");
        let config = AnalyzerConfig::new()
            .with_pool_size(2)
            .with_store_path(path.to_string_lossy());

        let pool = config.build_pool().unwrap();
        assert_eq!(pool.size(), 2);
    }
}
