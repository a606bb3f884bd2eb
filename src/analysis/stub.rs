//! Stub analyzer
//!
//! Skips decoding entirely and records file-level metadata only.
//! Useful for fast catalog passes over large trees.

use super::traits::SoundAnalyzer;
use crate::model::SoundMetadata;
use anyhow::{Context, Result};
use std::path::Path;

/// Stub analyzer that reads file metadata without decoding audio
pub struct StubAnalyzer;

impl StubAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StubAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundAnalyzer for StubAnalyzer {
    fn analyze(&self, audio_path: &Path) -> Result<SoundMetadata> {
        log::debug!("Stub analysis for: {:?}", audio_path);

        let metadata = std::fs::metadata(audio_path)
            .with_context(|| format!("Failed to stat {:?}", audio_path))?;

        if !metadata.is_file() {
            anyhow::bail!("Not a regular file");
        }
        if metadata.len() == 0 {
            anyhow::bail!("Empty file");
        }

        Ok(SoundMetadata::for_file(audio_path, metadata.len()))
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stub_analyzer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("test.mp3");
        std::fs::write(&path, b"dummy audio data").unwrap();

        let result = StubAnalyzer::new().analyze(&path).unwrap();

        assert_eq!(result.filename, path.to_string_lossy());
        assert_eq!(result.format, "mp3");
        assert_eq!(result.size_bytes, 16);
        // Stub analyzer leaves all decoded fields empty
        assert!(result.duration_secs.is_none());
        assert!(result.bpm.is_none());
    }

    #[test]
    fn test_stub_rejects_empty_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.wav");
        std::fs::write(&path, b"").unwrap();

        assert!(StubAnalyzer::new().analyze(&path).is_err());
    }
}
