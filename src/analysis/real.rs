//! Decoding analyzer
//!
//! Decodes the file, measures level statistics and, unless disabled,
//! estimates tempo and key.

use super::decode::decode_to_mono;
use super::features::signal_stats;
use super::tempo::detect_tempo;
use super::traits::SoundAnalyzer;
use crate::model::SoundMetadata;
use anyhow::{Context, Result};
use std::path::Path;

/// Analyzer that decodes audio and extracts features
pub struct RealAnalyzer {
    /// Whether to run tempo/key detection
    detect_tempo: bool,
    /// Minimum BPM for detection range
    min_bpm: f32,
    /// Maximum BPM for detection range
    max_bpm: f32,
    /// Upper bound on decoded audio per file
    max_decode_secs: f32,
}

impl RealAnalyzer {
    pub fn new() -> Self {
        Self {
            detect_tempo: true,
            min_bpm: 70.0,
            max_bpm: 170.0,
            max_decode_secs: 120.0,
        }
    }

    /// Create analyzer with custom BPM range
    pub fn with_bpm_range(mut self, min: f32, max: f32) -> Self {
        self.min_bpm = min;
        self.max_bpm = max;
        self
    }

    /// Enable or disable tempo/key detection
    pub fn with_tempo(mut self, enable: bool) -> Self {
        self.detect_tempo = enable;
        self
    }

    /// Limit how much audio is decoded per file
    pub fn with_max_decode_secs(mut self, secs: f32) -> Self {
        self.max_decode_secs = secs;
        self
    }
}

impl Default for RealAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundAnalyzer for RealAnalyzer {
    fn analyze(&self, audio_path: &Path) -> Result<SoundMetadata> {
        log::debug!("Analyzing: {:?}", audio_path);

        let size_bytes = std::fs::metadata(audio_path)
            .with_context(|| format!("Failed to stat {:?}", audio_path))?
            .len();

        let audio = decode_to_mono(audio_path, self.max_decode_secs)?;
        let stats = signal_stats(&audio.samples, audio.sample_rate);

        let mut record = SoundMetadata::for_file(audio_path, size_bytes);
        record.duration_secs = Some(audio.duration_secs);
        record.sample_rate = Some(audio.sample_rate);
        record.channels = Some(audio.channels);
        record.peak = Some(stats.peak);
        record.rms = Some(stats.rms);
        record.zero_crossing_rate = Some(stats.zero_crossing_rate);

        // Tempo is best-effort: a decodable file is still a successful analysis
        if self.detect_tempo {
            match detect_tempo(&audio.samples, audio.sample_rate, self.min_bpm, self.max_bpm) {
                Ok(tempo) => {
                    log::debug!(
                        "Tempo {:.1} BPM, key {} for {:?}",
                        tempo.bpm,
                        tempo.key.as_deref().unwrap_or("unknown"),
                        audio_path
                    );
                    record.bpm = Some(tempo.bpm);
                    record.key = tempo.key;
                }
                Err(e) => {
                    log::warn!("Tempo detection failed for {:?}: {}", audio_path, e);
                }
            }
        }

        Ok(record)
    }

    fn name(&self) -> &'static str {
        "real"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_requires_file() {
        let result = RealAnalyzer::new().analyze(Path::new("/nonexistent/file.mp3"));
        assert!(result.is_err());
    }

    #[test]
    fn test_corrupt_file_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("b.wav");
        std::fs::write(&path, b"corrupt").unwrap();

        let result = RealAnalyzer::new().with_tempo(false).analyze(&path);
        assert!(result.is_err());
    }
}
