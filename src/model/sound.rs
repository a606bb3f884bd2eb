use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Request to analyze every sound file under a folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Root of the tree to enumerate
    pub root_folder: PathBuf,
}

impl AnalysisRequest {
    pub fn new(root_folder: impl Into<PathBuf>) -> Self {
        Self {
            root_folder: root_folder.into(),
        }
    }
}

/// A candidate audio file found by enumeration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SoundFile {
    pub path: PathBuf,
}

impl SoundFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Lowercased file extension, if any
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }
}

/// Analysis record for one sound file
///
/// Produced by a `SoundAnalyzer`, persisted by a `SoundStore` and streamed
/// to callers as the `result` of a protocol response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundMetadata {
    /// Stable identifier (md5 of the file path)
    pub id: String,

    /// Originating file path
    pub filename: String,

    /// Container format, from the file extension (mp3, wav, aif, flac)
    pub format: String,

    /// File size in bytes
    pub size_bytes: u64,

    /// Decoded duration in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u16>,

    /// Peak absolute amplitude (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peak: Option<f32>,

    /// Root mean square level (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rms: Option<f32>,

    /// Zero crossings per second of mono signal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zero_crossing_rate: Option<f32>,

    /// Detected tempo, folded into the configured range
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<f32>,

    /// Detected musical key name (e.g. "A minor")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// When the analysis finished
    pub analyzed_at: DateTime<Utc>,
}

impl SoundMetadata {
    /// Create a record carrying only file-level information
    pub fn for_file(path: &Path, size_bytes: u64) -> Self {
        let filename = path.to_string_lossy().to_string();
        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        Self {
            id: sound_id(path),
            filename,
            format,
            size_bytes,
            duration_secs: None,
            sample_rate: None,
            channels: None,
            peak: None,
            rms: None,
            zero_crossing_rate: None,
            bpm: None,
            key: None,
            analyzed_at: Utc::now(),
        }
    }

    /// Originating file path
    pub fn path(&self) -> &Path {
        Path::new(&self.filename)
    }
}

/// Deterministic record ID from a file path
pub fn sound_id(path: &Path) -> String {
    format!("{:x}", md5::compute(path.to_string_lossy().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sound_id_deterministic() {
        let a = sound_id(Path::new("/music/a.mp3"));
        let b = sound_id(Path::new("/music/a.mp3"));
        let c = sound_id(Path::new("/music/b.mp3"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn test_for_file_carries_path() {
        let meta = SoundMetadata::for_file(Path::new("/music/Loop.WAV"), 1024);
        assert_eq!(meta.filename, "/music/Loop.WAV");
        assert_eq!(meta.format, "wav");
        assert_eq!(meta.size_bytes, 1024);
        assert_eq!(meta.path(), Path::new("/music/Loop.WAV"));
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let meta = SoundMetadata::for_file(Path::new("/music/a.flac"), 10);
        let json = serde_json::to_value(&meta).unwrap();

        assert_eq!(json["filename"], "/music/a.flac");
        assert_eq!(json["sizeBytes"], 10);
        assert!(json.get("bpm").is_none());
        assert!(json.get("analyzedAt").is_some());
    }

    #[test]
    fn test_analysis_request_wire_name() {
        let req = AnalysisRequest::new("/music");
        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"rootFolder":"/music"}"#);
    }
}
