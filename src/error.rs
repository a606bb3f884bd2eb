//! Error types for soundboy
//!
//! Error strategy:
//! - Per-file errors (analysis): converted into `Failure` outcomes, never abort the batch
//! - Batch errors (enumeration, transport): returned to the immediate caller
//! - Persistence errors: logged and counted, the analysis outcome still goes out

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for soundboy operations
#[derive(Debug, Error)]
pub enum SoundboyError {
    #[error("Cannot enumerate sound files under '{root}': {reason}")]
    Enumeration { root: PathBuf, reason: String },

    #[error("Analysis failed for '{path}': {reason}")]
    Analysis { path: PathBuf, reason: String },

    #[error("Failed to persist sound record: {reason}")]
    Persistence { reason: String },

    #[error("No response on '{channel}' before the deadline")]
    Timeout { channel: String },

    #[error("Transport is not initialized; call transport::init before using a channel")]
    TransportUnavailable,

    #[error("Transport connection is closed")]
    TransportClosed,

    #[error("Transport is already initialized")]
    AlreadyInitialized,

    #[error("Malformed message: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Unknown channel: {0}")]
    UnknownChannel(String),

    #[error("Remote error: {0}")]
    Remote(ErrorInfo),

    #[error("Analysis cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for soundboy operations
pub type Result<T> = std::result::Result<T, SoundboyError>;

impl SoundboyError {
    /// Stable snake_case name used as `ErrorInfo::kind` on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            SoundboyError::Enumeration { .. } => "enumeration",
            SoundboyError::Analysis { .. } => "analysis",
            SoundboyError::Persistence { .. } => "persistence",
            SoundboyError::Timeout { .. } => "timeout",
            SoundboyError::TransportUnavailable => "transport_unavailable",
            SoundboyError::TransportClosed => "transport_closed",
            SoundboyError::AlreadyInitialized => "already_initialized",
            SoundboyError::Serialization(_) => "serialization",
            SoundboyError::InvalidRequest(_) => "invalid_request",
            SoundboyError::UnknownChannel(_) => "unknown_channel",
            SoundboyError::Remote(info) => remote_kind(info),
            SoundboyError::Cancelled => "cancelled",
            SoundboyError::Config(_) => "config",
            SoundboyError::Io(_) => "io",
        }
    }

    /// Returns true if this error only affects a single file
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            SoundboyError::Analysis { .. } | SoundboyError::Cancelled
        )
    }

    /// Build an analysis error from any displayable cause
    pub fn analysis(path: impl Into<PathBuf>, reason: impl fmt::Display) -> Self {
        SoundboyError::Analysis {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a persistence error from any displayable cause
    pub fn persistence(reason: impl fmt::Display) -> Self {
        SoundboyError::Persistence {
            reason: reason.to_string(),
        }
    }
}

// Remote errors keep whatever kind the peer reported. The kinds we know are
// mapped back to static strings, anything else collapses to "remote".
fn remote_kind(info: &ErrorInfo) -> &'static str {
    match info.kind.as_str() {
        "enumeration" => "enumeration",
        "analysis" => "analysis",
        "persistence" => "persistence",
        "cancelled" => "cancelled",
        "invalid_request" => "invalid_request",
        "unknown_channel" => "unknown_channel",
        _ => "remote",
    }
}

/// Serializable error carried inside protocol responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Machine-readable error class (see `SoundboyError::kind`)
    pub kind: String,

    /// Human-readable description
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

impl From<&SoundboyError> for ErrorInfo {
    fn from(err: &SoundboyError) -> Self {
        match err {
            // Don't nest "Remote error:" prefixes when relaying
            SoundboyError::Remote(info) => info.clone(),
            other => ErrorInfo::new(other.kind(), other.to_string()),
        }
    }
}

impl From<SoundboyError> for ErrorInfo {
    fn from(err: SoundboyError) -> Self {
        ErrorInfo::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_kind() {
        let err = SoundboyError::analysis("/music/b.wav", "decode failure");
        let info = ErrorInfo::from(&err);

        assert_eq!(info.kind, "analysis");
        assert!(info.message.contains("b.wav"));
        assert!(info.message.contains("decode failure"));
    }

    #[test]
    fn test_remote_error_is_not_rewrapped() {
        let original = ErrorInfo::new("enumeration", "missing root");
        let err = SoundboyError::Remote(original.clone());

        assert_eq!(ErrorInfo::from(&err), original);
        assert_eq!(err.kind(), "enumeration");
    }

    #[test]
    fn test_per_file_classification() {
        assert!(SoundboyError::analysis("/a.mp3", "x").is_per_file());
        assert!(SoundboyError::Cancelled.is_per_file());
        assert!(!SoundboyError::TransportUnavailable.is_per_file());
        assert!(!SoundboyError::Enumeration {
            root: PathBuf::from("/missing"),
            reason: "not found".to_string(),
        }
        .is_per_file());
    }

    #[test]
    fn test_error_info_json_shape() {
        let info = ErrorInfo::new("analysis", "bad file");
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["kind"], "analysis");
        assert_eq!(json["message"], "bad file");
    }
}
