//! Wire-level message types

use crate::error::{ErrorInfo, Result, SoundboyError};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};

/// Channel names understood by the responder
pub mod channels {
    /// Single-shot, no params. Removes every stored record.
    pub const CLEAR_SOUNDS: &str = "clear_sounds";
    /// Single-shot, params = [serialized record]
    pub const INSERT_SOUND: &str = "insert_sound";
    /// Single-shot, params = [serialized query]
    pub const FETCH_SOUNDS: &str = "fetch_sounds";
    /// Streaming, params = [serialized AnalysisRequest]
    pub const ANALYZE_SOUNDS: &str = "analyze_sounds";
    /// Control message, params = [response channels to cancel]. Never answered.
    pub const CANCEL_REQUEST: &str = "cancel_request";
}

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Generate a response channel id for a request on `channel`
///
/// The millisecond timestamp keeps ids readable, the process-wide sequence
/// number keeps them unique within the same millisecond.
pub fn response_channel_for(channel: &str) -> String {
    let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!(
        "{}_response_{}_{}",
        channel,
        Utc::now().timestamp_millis(),
        seq
    )
}

/// One framed message on the transport
///
/// Requests carry the name of the target channel and a `response_channel`.
/// Responses travel on the request's response channel with the serialized
/// `Response` as their only param.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolMessage {
    pub channel: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_channel: Option<String>,

    #[serde(default)]
    pub params: Vec<String>,
}

impl ProtocolMessage {
    /// Frame a request for `channel`
    pub fn request(channel: &str, request: Request) -> Self {
        Self {
            channel: channel.to_string(),
            response_channel: request.response_channel,
            params: request.params,
        }
    }

    /// Frame a response for delivery on `response_channel`
    pub fn response(response_channel: &str, response: &Response) -> Result<Self> {
        Ok(Self {
            channel: response_channel.to_string(),
            response_channel: None,
            params: vec![serde_json::to_string(response)?],
        })
    }

    /// First param, where responses keep their payload
    pub fn payload(&self) -> Option<&str> {
        self.params.first().map(String::as_str)
    }
}

/// Outbound request body
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Correlation id; generated on send when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_channel: Option<String>,

    /// Serialized parameters
    #[serde(default)]
    pub params: Vec<String>,
}

impl Request {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a caller-supplied correlation id
    pub fn with_response_channel(mut self, id: impl Into<String>) -> Self {
        self.response_channel = Some(id.into());
        self
    }

    /// Append a raw string param
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Append a param serialized as JSON
    pub fn with_json_param<T: Serialize>(mut self, value: &T) -> Result<Self> {
        self.params.push(serde_json::to_string(value)?);
        Ok(self)
    }

    /// Fill in the correlation id if missing and return it
    pub fn ensure_response_channel(&mut self, channel: &str) -> String {
        self.response_channel
            .get_or_insert_with(|| response_channel_for(channel))
            .clone()
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Inbound response body: `{ done?, error?, result? }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Terminal marker for streaming requests
    #[serde(default, skip_serializing_if = "is_false")]
    pub done: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

impl Response {
    /// Successful response carrying `result`
    pub fn result(result: Value) -> Self {
        Self {
            result: Some(result),
            ..Self::default()
        }
    }

    /// Error response
    pub fn error(error: ErrorInfo) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    /// Terminal `{ done: true }` message
    pub fn done() -> Self {
        Self {
            done: true,
            ..Self::default()
        }
    }

    /// Mark this response as the last one of a stream
    pub fn with_done(mut self) -> Self {
        self.done = true;
        self
    }

    /// Failed file inside an analysis stream: `{ error, result: { filename } }`
    pub fn file_failure(error: ErrorInfo, filename: &str) -> Self {
        Self {
            done: false,
            error: Some(error),
            result: Some(serde_json::json!({ "filename": filename })),
        }
    }

    /// `result.filename`, when present
    pub fn filename(&self) -> Option<&str> {
        self.result.as_ref()?.get("filename")?.as_str()
    }

    /// Turn this response into a typed result, surfacing remote errors
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        if let Some(error) = self.error {
            return Err(SoundboyError::Remote(error));
        }
        Ok(serde_json::from_value(self.result.unwrap_or(Value::Null))?)
    }
}
