// Response envelope types
//
// Every DVR endpoint wraps its payload as `{ "result": "success", "data": {...} }`.
// Failures come back in one of two shapes: `{ "result": "failed", "reason": "..." }`
// or `{ "version": "1.0", "error_code": "..." }`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The `result` value the DVR uses for successful calls.
pub const RESULT_SUCCESS: &str = "success";

/// The `result` value the DVR uses for rejected calls.
pub const RESULT_FAILED: &str = "failed";

/// A decoded error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorEnvelope {
    /// `{"result": "failed", "reason": "playback_mutex"}`
    Failed { result: String, reason: String },
    /// `{"version": "1.0", "error_code": "..."}`
    Invalid { version: String, error_code: String },
}

impl ErrorEnvelope {
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Failed { reason, .. } => Some(reason),
            Self::Invalid { .. } => None,
        }
    }

    pub fn error_code(&self) -> Option<&str> {
        match self {
            Self::Failed { .. } => None,
            Self::Invalid { error_code, .. } => Some(error_code),
        }
    }
}

/// A response body as the client received it.
///
/// JSON bodies are decoded; anything else is kept as raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    Json(Value),
    Raw(Vec<u8>),
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }

    /// The free-text `reason` of a `result="failed"` envelope.
    pub fn reason(&self) -> Option<&str> {
        self.as_json()?.get("reason")?.as_str()
    }

    /// The `error_code` of an invalid-request envelope.
    pub fn error_code(&self) -> Option<&str> {
        self.as_json()?.get("error_code")?.as_str()
    }

    /// Decode the body as one of the two error envelope shapes.
    pub fn envelope(&self) -> Option<ErrorEnvelope> {
        let value = self.as_json()?;
        ErrorEnvelope::deserialize(value).ok()
    }
}

impl fmt::Display for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(value) => write!(f, "{value}"),
            Self::Raw(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
        }
    }
}

/// True when a decoded 2xx body still reports `"result": "failed"`.
pub(crate) fn is_failed(value: &Value) -> bool {
    value.get("result").and_then(Value::as_str) == Some(RESULT_FAILED)
}
