//! Error types for the PetPulse API client.
//!
//! # Design
//! HTTP error statuses only become errors at the `request_ok` layer. There,
//! every non-2xx response lands in `Status`, carrying the message the UI
//! shows plus the server's raw `detail` so form screens can map field-level
//! validation errors. Everything below the HTTP layer is `Transport`.

use serde_json::Value;
use thiserror::Error;

/// Errors returned by `ApiClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("{message}")]
    Status {
        message: String,
        status: u16,
        detail: Option<ErrorDetail>,
    },

    /// The request never produced an HTTP response (DNS, refused
    /// connection, TLS, broken pipe).
    #[error("transport error: {0}")]
    Transport(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A successful response did not have the expected shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// HTTP status for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&ErrorDetail> {
        match self {
            ApiError::Status { detail, .. } => detail.as_ref(),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(401)
    }
}

/// The server's `detail` field, passed through without flattening.
///
/// FastAPI-style backends send a plain string for most failures and a list
/// of per-field objects (`{"loc": [...], "msg": "...", "type": "..."}`) for
/// validation failures.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorDetail {
    Message(String),
    List(Vec<Value>),
}

impl ErrorDetail {
    /// Extract `detail` from a decoded error body. Only strings and arrays
    /// are recognized.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => Some(ErrorDetail::Message(text.clone())),
            Value::Array(items) => Some(ErrorDetail::List(items.clone())),
            _ => None,
        }
    }

    /// Human-readable rendering used as the error message.
    ///
    /// List entries render as their `msg` field when present, otherwise as
    /// the bare string or compact JSON, joined with `", "`. Returns `None`
    /// when the rendering is empty.
    pub fn summary(&self) -> Option<String> {
        let text = match self {
            ErrorDetail::Message(text) => text.clone(),
            ErrorDetail::List(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(text) => text.clone(),
                    Value::Object(map) => match map.get("msg") {
                        Some(Value::String(msg)) => msg.clone(),
                        _ => item.to_string(),
                    },
                    other => other.to_string(),
                })
                .collect::<Vec<_>>()
                .join(", "),
        };
        (!text.is_empty()).then_some(text)
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Deserialization(err.to_string())
    }
}

#[cfg(feature = "ureq")]
impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        ApiError::Transport(err.to_string())
    }
}
