//! Error types for the pull protocol.
//!
//! Every variant of [`PullError`] is a protocol violation: the server said
//! something this crate does not know how to interpret. Transport problems
//! and server unavailability are not errors here; the session absorbs them
//! into a backoff decision (see [`crate::types::PullOutcome`]).
//!
//! The caller decides what to do with a violation, usually either abort or
//! start over with a fresh session. Nothing in this crate retries them.

use crate::protocol::MessageType;
use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, PullError>;

/// A wrong assumption about the server's pull protocol.
#[derive(Error, Debug)]
pub enum PullError {
    /// Non-2xx status code other than 503
    #[error("unknown server error response: {status}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: Bytes,
    },

    /// Response body is not valid UTF-8
    #[error("invalid unicode data in response body")]
    InvalidUtf8 {
        /// Raw response body
        body: Bytes,
        /// Decoder error
        #[source]
        source: std::str::Utf8Error,
    },

    /// No `{` anywhere in the response body
    #[error("no JSON object found: {text:?}")]
    NoJsonObject {
        /// Decoded response body
        text: String,
    },

    /// Response body failed to parse as JSON
    #[error("invalid JSON data: {source}")]
    InvalidJson {
        /// Decoded response body
        text: String,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },

    /// Recognized message type that this client deliberately does not handle
    #[error("unsupported protocol message `{kind}`")]
    UnsupportedMessage {
        /// The recognized type tag
        kind: MessageType,
        /// The offending payload
        payload: Value,
    },

    /// Message type tag is missing or unknown
    #[error("unknown protocol message {type_tag:?}")]
    UnknownMessage {
        /// The `t` field, if it was a string
        type_tag: Option<String>,
        /// The offending payload
        payload: Value,
    },

    /// A known message type is missing a field or has one of the wrong shape
    #[error("malformed `{field}` in protocol message {type_tag:?}")]
    MalformedMessage {
        /// Name of the offending field
        field: &'static str,
        /// The `t` field, if it was a string
        type_tag: Option<String>,
        /// The offending payload
        payload: Value,
    },

    /// Invalid client configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl PullError {
    /// Build a [`PullError::MalformedMessage`] for `payload`.
    pub(crate) fn malformed(field: &'static str, payload: Value) -> Self {
        PullError::MalformedMessage {
            field,
            type_tag: type_tag_of(&payload),
            payload,
        }
    }

    /// The type tag of the offending message, when the error came from one.
    pub fn type_tag(&self) -> Option<&str> {
        match self {
            PullError::UnsupportedMessage { kind, .. } => Some(kind.as_str()),
            PullError::UnknownMessage { type_tag, .. }
            | PullError::MalformedMessage { type_tag, .. } => type_tag.as_deref(),
            _ => None,
        }
    }

    /// The offending decoded payload, if the error came from dispatch.
    pub fn payload(&self) -> Option<&Value> {
        match self {
            PullError::UnsupportedMessage { payload, .. }
            | PullError::UnknownMessage { payload, .. }
            | PullError::MalformedMessage { payload, .. } => Some(payload),
            _ => None,
        }
    }

    /// Whether this error came from something the server sent.
    pub fn is_protocol_violation(&self) -> bool {
        !matches!(self, PullError::Config(_))
    }
}

pub(crate) fn type_tag_of(payload: &Value) -> Option<String> {
    payload.get("t").and_then(Value::as_str).map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_type_tag_from_unknown() {
        let err = PullError::UnknownMessage {
            type_tag: Some("nope".into()),
            payload: json!({"t": "nope"}),
        };
        assert_eq!(err.type_tag(), Some("nope"));
        assert!(err.is_protocol_violation());
    }

    #[test]
    fn test_malformed_keeps_payload() {
        let err = PullError::malformed("ms", json!({"t": "msg"}));
        assert_eq!(err.type_tag(), Some("msg"));
        assert_eq!(err.payload(), Some(&json!({"t": "msg"})));
        assert_eq!(err.to_string(), "malformed `ms` in protocol message Some(\"msg\")");
    }

    #[test]
    fn test_status_error_has_no_tag() {
        let err = PullError::UnexpectedStatus {
            status: 500,
            body: Bytes::new(),
        };
        assert_eq!(err.type_tag(), None);
        assert_eq!(err.to_string(), "unknown server error response: 500");
    }

    #[test]
    fn test_config_is_not_protocol_violation() {
        assert!(!PullError::Config("bad".into()).is_protocol_violation());
    }
}
