//! Decoding of pull response bodies.
//!
//! The server prefixes every JSON response with `for(;;);` so that it cannot
//! be evaluated as a script by a third-party page. Decoding is three steps,
//! each with its own failure:
//!
//! 1. UTF-8 decode ([`PullError::InvalidUtf8`])
//! 2. Strip everything before the first `{` ([`PullError::NoJsonObject`])
//! 3. Parse JSON ([`PullError::InvalidJson`])
//!
//! # Examples
//!
//! ```
//! use pull_channel_http::protocol::{decode_body, strip_json_cruft};
//!
//! assert_eq!(strip_json_cruft(r#"for(;;);{"a":2}"#).unwrap(), r#"{"a":2}"#);
//!
//! let payload = decode_body(br#"for(;;);{"t":"heartbeat"}"#).unwrap();
//! assert_eq!(payload["t"], "heartbeat");
//! ```

use crate::error::{PullError, Result};
use bytes::Bytes;
use serde_json::Value;

/// Remove the cruft preceding the JSON object.
///
/// Returns the text starting at the first `{`.
pub fn strip_json_cruft(text: &str) -> Result<&str> {
    text.find('{')
        .map(|start| &text[start..])
        .ok_or_else(|| PullError::NoJsonObject {
            text: text.to_owned(),
        })
}

/// Parse JSON text, keeping the text in the error.
pub fn load_json(text: &str) -> Result<Value> {
    serde_json::from_str(text).map_err(|source| PullError::InvalidJson {
        text: text.to_owned(),
        source,
    })
}

/// Decode a raw response body into a payload.
pub fn decode_body(body: &[u8]) -> Result<Value> {
    let text = std::str::from_utf8(body).map_err(|source| PullError::InvalidUtf8 {
        body: Bytes::copy_from_slice(body),
        source,
    })?;
    load_json(strip_json_cruft(text)?)
}
