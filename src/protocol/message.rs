//! The closed set of pull message types.
//!
//! Every payload carries a `t` tag. Tags map onto [`MessageType`]; anything
//! outside this set is rejected by the dispatcher rather than ignored, since
//! an unrecognized message may carry state the client needs.

use std::fmt;

/// A recognized value of a payload's `t` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Application frames in `ms`
    Msg,
    /// Optional frames in `ms`; some events may have been missed
    FullReload,
    /// Nested payloads in `batches`
    Batched,
    /// Server asks the client to slow down
    Backoff,
    /// Keep-alive
    Heartbeat,
    /// Sticky routing update in `lb_info`
    Lb,
    /// Unused by the server
    Continue,
    /// Server wants a reconnect handshake
    Refresh,
    /// Delayed variant of [`MessageType::Refresh`]
    RefreshDelay,
    /// Unused by the server
    TestStreaming,
}

impl MessageType {
    /// Look up a type by its wire tag.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "msg" => MessageType::Msg,
            "fullReload" => MessageType::FullReload,
            "batched" => MessageType::Batched,
            "backoff" => MessageType::Backoff,
            "heartbeat" => MessageType::Heartbeat,
            "lb" => MessageType::Lb,
            "continue" => MessageType::Continue,
            "refresh" => MessageType::Refresh,
            "refreshDelay" => MessageType::RefreshDelay,
            "test_streaming" => MessageType::TestStreaming,
            _ => return None,
        })
    }

    /// The wire tag.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageType::Msg => "msg",
            MessageType::FullReload => "fullReload",
            MessageType::Batched => "batched",
            MessageType::Backoff => "backoff",
            MessageType::Heartbeat => "heartbeat",
            MessageType::Lb => "lb",
            MessageType::Continue => "continue",
            MessageType::Refresh => "refresh",
            MessageType::RefreshDelay => "refreshDelay",
            MessageType::TestStreaming => "test_streaming",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
