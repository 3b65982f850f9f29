//! Core value types of the pull protocol.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Frame`] | One application-level message from a `msg`/`fullReload` payload |
//! | [`PullRequest`] | Description of the next poll to send |
//! | [`HttpResponse`] | What a transport got back |
//! | [`TransportFailure`] | What a transport failed with |
//! | [`PullOutcome`] | Result of handling one poll cycle |

use crate::client::build_url;
use crate::protocol::constants::params;
use bytes::Bytes;
use http::Method;
use std::time::Duration;
use thiserror::Error;

/// An application-level message unit.
///
/// Frames are opaque to this crate; they are passed through in the order the
/// server sent them.
pub type Frame = serde_json::Value;

/// A poll request, ready to hand to a [`Transport`](crate::client::Transport).
///
/// Query parameters keep their wire order. Authentication parameters are not
/// part of the request; the transport attaches them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// HTTP method, always GET
    pub method: Method,
    /// Whether to use https
    pub secure: bool,
    /// Host of the pull endpoint
    pub host: String,
    /// Path of the pull endpoint
    pub path: String,
    /// Ordered query parameters
    pub params: Vec<(&'static str, String)>,
    /// Time allowed to establish the connection
    pub connect_timeout: Duration,
    /// Longest quiet period allowed while waiting for the response
    ///
    /// [`ReqwestTransport`](crate::client::ReqwestTransport) fixes both
    /// timeouts when its client is built, from the same configuration.
    pub read_timeout: Duration,
}

impl PullRequest {
    /// Look up a query parameter by name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The tracked sequence echoed by this request.
    pub fn seq(&self) -> Option<i64> {
        self.param(params::SEQ).and_then(|seq| seq.parse().ok())
    }

    /// Full request URL including the query string.
    pub fn url(&self) -> String {
        build_url(
            self.secure,
            &self.host,
            &self.path,
            self.params.iter().map(|(k, v)| (*k, v.as_str())),
        )
    }
}

/// A completed HTTP exchange, whatever its status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body bytes
    pub body: Bytes,
}

impl HttpResponse {
    /// Create a response from a status and body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        HttpResponse {
            status,
            body: body.into(),
        }
    }
}

/// The ways a transport can fail without producing a response.
///
/// None of these are fatal; the session turns each into a backoff decision.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFailure {
    /// Connection refused, reset, DNS failure and the like
    #[error("could not pull: connection error")]
    ConnectionError,
    /// Connection was not established in time
    #[error("connection lost: connect timeout")]
    ConnectTimeout,
    /// Server held the poll open without answering in time
    #[error("read timeout")]
    ReadTimeout,
}

/// What one poll cycle produced.
#[derive(Debug, Clone, PartialEq)]
pub enum PullOutcome {
    /// Normal cycle; poll again right away.
    ///
    /// May be empty (heartbeat, routing update, read timeout).
    Frames(Vec<Frame>),

    /// The server or the transport asked for a delay.
    ///
    /// `frames` holds anything decoded before the signal in the same
    /// response; the sequence has already moved past them.
    Backoff {
        /// Frames decoded in the same response
        frames: Vec<Frame>,
        /// Nominal delay now due, before jitter
        delay: Duration,
    },
}

impl PullOutcome {
    /// Frames of this cycle, in order.
    pub fn frames(&self) -> &[Frame] {
        match self {
            PullOutcome::Frames(frames) | PullOutcome::Backoff { frames, .. } => frames,
        }
    }

    /// Consume into the frames of this cycle.
    pub fn into_frames(self) -> Vec<Frame> {
        match self {
            PullOutcome::Frames(frames) | PullOutcome::Backoff { frames, .. } => frames,
        }
    }

    /// Whether the cycle asked for a delay.
    pub fn is_backoff(&self) -> bool {
        matches!(self, PullOutcome::Backoff { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> PullRequest {
        PullRequest {
            method: Method::GET,
            secure: true,
            host: "example.com".into(),
            path: "/pull".into(),
            params: vec![("clientid", "beef".into()), ("seq", "6".into())],
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(60),
        }
    }

    #[test]
    fn test_request_params() {
        let req = request();
        assert_eq!(req.param("clientid"), Some("beef"));
        assert_eq!(req.param("missing"), None);
        assert_eq!(req.seq(), Some(6));
        assert_eq!(req.url(), "https://example.com/pull?clientid=beef&seq=6");
    }

    #[test]
    fn test_outcome_frames() {
        let outcome = PullOutcome::Backoff {
            frames: vec![json!(1)],
            delay: Duration::from_secs(5),
        };
        assert!(outcome.is_backoff());
        assert_eq!(outcome.frames(), &[json!(1)]);
        assert_eq!(PullOutcome::Frames(vec![json!(2)]).into_frames(), vec![json!(2)]);
    }
}
