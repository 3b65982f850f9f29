//! The pull-protocol state machine.
//!
//! `PullSession` is sans-IO: it builds requests and interprets what came
//! back, but never touches the network. A driving loop (see
//! [`Listener`](crate::client::Listener)) repeats:
//!
//! 1. wait [`PullSession::delay_before_next_poll`]
//! 2. build [`PullSession::next_request`]
//! 3. send it through a [`Transport`](crate::client::Transport)
//! 4. feed the result to [`PullSession::handle`]
//!
//! Each request depends on state written by the previous response, so the
//! steps never overlap.
//!
//! # Examples
//!
//! ```
//! use pull_channel_http::client::PullSession;
//! use pull_channel_http::PullOutcome;
//! use serde_json::json;
//!
//! let mut session = PullSession::new();
//! let request = session.next_request();
//! assert_eq!(request.param("seq"), Some("0"));
//!
//! let outcome = session
//!     .handle_response(200, br#"for(;;);{"t":"msg","ms":[1,2,3],"seq":7}"#)
//!     .unwrap();
//! assert_eq!(outcome, PullOutcome::Frames(vec![json!(1), json!(2), json!(3)]));
//! assert_eq!(session.next_request().param("seq"), Some("7"));
//! ```

use crate::client::backoff::Backoff;
use crate::client::config::ClientConfig;
use crate::client::dispatcher::FrameDispatcher;
use crate::client::sequence::SequenceTracker;
use crate::client::utils::{is_success_status, is_unavailable_status};
use crate::error::{PullError, Result};
use crate::protocol::decode_body;
use crate::types::{Frame, HttpResponse, PullOutcome, PullRequest, TransportFailure};
use bytes::Bytes;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, trace};

/// Client side of one long-poll channel.
#[derive(Debug, Clone)]
pub struct PullSession {
    config: ClientConfig,
    tracker: SequenceTracker,
    backoff: Backoff,
}

impl PullSession {
    /// Create a session with the default configuration
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Create a session with a custom configuration
    pub fn with_config(config: ClientConfig) -> Self {
        Self::with_tracker(config, SequenceTracker::new())
    }

    /// Create a session resuming known routing state
    pub fn with_tracker(config: ClientConfig, tracker: SequenceTracker) -> Self {
        let backoff = Backoff::new(config.backoff_factor(), config.backoff_max());
        PullSession {
            config,
            tracker,
            backoff,
        }
    }

    /// Get the session configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Sequence and routing state
    pub fn tracker(&self) -> &SequenceTracker {
        &self.tracker
    }

    /// Backoff state
    pub fn backoff(&self) -> &Backoff {
        &self.backoff
    }

    /// Switch between reporting `active` and `offline`.
    pub fn set_mark_alive(&mut self, mark_alive: bool) {
        self.config.mark_alive = mark_alive;
    }

    /// How long to wait before the next poll, jittered.
    ///
    /// `None` means poll right away.
    pub fn delay_before_next_poll(&self) -> Option<Duration> {
        self.backoff.jittered_delay()
    }

    /// Build the next poll request.
    ///
    /// Clears any one-shot delay override; it has been waited out by now.
    pub fn next_request(&mut self) -> PullRequest {
        self.backoff.clear_override();
        let request = self
            .tracker
            .build_next_request(self.config.mark_alive, &self.config);
        trace!(seq = self.tracker.sequence(), "Built pull request");
        request
    }

    /// Feed a transport result into the session.
    pub fn handle(
        &mut self,
        result: std::result::Result<HttpResponse, TransportFailure>,
    ) -> Result<PullOutcome> {
        match result {
            Ok(response) => self.handle_response(response.status, &response.body),
            Err(failure) => Ok(self.handle_transport_failure(failure)),
        }
    }

    /// Interpret a completed HTTP exchange.
    ///
    /// 503 sets a flat delay and yields nothing. Any other non-2xx status is
    /// a protocol violation.
    pub fn handle_response(&mut self, status: u16, body: &[u8]) -> Result<PullOutcome> {
        if !is_success_status(status) {
            if is_unavailable_status(status) {
                // The server normally hands out this delay from its reconnect
                // endpoint; a fixed value stands in for it.
                error!("Server is unavailable");
                self.backoff.set_override(self.config.unavailable_delay());
                return Ok(self.backoff_outcome(Vec::new()));
            }
            return Err(PullError::UnexpectedStatus {
                status,
                body: Bytes::copy_from_slice(body),
            });
        }

        let payload = decode_body(body)?;
        self.handle_data(payload)
    }

    /// Dispatch an already decoded payload.
    ///
    /// State recorded before a protocol violation is kept: the sequence of
    /// the offending payload, and any earlier batch items, stay applied.
    pub fn handle_data(&mut self, payload: Value) -> Result<PullOutcome> {
        let dispatched =
            FrameDispatcher::new(&mut self.tracker, &mut self.backoff).dispatch(payload)?;

        if dispatched.backoff_requested {
            Ok(self.backoff_outcome(dispatched.frames))
        } else {
            Ok(PullOutcome::Frames(dispatched.frames))
        }
    }

    /// Account for a request that produced no response.
    pub fn handle_transport_failure(&mut self, failure: TransportFailure) -> PullOutcome {
        match failure {
            TransportFailure::ConnectionError => {
                error!(failures = self.backoff.failure_count() + 1, "Could not pull");
                self.backoff.record_failure();
                self.backoff_outcome(Vec::new())
            }
            TransportFailure::ConnectTimeout => {
                error!("Connection lost");
                self.backoff.set_override(self.config.connect_timeout_delay());
                self.backoff_outcome(Vec::new())
            }
            TransportFailure::ReadTimeout => {
                // The server may hold the poll open without data for a while.
                debug!("Read timeout");
                PullOutcome::Frames(Vec::new())
            }
        }
    }

    fn backoff_outcome(&self, frames: Vec<Frame>) -> PullOutcome {
        PullOutcome::Backoff {
            frames,
            delay: self.backoff.current_delay().unwrap_or_default(),
        }
    }
}

impl Default for PullSession {
    fn default() -> Self {
        Self::new()
    }
}
