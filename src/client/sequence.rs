//! Session continuity: sequence number, sticky routing, request building.
//!
//! The server keeps a sequence counter per channel and tells the client,
//! through `lb` messages, which backend it should stick to. Both have to be
//! echoed on every poll, otherwise the server may redeliver, skip, or route
//! the client to a backend that knows nothing about it.
//!
//! State here only changes from decoded server payloads. A payload without a
//! sequence field keeps the old value; an `lb_info` without a pool keeps the
//! old pool.

use crate::client::config::ClientConfig;
use crate::client::utils::random_hex;
use crate::error::{PullError, Result};
use crate::protocol::constants::{self, fields, params};
use crate::types::PullRequest;
use http::Method;
use serde_json::Value;

/// Last observed sequence and sticky routing identifiers of one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceTracker {
    client_id: String,
    sticky_token: Option<String>,
    sticky_pool: Option<String>,
    sequence: i64,
}

impl SequenceTracker {
    /// Start tracking with a fresh random client id.
    pub fn new() -> Self {
        Self::with_client_id(random_hex(constants::CLIENT_ID_BITS))
    }

    /// Start tracking with a known client id.
    pub fn with_client_id(client_id: impl Into<String>) -> Self {
        SequenceTracker {
            client_id: client_id.into(),
            sticky_token: None,
            sticky_pool: None,
            sequence: 0,
        }
    }

    /// Resume from known routing state, e.g. after restarting a poll loop.
    pub fn resume(
        client_id: impl Into<String>,
        sticky_token: Option<String>,
        sticky_pool: Option<String>,
        sequence: i64,
    ) -> Self {
        SequenceTracker {
            client_id: client_id.into(),
            sticky_token,
            sticky_pool,
            sequence,
        }
    }

    /// The stable client id of this session
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// The sticky token, once the server assigned one
    pub fn sticky_token(&self) -> Option<&str> {
        self.sticky_token.as_deref()
    }

    /// The sticky pool, once the server assigned one
    pub fn sticky_pool(&self) -> Option<&str> {
        self.sticky_pool.as_deref()
    }

    /// The last observed sequence number
    pub fn sequence(&self) -> i64 {
        self.sequence
    }

    /// Update the sequence from a payload.
    ///
    /// `s` takes precedence over `seq`; with neither, the sequence is kept.
    ///
    /// The server also detects "sequence regressions" using a `msgs_recv`
    /// count, but its detection does not reset the count when `seq` resets,
    /// so the count is not tracked here.
    pub fn record_sequence(&mut self, payload: &Value) -> Result<()> {
        for field in [fields::SHORT_SEQUENCE, fields::SEQUENCE] {
            if let Some(value) = payload.get(field) {
                self.sequence = parse_integer(value)
                    .ok_or_else(|| PullError::malformed(field, payload.clone()))?;
                return Ok(());
            }
        }
        Ok(())
    }

    /// Update sticky routing from an `lb` payload.
    ///
    /// Requires `lb_info.sticky`. `lb_info.pool` is only stored when present.
    pub fn record_routing(&mut self, payload: &Value) -> Result<()> {
        let malformed = || PullError::malformed(fields::LB_INFO, payload.clone());

        let lb_info = payload
            .get(fields::LB_INFO)
            .filter(|info| info.is_object())
            .ok_or_else(malformed)?;
        let token = lb_info
            .get(fields::STICKY)
            .and_then(token_string)
            .ok_or_else(malformed)?;
        let pool = match lb_info.get(fields::POOL) {
            None | Some(Value::Null) => None,
            Some(value) => Some(token_string(value).ok_or_else(malformed)?),
        };

        self.sticky_token = Some(token);
        if let Some(pool) = pool {
            self.sticky_pool = Some(pool);
        }
        Ok(())
    }

    /// Build the next poll request, echoing the tracked state.
    pub fn build_next_request(&self, mark_alive: bool, config: &ClientConfig) -> PullRequest {
        let state = if mark_alive { "active" } else { "offline" };
        PullRequest {
            method: Method::GET,
            secure: config.secure,
            host: config.host.clone(),
            path: config.path.clone(),
            params: vec![
                (params::CLIENT_ID, self.client_id.clone()),
                (params::STICKY_TOKEN, self.sticky_token.clone().unwrap_or_default()),
                (params::STICKY_POOL, self.sticky_pool.clone().unwrap_or_default()),
                (params::MSGS_RECV, "0".to_string()),
                (params::SEQ, self.sequence.to_string()),
                (params::STATE, state.to_string()),
            ],
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
        }
    }
}

impl Default for SequenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Integers arrive as JSON numbers or as numeric strings.
fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Routing tokens are strings, though some servers send them as numbers.
fn token_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
