//! Routing of decoded payloads by their `t` tag.
//!
//! | tag | effect | frames | backoff |
//! |-----|--------|--------|---------|
//! | `msg` | `ms` list required | each element | reset |
//! | `fullReload` | `ms` list optional | each element, if any | reset |
//! | `batched` | dispatch each of `batches` in order | flattened | via items |
//! | `backoff` | server asks to slow down | none | one failure |
//! | `heartbeat` | keep-alive | none | none |
//! | `lb` | sticky routing update | none | none |
//! | `continue` | unused | none | reset, then error |
//! | `refresh`, `refreshDelay` | reconnect handshake, not implemented | none | error |
//! | `test_streaming` | unused | none | error |
//! | other | | | error |
//!
//! Every payload, nested ones included, updates the tracked sequence before
//! its tag is looked at.

use crate::client::backoff::Backoff;
use crate::client::sequence::SequenceTracker;
use crate::error::{type_tag_of, PullError, Result};
use crate::protocol::constants::fields;
use crate::protocol::MessageType;
use crate::types::Frame;
use serde_json::Value;
use tracing::{debug, warn};

/// Result of dispatching one top-level payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dispatched {
    /// Frames in server order, batches flattened
    pub frames: Vec<Frame>,
    /// Whether any payload was a `backoff`
    pub backoff_requested: bool,
}

/// Applies payloads to the session state of one poll cycle.
///
/// Borrows the state it mutates; the session builds one per response.
#[derive(Debug)]
pub struct FrameDispatcher<'a> {
    tracker: &'a mut SequenceTracker,
    backoff: &'a mut Backoff,
}

impl<'a> FrameDispatcher<'a> {
    /// Create a dispatcher over the given session state
    pub fn new(tracker: &'a mut SequenceTracker, backoff: &'a mut Backoff) -> Self {
        FrameDispatcher { tracker, backoff }
    }

    /// Dispatch a top-level payload.
    pub fn dispatch(&mut self, payload: Value) -> Result<Dispatched> {
        let mut dispatched = Dispatched::default();
        self.dispatch_into(payload, &mut dispatched)?;
        Ok(dispatched)
    }

    fn dispatch_into(&mut self, payload: Value, out: &mut Dispatched) -> Result<()> {
        self.tracker.record_sequence(&payload)?;

        let Some(kind) = payload
            .get(fields::TYPE)
            .and_then(Value::as_str)
            .and_then(MessageType::from_tag)
        else {
            return Err(PullError::UnknownMessage {
                type_tag: type_tag_of(&payload),
                payload,
            });
        };

        match kind {
            MessageType::Msg => {
                self.backoff.reset();
                if let Some(frames) = take_list(payload, fields::MESSAGES, true)? {
                    out.frames.extend(frames);
                }
            }
            MessageType::FullReload => {
                // Some events may not have been delivered; the application
                // has to refetch them out of band.
                self.backoff.reset();
                if let Some(frames) = take_list(payload, fields::MESSAGES, false)? {
                    out.frames.extend(frames);
                }
            }
            MessageType::Batched => {
                if let Some(items) = take_list(payload, fields::BATCHES, true)? {
                    for item in items {
                        self.dispatch_into(item, out)?;
                    }
                }
            }
            MessageType::Backoff => {
                warn!("Server told us to back off");
                self.backoff.record_failure();
                out.backoff_requested = true;
            }
            MessageType::Heartbeat => {
                debug!("Heartbeat");
            }
            MessageType::Lb => {
                self.tracker.record_routing(&payload)?;
                debug!(
                    sticky_token = ?self.tracker.sticky_token(),
                    sticky_pool = ?self.tracker.sticky_pool(),
                    "Routing updated"
                );
            }
            MessageType::Continue => {
                self.backoff.reset();
                return Err(PullError::UnsupportedMessage { kind, payload });
            }
            MessageType::Refresh | MessageType::RefreshDelay | MessageType::TestStreaming => {
                return Err(PullError::UnsupportedMessage { kind, payload });
            }
        }
        Ok(())
    }
}

/// Move a list field out of `payload`.
///
/// A missing or `null` field is `None`, or an error when `required`. Any
/// other value that is not a list is always an error.
fn take_list(mut payload: Value, field: &'static str, required: bool) -> Result<Option<Vec<Value>>> {
    match payload.get_mut(field).map(Value::take) {
        Some(Value::Array(items)) => Ok(Some(items)),
        None | Some(Value::Null) if !required => Ok(None),
        None => Err(PullError::malformed(field, payload)),
        Some(other) => {
            payload[field] = other;
            Err(PullError::malformed(field, payload))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct State {
        tracker: SequenceTracker,
        backoff: Backoff,
    }

    impl State {
        fn new() -> Self {
            State {
                tracker: SequenceTracker::with_client_id("c"),
                backoff: Backoff::default(),
            }
        }

        fn dispatch(&mut self, payload: Value) -> Result<Dispatched> {
            FrameDispatcher::new(&mut self.tracker, &mut self.backoff).dispatch(payload)
        }
    }

    #[test]
    fn test_msg() {
        let mut state = State::new();
        state.backoff.record_failure();
        let out = state.dispatch(json!({"t": "msg", "ms": [1, 2, 3]})).unwrap();
        assert_eq!(out.frames, vec![json!(1), json!(2), json!(3)]);
        assert!(!out.backoff_requested);
        assert_eq!(state.backoff.failure_count(), 0);
    }

    #[test]
    fn test_msg_requires_list() {
        let mut state = State::new();
        let err = state.dispatch(json!({"t": "msg"})).unwrap_err();
        assert!(matches!(err, PullError::MalformedMessage { field: "ms", .. }));

        let err = state.dispatch(json!({"t": "msg", "ms": 5})).unwrap_err();
        assert_eq!(err.payload(), Some(&json!({"t": "msg", "ms": 5})));
    }

    #[test]
    fn test_full_reload() {
        let mut state = State::new();
        state.backoff.record_failure();
        let out = state.dispatch(json!({"t": "fullReload", "ms": [1, 2, 3]})).unwrap();
        assert_eq!(out.frames, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(state.backoff.failure_count(), 0);

        let out = state.dispatch(json!({"t": "fullReload"})).unwrap();
        assert!(out.frames.is_empty());

        let out = state.dispatch(json!({"t": "fullReload", "ms": null})).unwrap();
        assert!(out.frames.is_empty());
    }

    #[test]
    fn test_null_required_list_fails() {
        let mut state = State::new();
        let err = state.dispatch(json!({"t": "msg", "ms": null})).unwrap_err();
        assert_eq!(err.payload(), Some(&json!({"t": "msg", "ms": null})));
    }

    #[test]
    fn test_batched_preserves_order() {
        let mut state = State::new();
        let out = state
            .dispatch(json!({
                "t": "batched",
                "batches": [{"t": "msg", "ms": [1]}, {"t": "msg", "ms": [2, 3]}]
            }))
            .unwrap();
        assert_eq!(out.frames, vec![json!(1), json!(2), json!(3)]);
    }

    #[test]
    fn test_batched_updates_sequence_per_item() {
        let mut state = State::new();
        state
            .dispatch(json!({
                "t": "batched",
                "seq": 3,
                "batches": [{"t": "heartbeat", "s": 4}, {"t": "msg", "ms": [], "seq": 5}]
            }))
            .unwrap();
        assert_eq!(state.tracker.sequence(), 5);
    }

    #[test]
    fn test_batched_with_backoff() {
        let mut state = State::new();
        let out = state
            .dispatch(json!({
                "t": "batched",
                "batches": [{"t": "msg", "ms": [1]}, {"t": "backoff"}]
            }))
            .unwrap();
        assert_eq!(out.frames, vec![json!(1)]);
        assert!(out.backoff_requested);
        assert_eq!(state.backoff.failure_count(), 1);
    }

    #[test]
    fn test_batched_unknown_item_fails() {
        let mut state = State::new();
        let err = state
            .dispatch(json!({"t": "batched", "batches": [{"t": "msg", "ms": [1]}, "2"]}))
            .unwrap_err();
        assert!(matches!(err, PullError::UnknownMessage { type_tag: None, .. }));
    }

    #[test]
    fn test_backoff() {
        let mut state = State::new();
        let out = state.dispatch(json!({"t": "backoff"})).unwrap();
        assert!(out.frames.is_empty());
        assert!(out.backoff_requested);
        assert_eq!(state.backoff.failure_count(), 1);
    }

    #[test]
    fn test_heartbeat() {
        let mut state = State::new();
        let out = state.dispatch(json!({"t": "heartbeat"})).unwrap();
        assert_eq!(out, Dispatched::default());
    }

    #[test]
    fn test_lb() {
        let mut state = State::new();
        state
            .dispatch(json!({"t": "lb", "lb_info": {"sticky": "1234", "pool": "abc"}}))
            .unwrap();
        assert_eq!(state.tracker.sticky_token(), Some("1234"));
        assert_eq!(state.tracker.sticky_pool(), Some("abc"));

        let err = state.dispatch(json!({"t": "lb", "lb_info": {}})).unwrap_err();
        assert!(matches!(err, PullError::MalformedMessage { field: "lb_info", .. }));
    }

    #[test]
    fn test_continue_resets_then_fails() {
        let mut state = State::new();
        state.backoff.record_failure();
        let err = state.dispatch(json!({"t": "continue"})).unwrap_err();
        assert!(matches!(err, PullError::UnsupportedMessage { kind: MessageType::Continue, .. }));
        assert_eq!(state.backoff.failure_count(), 0);
    }

    #[test]
    fn test_unsupported_types() {
        for tag in ["refresh", "refreshDelay", "test_streaming"] {
            let mut state = State::new();
            let err = state.dispatch(json!({"t": tag})).unwrap_err();
            assert!(matches!(err, PullError::UnsupportedMessage { .. }), "{tag}");
            assert_eq!(err.type_tag(), Some(tag));
        }
    }

    #[test]
    fn test_unknown_type() {
        let mut state = State::new();
        let err = state.dispatch(json!({"t": "unknown"})).unwrap_err();
        assert_eq!(err.type_tag(), Some("unknown"));

        let err = state.dispatch(json!({"ms": [1]})).unwrap_err();
        assert!(matches!(err, PullError::UnknownMessage { type_tag: None, .. }));
    }

    #[test]
    fn test_sequence_recorded_before_type_check() {
        let mut state = State::new();
        assert!(state.dispatch(json!({"t": "unknown", "seq": 42})).is_err());
        assert_eq!(state.tracker.sequence(), 42);
    }
}
