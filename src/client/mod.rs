//! Pull channel client.
//!
//! This module provides the client half of the long-poll channel:
//!
//! - **Track session continuity** (sequence number, sticky routing)
//! - **Classify payloads** by their `t` tag and extract frames
//! - **Back off** exponentially after failures, or flat when the server says so
//! - **Drive the poll loop** over any [`Transport`]
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── backoff    - Retry delay policy
//! ├── sequence   - Sequence/routing tracking and request building
//! ├── dispatcher - Type-tag dispatch of payloads
//! ├── session    - PullSession, the protocol state machine
//! ├── transport  - Transport trait and reqwest adapter
//! ├── listener   - Driving loop and frame stream
//! ├── config     - Client configuration
//! └── utils      - Utility functions
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`PullSession`] | Sans-IO protocol state machine |
//! | [`Backoff`] | Retry delay policy |
//! | [`SequenceTracker`] | Sequence and sticky routing state |
//! | [`FrameDispatcher`] | Payload classification |
//! | [`Listener`] | Poll loop over a [`Transport`] |
//! | [`ClientConfig`] | Client configuration options |
//!
//! # Examples
//!
//! ## Driving a session by hand
//!
//! ```
//! use pull_channel_http::client::PullSession;
//! use pull_channel_http::{PullOutcome, TransportFailure};
//! use std::time::Duration;
//!
//! let mut session = PullSession::new();
//! assert_eq!(session.delay_before_next_poll(), None);
//!
//! let _request = session.next_request();
//! let outcome = session.handle_transport_failure(TransportFailure::ConnectionError);
//! assert_eq!(
//!     outcome,
//!     PullOutcome::Backoff { frames: vec![], delay: Duration::from_secs(5) }
//! );
//! ```
//!
//! ## Utility Functions
//!
//! ```
//! use pull_channel_http::client::{exponential_backoff, is_success_status};
//! use std::time::Duration;
//!
//! assert!(is_success_status(204));
//! assert!(!is_success_status(503));
//!
//! let delay = exponential_backoff(2, Duration::from_secs(5), Duration::from_secs(320));
//! assert_eq!(delay, Duration::from_secs(10));
//! ```

mod backoff;
mod config;
mod dispatcher;
mod listener;
mod sequence;
mod session;
mod transport;
mod utils;

pub use backoff::{Backoff, JITTER_RANGE};
pub use config::ClientConfig;
pub use dispatcher::{Dispatched, FrameDispatcher};
pub use listener::{FrameStream, Listener, SharedSession};
pub use sequence::SequenceTracker;
pub use session::PullSession;
pub use transport::{ReqwestTransport, Transport};
pub use utils::*;
