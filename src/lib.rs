#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

//! # Pull channel: a sans-IO long-poll protocol handler
//!
//! This crate implements the client side of a long-poll ("pull") channel used
//! to receive near-real-time event notifications from a web service. The
//! server holds each poll open for up to ~50 seconds and answers with a JSON
//! payload prefixed by `for(;;);`.
//!
//! ## Overview
//!
//! The protocol logic is separated from I/O:
//!
//! 1. **Backoff** - Retry delays from a failure count, with override and jitter
//! 2. **Sequence tracking** - Last-seen sequence and sticky routing tokens, echoed on every poll
//! 3. **Frame dispatch** - Payload classification by type tag into application frames
//! 4. **Pull session** - Request building and interpretation of HTTP outcomes
//!
//! The network transport and authentication are collaborators supplied by
//! the caller, through the [`client::Transport`] trait and [`AuthContext`].
//!
//! ## Status Codes
//!
//! - `2xx` - Payload is decoded and dispatched
//! - `503 Service Unavailable` - Flat 60 second backoff, no error
//! - anything else - [`PullError::UnexpectedStatus`]
//!
//! ## Client Usage
//!
//! ```ignore
//! use pull_channel_http::client::{ClientConfig, Listener, PullSession, ReqwestTransport};
//! use pull_channel_http::AuthContext;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::default();
//!     let auth = AuthContext::from_cookies(cookies, dtsg, revision).ok_or("no c_user")?;
//!     let transport = ReqwestTransport::new(&config)?.with_auth(auth);
//!
//!     let mut frames = Listener::new(PullSession::with_config(config), transport).listen();
//!     while let Some(frame) = frames.next().await {
//!         println!("Frame: {}", frame?);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Module Structure
//!
//! - **[types]** - Core value types (Frame, PullRequest, PullOutcome, etc.)
//! - **[error]** - Error types and result handling
//! - **[client]** - Session state machine, transport seam and poll loop
//! - **[protocol]** - Protocol constants, message types and body decoding
//! - **[auth]** - Authentication parameters attached to requests

pub mod auth;
pub mod client;
pub mod error;
pub mod protocol;
pub mod types;

pub use auth::AuthContext;
pub use client::{Backoff, ClientConfig, Listener, PullSession, SequenceTracker};
pub use error::{PullError, Result};
pub use protocol::MessageType;
pub use types::{Frame, HttpResponse, PullOutcome, PullRequest, TransportFailure};
