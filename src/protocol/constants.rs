//! Protocol constants for the pull endpoint.
//!
//! Values here describe the server contract as observed on the wire. The
//! tunable parts (timeouts, backoff) have defaults in
//! [`ClientConfig`](crate::client::ClientConfig) derived from these.

use std::time::Duration;

/// Host serving the pull endpoint
pub const DEFAULT_HOST: &str = "0-edge-chat.facebook.com";

/// Path of the pull endpoint
pub const PULL_PATH: &str = "/pull";

/// Anti-hijacking prefix the server puts in front of every JSON body
pub const JSON_CRUFT: &str = "for(;;);";

/// The server holds a poll open for about 50 seconds
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

/// Slightly over a multiple of 3, the TCP SYN retransmission window
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Base of the exponential backoff
pub const BACKOFF_FACTOR: Duration = Duration::from_secs(5);

/// Ceiling of the exponential backoff
pub const BACKOFF_MAX: Duration = Duration::from_secs(320);

/// Fixed wait after a 503 or a connect timeout
pub const FLAT_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Bits of randomness in a generated client id
pub const CLIENT_ID_BITS: u32 = 31;

/// Query parameter names of a pull request.
pub mod params {
    /// Random per-session client id
    pub const CLIENT_ID: &str = "clientid";
    /// Server-assigned affinity token
    pub const STICKY_TOKEN: &str = "sticky_token";
    /// Server-assigned pool id
    pub const STICKY_POOL: &str = "sticky_pool";
    /// Count of messages received, always zero
    pub const MSGS_RECV: &str = "msgs_recv";
    /// Last observed sequence number
    pub const SEQ: &str = "seq";
    /// `active` or `offline`
    pub const STATE: &str = "state";
}

/// Field names of a decoded server payload.
pub mod fields {
    /// Message type tag
    pub const TYPE: &str = "t";
    /// Short sequence field, wins over [`SEQUENCE`]
    pub const SHORT_SEQUENCE: &str = "s";
    /// Long sequence field
    pub const SEQUENCE: &str = "seq";
    /// Frame list of `msg` and `fullReload`
    pub const MESSAGES: &str = "ms";
    /// Sub-payload list of `batched`
    pub const BATCHES: &str = "batches";
    /// Routing object of `lb`
    pub const LB_INFO: &str = "lb_info";
    /// Sticky token inside [`LB_INFO`]
    pub const STICKY: &str = "sticky";
    /// Sticky pool inside [`LB_INFO`]
    pub const POOL: &str = "pool";
}
