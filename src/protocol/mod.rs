//! Transport-independent pieces of the pull protocol.
//!
//! - **[constants]** - endpoint, timeouts, backoff constants, parameter and field names
//! - **[message]** - the closed set of payload type tags
//! - **[payload]** - body decoding (`for(;;);` prefix + JSON)

pub mod constants;
pub mod message;
pub mod payload;

pub use message::MessageType;
pub use payload::{decode_body, load_json, strip_json_cruft};
