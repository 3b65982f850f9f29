//! Utility functions for the pull client.
//!
//! This module provides helper functions for:
//! - Status code classification
//! - Exponential backoff delay calculation
//! - Client id generation
//! - URL building

use rand::Rng;
use std::time::Duration;
use url::form_urlencoded;

/// Check if status code is a success (`200..300`)
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Check if status code means the server is temporarily unavailable
pub fn is_unavailable_status(status: u16) -> bool {
    status == 503
}

/// Exponential backoff delay calculation.
///
/// Returns `factor * 2^(failures - 1)`, clamped to `max`. Zero failures give
/// `factor`; whether any delay is due at all is the caller's decision.
///
/// # Examples
///
/// ```
/// use pull_channel_http::client::exponential_backoff;
/// use std::time::Duration;
///
/// let factor = Duration::from_secs(5);
/// let max = Duration::from_secs(320);
/// assert_eq!(exponential_backoff(1, factor, max), Duration::from_secs(5));
/// assert_eq!(exponential_backoff(3, factor, max), Duration::from_secs(20));
/// assert_eq!(exponential_backoff(30, factor, max), max);
/// ```
pub fn exponential_backoff(failures: u32, factor: Duration, max: Duration) -> Duration {
    let exponent = failures.saturating_sub(1);
    2u32.checked_pow(exponent)
        .map_or(max, |multiplier| factor.saturating_mul(multiplier))
        .min(max)
}

/// Lowercase hex of a uniform random integer in `0..=2^bits`.
pub fn random_hex(bits: u32) -> String {
    random_hex_with(&mut rand::rng(), bits)
}

/// [`random_hex`] with a caller-supplied generator
pub fn random_hex_with<R: Rng>(rng: &mut R, bits: u32) -> String {
    let upper = 1u64 << bits.min(63);
    format!("{:x}", rng.random_range(0..=upper))
}

/// Build a URL from its parts, form-encoding the query.
pub fn build_url<'a>(
    secure: bool,
    host: &str,
    path: &str,
    params: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> String {
    let scheme = if secure { "https" } else { "http" };
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(params)
        .finish();
    if query.is_empty() {
        format!("{scheme}://{host}{path}")
    } else {
        format!("{scheme}://{host}{path}?{query}")
    }
}
