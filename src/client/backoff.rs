//! Retry delay policy.
//!
//! Exponential in the number of consecutive failures, bounded at a ceiling,
//! with multiplicative jitter. A one-shot override takes precedence over the
//! computed delay; server signals with a fixed wait (503, connect timeouts)
//! use it so that they do not accelerate the exponential sequence.
//!
//! # Examples
//!
//! ```
//! use pull_channel_http::client::Backoff;
//! use std::time::Duration;
//!
//! let mut backoff = Backoff::default();
//! assert_eq!(backoff.current_delay(), None);
//!
//! backoff.record_failure();
//! backoff.record_failure();
//! assert_eq!(backoff.current_delay(), Some(Duration::from_secs(10)));
//!
//! backoff.set_override(Duration::from_secs(60));
//! assert_eq!(backoff.current_delay(), Some(Duration::from_secs(60)));
//! ```

use crate::client::utils::exponential_backoff;
use crate::protocol::constants;
use rand::Rng;
use std::ops::Range;
use std::time::Duration;

/// Range of the random jitter multiplier
pub const JITTER_RANGE: Range<f64> = 1.0..1.5;

/// Consecutive-failure counter with an optional delay override.
#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    failures: u32,
    delay_override: Option<Duration>,
    factor: Duration,
    max: Duration,
}

impl Backoff {
    /// Create a backoff with the given base delay and ceiling
    pub fn new(factor: Duration, max: Duration) -> Self {
        Backoff {
            failures: 0,
            delay_override: None,
            factor,
            max,
        }
    }

    /// Number of failures since the last reset
    pub fn failure_count(&self) -> u32 {
        self.failures
    }

    /// The pending override, if any
    pub fn delay_override(&self) -> Option<Duration> {
        self.delay_override
    }

    /// Count one failure.
    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    /// Forget all failures. The override is left alone.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Set a one-shot delay that supersedes the computed one.
    pub fn set_override(&mut self, delay: Duration) {
        self.delay_override = Some(delay);
    }

    /// Discard the override.
    pub fn clear_override(&mut self) {
        self.delay_override = None;
    }

    /// The delay now due, or `None` if the caller should not wait.
    pub fn current_delay(&self) -> Option<Duration> {
        if let Some(delay) = self.delay_override {
            return Some(delay);
        }
        (self.failures > 0).then(|| exponential_backoff(self.failures, self.factor, self.max))
    }

    /// [`Backoff::current_delay`] scaled by a random factor in [`JITTER_RANGE`].
    pub fn jittered_delay(&self) -> Option<Duration> {
        self.jittered_delay_with(&mut rand::rng())
    }

    /// [`Backoff::jittered_delay`] with a caller-supplied generator
    pub fn jittered_delay_with<R: Rng>(&self, rng: &mut R) -> Option<Duration> {
        self.current_delay()
            .map(|delay| delay.mul_f64(rng.random_range(JITTER_RANGE)))
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(constants::BACKOFF_FACTOR, constants::BACKOFF_MAX)
    }
}
