//! Client configuration.

use crate::error::{PullError, Result};
use crate::protocol::constants;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration of a pull session and its transport.
///
/// Every field has a default matching the observed server contract, so a
/// partial JSON document is enough:
///
/// ```
/// use pull_channel_http::client::ClientConfig;
///
/// let config = ClientConfig::from_json(r#"{"mark_alive": true}"#).unwrap();
/// assert!(config.mark_alive);
/// assert_eq!(config.read_timeout_ms, 60_000);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Host of the pull endpoint
    pub host: String,
    /// Path of the pull endpoint
    pub path: String,
    /// Use https
    pub secure: bool,
    /// Report the user as `active` instead of `offline`
    pub mark_alive: bool,
    /// Connect timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Read timeout in milliseconds; must exceed the server's hold time
    pub read_timeout_ms: u64,
    /// Base delay of the exponential backoff in milliseconds
    pub backoff_factor_ms: u64,
    /// Ceiling of the exponential backoff in milliseconds
    pub backoff_max_ms: u64,
    /// Flat delay after a 503 in milliseconds
    pub unavailable_delay_ms: u64,
    /// Flat delay after a connect timeout in milliseconds
    pub connect_timeout_delay_ms: u64,
    /// Proxy for all requests; empty for none
    pub proxy_url: String,
    /// Idle pooled connection lifetime in milliseconds
    pub pool_idle_timeout_ms: u64,
    /// Frames buffered between the poll task and the consumer
    pub channel_capacity: usize,
    /// Log every retry of the driving loop
    pub enable_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            host: constants::DEFAULT_HOST.to_string(),
            path: constants::PULL_PATH.to_string(),
            secure: true,
            mark_alive: false,
            connect_timeout_ms: duration_ms(constants::CONNECT_TIMEOUT),
            read_timeout_ms: duration_ms(constants::READ_TIMEOUT),
            backoff_factor_ms: duration_ms(constants::BACKOFF_FACTOR),
            backoff_max_ms: duration_ms(constants::BACKOFF_MAX),
            unavailable_delay_ms: duration_ms(constants::FLAT_RETRY_DELAY),
            connect_timeout_delay_ms: duration_ms(constants::FLAT_RETRY_DELAY),
            proxy_url: String::new(),
            pool_idle_timeout_ms: 90_000,
            channel_capacity: 100,
            enable_logging: true,
        }
    }
}

impl ClientConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(text: &str) -> Result<Self> {
        let config: ClientConfig =
            serde_json::from_str(text).map_err(|e| PullError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the session cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(PullError::Config("host must not be empty".into()));
        }
        if !self.path.starts_with('/') {
            return Err(PullError::Config(format!(
                "path must start with '/': {:?}",
                self.path
            )));
        }
        if self.connect_timeout_ms == 0 || self.read_timeout_ms == 0 {
            return Err(PullError::Config("timeouts must be > 0".into()));
        }
        if self.backoff_factor_ms == 0 {
            return Err(PullError::Config("backoff factor must be > 0".into()));
        }
        if self.backoff_max_ms < self.backoff_factor_ms {
            return Err(PullError::Config(
                "backoff max must be >= backoff factor".into(),
            ));
        }
        if self.channel_capacity == 0 {
            return Err(PullError::Config("channel capacity must be > 0".into()));
        }
        Ok(())
    }

    /// Connect timeout as a [`Duration`]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Read timeout as a [`Duration`]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Backoff factor as a [`Duration`]
    pub fn backoff_factor(&self) -> Duration {
        Duration::from_millis(self.backoff_factor_ms)
    }

    /// Backoff ceiling as a [`Duration`]
    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    /// Delay after a 503 as a [`Duration`]
    pub fn unavailable_delay(&self) -> Duration {
        Duration::from_millis(self.unavailable_delay_ms)
    }

    /// Delay after a connect timeout as a [`Duration`]
    pub fn connect_timeout_delay(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_delay_ms)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
