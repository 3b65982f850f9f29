//! HTTP transport seam.
//!
//! [`PullSession`](crate::client::PullSession) never performs I/O itself; a
//! [`Transport`] sends the request it builds. Transports do not retry, every
//! retry decision belongs to the session.
//!
//! [`ReqwestTransport`] is the stock implementation.

use crate::auth::AuthContext;
use crate::client::config::ClientConfig;
use crate::client::utils::build_url;
use crate::error::{PullError, Result};
use crate::types::{HttpResponse, PullRequest, TransportFailure};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Sends one poll request and reports how it went.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform the request.
    ///
    /// Any status code, 5xx included, is an `Ok` response; only failures to
    /// get one at all are errors.
    async fn send(&self, request: &PullRequest)
        -> std::result::Result<HttpResponse, TransportFailure>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        request: &PullRequest,
    ) -> std::result::Result<HttpResponse, TransportFailure> {
        (**self).send(request).await
    }
}

/// [`Transport`] backed by `reqwest`, with optional authentication.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    auth: Option<Arc<AuthContext>>,
}

impl ReqwestTransport {
    /// Build a transport from the connection settings of `config`.
    ///
    /// The connect and read timeouts are fixed here, per client. The read
    /// timeout restarts after every successful read, so a poll the server
    /// keeps open fails only after a full quiet period.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .read_timeout(config.read_timeout())
            .pool_idle_timeout(Duration::from_millis(config.pool_idle_timeout_ms));

        if !config.proxy_url.is_empty() {
            let proxy = reqwest::Proxy::all(&config.proxy_url)
                .map_err(|e| PullError::Config(format!("invalid proxy url: {e}")))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| PullError::Config(format!("could not build http client: {e}")))?;

        Ok(ReqwestTransport { client, auth: None })
    }

    /// Wrap an existing `reqwest` client
    pub fn from_client(client: reqwest::Client) -> Self {
        ReqwestTransport { client, auth: None }
    }

    /// Attach authentication to every request
    pub fn with_auth(mut self, auth: AuthContext) -> Self {
        self.auth = Some(Arc::new(auth));
        self
    }

    fn url(&self, request: &PullRequest) -> String {
        let mut params: Vec<(&str, &str)> = request
            .params
            .iter()
            .map(|(key, value)| (*key, value.as_str()))
            .collect();
        if let Some(auth) = &self.auth {
            params.extend(auth.query_params());
        }
        build_url(request.secure, &request.host, &request.path, params)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &PullRequest,
    ) -> std::result::Result<HttpResponse, TransportFailure> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(request));

        if let Some(cookie) = self.auth.as_ref().and_then(|auth| auth.cookie_header()) {
            builder = builder.header(reqwest::header::COOKIE, cookie);
        }

        debug!(host = %request.host, path = %request.path, "Pulling");
        let response = builder.send().await.map_err(|e| classify(&e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| classify(&e))?;

        Ok(HttpResponse { status, body })
    }
}

/// Map a `reqwest` error onto the failure kinds the session knows.
fn classify(error: &reqwest::Error) -> TransportFailure {
    if error.is_timeout() {
        if error.is_connect() {
            TransportFailure::ConnectTimeout
        } else {
            TransportFailure::ReadTimeout
        }
    } else {
        TransportFailure::ConnectionError
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::sequence::SequenceTracker;
    use std::collections::BTreeMap;

    #[test]
    fn test_url_without_auth() {
        let transport = ReqwestTransport::new(&ClientConfig::default()).unwrap();
        let request = SequenceTracker::with_client_id("ab")
            .build_next_request(false, &ClientConfig::default());
        assert_eq!(transport.url(&request), request.url());
    }

    #[test]
    fn test_url_with_auth() {
        let auth = AuthContext::from_cookies(
            BTreeMap::from([("c_user".to_string(), "7".to_string())]),
            "tok",
            "rev",
        )
        .unwrap();
        let transport = ReqwestTransport::new(&ClientConfig::default())
            .unwrap()
            .with_auth(auth);
        let request = SequenceTracker::with_client_id("ab")
            .build_next_request(true, &ClientConfig::default());
        assert!(transport
            .url(&request)
            .ends_with("&state=active&__rev=rev&__user=7&__a=1&fb_dtsg=tok"));
    }

    #[test]
    fn test_invalid_proxy() {
        let config = ClientConfig {
            proxy_url: "http://proxy:99999".into(),
            ..Default::default()
        };
        assert!(matches!(
            ReqwestTransport::new(&config),
            Err(PullError::Config(_))
        ));
    }
}
