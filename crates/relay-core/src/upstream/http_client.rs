use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, ClientBuilder};
use std::{sync::Arc, time::Duration};
use tokio::sync::Semaphore;

use crate::{chain::Endpoint, upstream::UpstreamError};

/// Maximum number of body bytes kept in an [`UpstreamError::HttpError`].
const MAX_ERROR_BODY_CHARS: usize = 256;

/// Sends one JSON-RPC body to one endpoint.
///
/// The dispatcher enforces the endpoint's timeout around every call, so implementations
/// only need to make a single attempt.
#[async_trait]
pub trait UpstreamTransport: Send + Sync + 'static {
    async fn send(&self, endpoint: &Endpoint, body: Bytes) -> Result<Bytes, UpstreamError>;
}

/// Configuration for HTTP client concurrency behavior.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Maximum number of concurrent upstream HTTP requests.
    pub concurrent_limit: usize,
    /// How long to wait for a free slot before failing the attempt, in milliseconds.
    pub permit_timeout_ms: u64,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            concurrent_limit: 1000,
            permit_timeout_ms: 500,
            user_agent: concat!("relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// reqwest-backed [`UpstreamTransport`] with semaphore-based concurrency control.
pub struct HttpClient {
    client: Client,
    concurrent_limit: Arc<Semaphore>,
    config: HttpClientConfig,
}

impl HttpClient {
    /// Creates a new HTTP client with default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn new() -> Result<Self, UpstreamError> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Creates a new HTTP client with the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reqwest client fails to build.
    pub fn with_config(config: HttpClientConfig) -> Result<Self, UpstreamError> {
        let client = ClientBuilder::new()
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(100)
            .connect_timeout(Duration::from_secs(5))
            .use_rustls_tls()
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(config.user_agent.as_str())
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build http client");
                UpstreamError::ClientBuild(e.to_string())
            })?;

        Ok(Self {
            client,
            concurrent_limit: Arc::new(Semaphore::new(config.concurrent_limit)),
            config,
        })
    }

    /// Sanitizes network errors so upstream urls and credentials never reach callers.
    fn sanitize_network_error(error: &reqwest::Error) -> String {
        if error.is_connect() {
            "connection refused or unreachable".to_string()
        } else if error.is_timeout() {
            "connection timed out".to_string()
        } else if error.is_request() {
            "request failed".to_string()
        } else if error.is_body() {
            "response body error".to_string()
        } else if error.is_decode() {
            "response decode error".to_string()
        } else if error.is_redirect() {
            "unexpected redirect".to_string()
        } else {
            "network error".to_string()
        }
    }

    fn truncate_body(raw: String) -> String {
        match raw.char_indices().nth(MAX_ERROR_BODY_CHARS) {
            Some((cut, _)) => format!("{}... (truncated)", &raw[..cut]),
            None => raw,
        }
    }

    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.concurrent_limit.available_permits()
    }
}

#[async_trait]
impl UpstreamTransport for HttpClient {
    /// Sends an HTTP POST with semaphore-based concurrency control.
    ///
    /// # Errors
    ///
    /// - [`UpstreamError::Timeout`] if no slot frees up in time or the request times out
    /// - [`UpstreamError::HttpError`] for non-success HTTP status codes
    /// - [`UpstreamError::ConnectionFailed`] for other network failures
    async fn send(&self, endpoint: &Endpoint, body: Bytes) -> Result<Bytes, UpstreamError> {
        let permit_timeout = Duration::from_millis(self.config.permit_timeout_ms);
        let _permit = tokio::time::timeout(
            permit_timeout,
            Arc::clone(&self.concurrent_limit).acquire_owned(),
        )
        .await
        .map_err(|_| {
            tracing::warn!(
                upstream = %endpoint.display_name(),
                available_permits = self.concurrent_limit.available_permits(),
                "http client semaphore acquisition timeout"
            );
            UpstreamError::Timeout(permit_timeout)
        })?
        .map_err(|_| UpstreamError::ConnectionFailed("http client is shutting down".to_string()))?;

        let mut request = self
            .client
            .post(&endpoint.url)
            .header("content-type", "application/json")
            .body(body)
            .timeout(endpoint.timeout());
        if let Some(token) = &endpoint.auth {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(endpoint.timeout())
            } else {
                UpstreamError::ConnectionFailed(Self::sanitize_network_error(&e))
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let raw_text = response.text().await.unwrap_or_default();
            tracing::trace!(upstream = %endpoint.display_name(), status = status.as_u16(), "http request failed");
            return Err(UpstreamError::HttpError(status.as_u16(), Self::truncate_body(raw_text)));
        }

        response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(endpoint.timeout())
            } else {
                UpstreamError::ConnectionFailed(Self::sanitize_network_error(&e))
            }
        })
    }
}
