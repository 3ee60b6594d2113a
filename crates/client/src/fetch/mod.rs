//! Network seam for the caching proxy.
//!
//! ### Descriptors
//! - Requests are canonicalized on construction (absolute http(s), lowercase
//!   host, no fragment) so equal requests share a cache key.
//! - Responses keep headers in a case-insensitive `HeaderMap`.
//!
//! ### Failure model
//! - Any HTTP status, including 4xx/5xx, is a successful fetch.
//! - Only transport failures (DNS, refused connection, timeout) are errors;
//!   those are what the strategies fall back on.

pub mod descriptor;
pub mod url;

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use descriptor::{RequestDescriptor, ResponseDescriptor};
pub use self::url::{UrlError, canonicalize, origin_of};

use saveit_core::{AppConfig, Error};

/// Transport-level failure: no response was received.
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    /// No response within the configured deadline.
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The network could not be reached at all.
    #[error("network unreachable: {0}")]
    Unreachable(String),

    /// Any other transport error.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout(Duration::ZERO)
        } else if err.is_connect() {
            FetchError::Unreachable(err.to_string())
        } else {
            FetchError::Network(Arc::new(err))
        }
    }
}

/// Anything that can perform a request on behalf of the proxy.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseDescriptor, FetchError>;
}

/// Issue `request` on `network`, bounded by `deadline`.
///
/// An expired deadline is reported as [`FetchError::Timeout`] and handled
/// like any other transport failure.
pub async fn fetch_within(
    network: &dyn Network, request: &RequestDescriptor, deadline: Duration,
) -> Result<ResponseDescriptor, FetchError> {
    match tokio::time::timeout(deadline, network.fetch(request)).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(deadline)),
    }
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "saveit-proxy/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { user_agent: "saveit-proxy/0.1".to_string(), timeout: Duration::from_millis(20000), max_redirects: 5 }
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), ..Default::default() }
    }
}

/// reqwest-backed [`Network`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &RequestDescriptor) -> Result<ResponseDescriptor, FetchError> {
        let start = Instant::now();

        let response = self
            .http
            .request(request.method().clone(), request.url().clone())
            .send()
            .await
            .map_err(|e| match FetchError::from(e) {
                FetchError::Timeout(_) => FetchError::Timeout(self.config.timeout),
                other => other,
            })?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        tracing::debug!(
            "fetched {} {} -> {} in {}ms ({} bytes)",
            request.method(),
            request.url(),
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(ResponseDescriptor { status, headers, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedNetwork;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "saveit-proxy/0.1");
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app_config() {
        let app = AppConfig { user_agent: "test-agent".into(), timeout_ms: 750, ..Default::default() };
        let config = FetchConfig::from(&app);
        assert_eq!(config.user_agent, "test-agent");
        assert_eq!(config.timeout, Duration::from_millis(750));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig::default());
        assert!(client.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_within_times_out() {
        let network = ScriptedNetwork::new();
        network.hang("http://localhost:8000/slow");
        let request = RequestDescriptor::get("http://localhost:8000/slow").unwrap();

        let result = fetch_within(&network, &request, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(FetchError::Timeout(d)) if d == Duration::from_millis(20)));
    }

    #[tokio::test]
    async fn test_fetch_within_passes_through() {
        let network = ScriptedNetwork::new();
        network.respond("http://localhost:8000/", 404, "text/html", "missing");
        let request = RequestDescriptor::get("http://localhost:8000/").unwrap();

        let response = fetch_within(&network, &request, Duration::from_secs(1)).await.unwrap();
        assert_eq!(response.status.as_u16(), 404);
    }
}
