//! HTTP client abstraction for tile and index downloads.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::StatusCode;
use tracing::{debug, trace, warn};

use crate::error::DataError;

/// Default User-Agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = concat!("terragrid/", env!("CARGO_PKG_VERSION"));

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Asynchronous GET client used for remote data.
///
/// Implementations return `Ok(None)` for a missing resource (HTTP 404) so
/// callers can treat it as absent data rather than a failure.
pub trait TileClient: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<Option<Bytes>, DataError>> + Send;
}

/// Real HTTP client implementation using reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> Result<Self, DataError> {
        Self::with_options(DEFAULT_USER_AGENT, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client identifying itself as `user_agent`.
    pub fn with_options(user_agent: &str, timeout_secs: u64) -> Result<Self, DataError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(user_agent)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| DataError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl TileClient for ReqwestClient {
    async fn fetch(&self, url: &str) -> Result<Option<Bytes>, DataError> {
        trace!(url = url, "HTTP GET request starting");

        let response = match self.client.get(url).send().await {
            Ok(resp) => resp,
            Err(e) => {
                warn!(
                    url = url,
                    error = %e,
                    is_connect = e.is_connect(),
                    is_timeout = e.is_timeout(),
                    "HTTP request failed"
                );
                return Err(DataError::Network(format!("Request failed: {}", e)));
            }
        };

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            debug!(url = url, "Remote resource not found");
            return Ok(None);
        }
        if !status.is_success() {
            warn!(url = url, status = status.as_u16(), "HTTP error status");
            return Err(DataError::Network(format!("HTTP {} from {}", status, url)));
        }

        match response.bytes().await {
            Ok(bytes) => {
                trace!(url = url, bytes = bytes.len(), "HTTP response body read");
                Ok(Some(bytes))
            }
            Err(e) => {
                warn!(url = url, error = %e, "Failed to read response body");
                Err(DataError::Network(format!("Failed to read response: {}", e)))
            }
        }
    }
}
