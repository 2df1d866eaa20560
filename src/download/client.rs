//! HTTP client wrapper for page and asset fetches.
//!
//! This module provides the `HttpClient` struct which issues GET requests
//! with a rotating browser identity, a fixed referrer, a per-call timeout and
//! bounded automatic retry for transient server failures.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{REFERER, RETRY_AFTER, USER_AGENT};
use reqwest::{Client, Method};
use tracing::{debug, info, instrument};
use url::Url;

use super::constants::{ASSET_TIMEOUT, CONNECT_TIMEOUT, PAGE_TIMEOUT};
use super::error::DownloadError;
use super::retry::{FailureType, RetryDecision, RetryPolicy, classify_error};
use crate::user_agent;

/// Upper bound honoured for a server-supplied Retry-After.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

/// Timeouts, retry policy and request identity for [`HttpClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// TCP/TLS connect timeout applied to every request.
    pub connect_timeout: Duration,
    /// Whole-request timeout for page bodies.
    pub page_timeout: Duration,
    /// Whole-request timeout for asset bytes.
    pub asset_timeout: Duration,
    /// Retry policy shared by all requests.
    pub retry_policy: RetryPolicy,
    /// Fixed `Referer` header sent with every request.
    pub referer: String,
    /// User-Agent pool; one entry is picked at random per attempt.
    pub user_agents: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: CONNECT_TIMEOUT,
            page_timeout: PAGE_TIMEOUT,
            asset_timeout: ASSET_TIMEOUT,
            retry_policy: RetryPolicy::default(),
            referer: "https://telegra.ph/".to_string(),
            user_agents: user_agent::default_pool(),
        }
    }
}

/// HTTP client for page and asset fetches with retry support.
///
/// This client is designed to be created once and shared by every worker,
/// taking advantage of connection pooling. Cloning is cheap.
///
/// # Example
///
/// ```no_run
/// use telegrab_core::download::{ClientConfig, HttpClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new(ClientConfig::default());
/// let bytes = client.get_bytes("https://telegra.ph/file/abc.jpg").await?;
/// println!("fetched {} bytes", bytes.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    config: Arc<ClientConfig>,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl HttpClient {
    /// Creates a new HTTP client from `config`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(config: ClientConfig) -> Self {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .gzip(true)
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            config: Arc::new(config),
        }
    }

    /// Returns the configuration this client was built with.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Fetches a page body as text using the page timeout.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if the URL is invalid, the request fails at
    /// the transport level, or the final response status is not 2xx.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_text(&self, url: &str) -> Result<String, DownloadError> {
        let response = self.fetch(url, self.config.page_timeout).await?;
        response.text().await.map_err(|e| map_transport(url, e))
    }

    /// Fetches asset bytes using the asset timeout.
    ///
    /// The full body is captured before returning, so callers never see a
    /// partial payload.
    ///
    /// # Errors
    ///
    /// Same as [`get_text`](Self::get_text).
    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self.fetch(url, self.config.asset_timeout).await?;
        let body = response.bytes().await.map_err(|e| map_transport(url, e))?;
        debug!(bytes = body.len(), "body received");
        Ok(body.to_vec())
    }

    /// Issues a GET with the configured retry policy and returns the first
    /// successful response.
    ///
    /// # Errors
    ///
    /// Returns the last error once the policy declines to retry.
    pub async fn fetch(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<reqwest::Response, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let method = Method::GET;
        let policy = &self.config.retry_policy;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            debug!(attempt, "sending request");

            match self.send_request(method.clone(), url, timeout).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let failure_type = classify_error(&e);
                    match policy.should_retry(&method, failure_type, attempt) {
                        RetryDecision::Retry {
                            delay: backoff_delay,
                            attempt: next_attempt,
                        } => {
                            let retry_after = (failure_type == FailureType::RateLimited)
                                .then(|| retry_after_delay(&e))
                                .flatten();
                            let delay = retry_after.unwrap_or(backoff_delay);
                            info!(
                                url = %url,
                                attempt = next_attempt,
                                max_attempts = policy.max_attempts(),
                                delay_ms = delay.as_millis(),
                                error = %e,
                                "retrying request"
                            );
                            tokio::time::sleep(delay).await;
                        }
                        RetryDecision::DoNotRetry { reason } => {
                            debug!(url = %url, %reason, "not retrying request");
                            return Err(e);
                        }
                    }
                }
            }
        }
    }

    async fn send_request(
        &self,
        method: Method,
        url: &str,
        timeout: Duration,
    ) -> Result<reqwest::Response, DownloadError> {
        let response = self
            .client
            .request(method, url)
            .header(USER_AGENT, user_agent::choose(&self.config.user_agents))
            .header(REFERER, &self.config.referer)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_transport(url, e))?;

        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(std::string::ToString::to_string);
            return Err(DownloadError::rejected(
                url,
                response.status().as_u16(),
                retry_after,
            ));
        }

        Ok(response)
    }
}

fn map_transport(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::timeout(url)
    } else {
        DownloadError::network(url, error)
    }
}

/// Delta-seconds form of Retry-After only, capped at [`MAX_RETRY_AFTER`].
fn retry_after_delay(error: &DownloadError) -> Option<Duration> {
    let DownloadError::HttpStatus {
        retry_after: Some(value),
        ..
    } = error
    else {
        return None;
    };
    let secs: u64 = value.trim().parse().ok()?;
    Some(Duration::from_secs(secs).min(MAX_RETRY_AFTER))
}
