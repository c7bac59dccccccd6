//! HTTP fetcher implementation
//!
//! This module handles the network side of a site pipeline:
//! - Building the shared HTTP client with a proper user agent string
//! - GET requests for a site's root page or sitemap with a per-request timeout
//! - Retry with exponential backoff for transient failures
//! - Error classification

use crate::config::{CrawlerConfig, UserAgentConfig};
use crate::registry::SiteConfig;
use reqwest::{redirect::Policy, Client};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why fetching a site failed
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("connection refused")]
    ConnectionRefused,

    #[error("HTTP status {0}")]
    HttpStatus(u16),

    #[error("too many redirects")]
    TooManyRedirects,

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("network error: {0}")]
    Network(String),
}

impl FetchError {
    /// Returns true for failures worth retrying
    ///
    /// | Condition | Retried |
    /// |-----------|---------|
    /// | Timeout | yes |
    /// | Connection refused | yes |
    /// | HTTP 5xx | yes |
    /// | HTTP 4xx and other statuses | no |
    /// | Redirect overflow | no |
    /// | Malformed URL | no |
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::ConnectionRefused => true,
            Self::HttpStatus(code) => (500..=599).contains(code),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_redirect() {
            Self::TooManyRedirects
        } else if e.is_builder() {
            Self::InvalidUrl(e.to_string())
        } else if e.is_connect() {
            Self::ConnectionRefused
        } else {
            Self::Network(e.to_string())
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    pub status_code: u16,

    /// Raw body bytes
    pub body: Vec<u8>,
}

/// Timeout and retry settings for one site fetch
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub max_retries: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl FetchPolicy {
    /// Delay before retry number `retry` (0-based): `base * 2^retry`, capped
    pub fn backoff_for(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.min(16);
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_max)
    }
}

impl From<&CrawlerConfig> for FetchPolicy {
    fn from(config: &CrawlerConfig) -> Self {
        Self {
            timeout: config.fetch_timeout(),
            max_retries: config.max_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            backoff_max: Duration::from_millis(config.backoff_max_ms),
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use retailer_news::config::{CrawlerConfig, UserAgentConfig};
/// use retailer_news::crawler::build_http_client;
///
/// let client = build_http_client(&UserAgentConfig::default(), &CrawlerConfig::default()).unwrap();
/// ```
pub fn build_http_client(
    user_agent: &UserAgentConfig,
    crawler: &CrawlerConfig,
) -> Result<Client, reqwest::Error> {
    let timeout = crawler.fetch_timeout();

    Client::builder()
        .user_agent(user_agent.header_value())
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .redirect(Policy::limited(crawler.max_redirects))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a site's root page, retrying transient failures
///
/// Each attempt is bounded by `policy.timeout`; a timed-out attempt counts as
/// one attempt. A site that keeps failing transiently is requested
/// `policy.max_retries + 1` times before the last error is returned.
pub async fn fetch_site(
    client: &Client,
    site: &SiteConfig,
    policy: &FetchPolicy,
) -> Result<FetchedPage, FetchError> {
    fetch_url(client, &site.root_url, policy).await
}

/// Fetches any URL with the same timeout and retry rules as [`fetch_site`]
pub async fn fetch_url(
    client: &Client,
    url: &Url,
    policy: &FetchPolicy,
) -> Result<FetchedPage, FetchError> {
    let mut retry = 0;

    loop {
        let attempt = tokio::time::timeout(policy.timeout, fetch_once(client, url));
        let result = match attempt.await {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout),
        };

        match result {
            Ok(page) => {
                tracing::debug!(
                    "Fetched {} ({} bytes, status {})",
                    page.final_url,
                    page.body.len(),
                    page.status_code
                );
                return Ok(page);
            }
            Err(err) if err.is_transient() && retry < policy.max_retries => {
                let delay = policy.backoff_for(retry);
                retry += 1;
                tracing::warn!(
                    "Fetching {} failed ({}), retry {}/{} in {:?}",
                    url,
                    err,
                    retry,
                    policy.max_retries,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Performs a single GET request
async fn fetch_once(client: &Client, url: &Url) -> Result<FetchedPage, FetchError> {
    let response = client.get(url.clone()).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(FetchError::HttpStatus(status.as_u16()));
    }

    let final_url = response.url().clone();
    let body = response.bytes().await?;

    Ok(FetchedPage {
        final_url,
        status_code: status.as_u16(),
        body: body.to_vec(),
    })
}
