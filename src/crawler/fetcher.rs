//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler:
//! - Building the HTTP client with the crawler's user agent
//! - Single GET requests that never follow redirects
//! - Retry on transport failures only; every HTTP status is a response
//!
//! The crawler talks to the network through the [`Fetcher`] trait so tests can
//! script responses without a server.

use crate::config::{CrawlerConfig, UserAgentConfig};
use async_trait::async_trait;
use reqwest::{header, redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Transport-level failure, after all retries
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("Request failed for {url}: {message}")]
    Other { url: String, message: String },
}

/// A received HTTP response, whatever its status
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchResponse {
    pub status_code: u16,
    pub content_type: Option<String>,
    pub location: Option<String>,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..=299).contains(&self.status_code)
    }

    /// Statuses whose `Location` is recorded as a link
    pub fn is_redirect(&self) -> bool {
        matches!(self.status_code, 301 | 302 | 303 | 307 | 308)
    }

    pub fn is_error(&self) -> bool {
        (400..=599).contains(&self.status_code)
    }

    pub fn is_html(&self) -> bool {
        let content_type = self
            .content_type
            .as_deref()
            .unwrap_or("")
            .trim()
            .to_lowercase();
        content_type.starts_with("text/html") || content_type.starts_with("application/xhtml+xml")
    }
}

/// Source of HTTP responses for the crawler
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Issues a GET for `url` without following redirects
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError>;
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are never followed by the client itself.
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// reqwest-backed [`Fetcher`] with a fixed retry policy
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    attempts: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(
        user_agent: &UserAgentConfig,
        crawler: &CrawlerConfig,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: build_http_client(user_agent)?,
            attempts: crawler.retry_attempts.max(1),
            retry_delay: crawler.retry_delay(),
        })
    }

    /// Wraps an existing client
    pub fn with_client(client: Client, attempts: u32, retry_delay: Duration) -> Self {
        Self {
            client,
            attempts: attempts.max(1),
            retry_delay,
        }
    }

    async fn fetch_once(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status_code = response.status().as_u16();
        let content_type = header_string(&response, header::CONTENT_TYPE);
        let location = header_string(&response, header::LOCATION);

        // A body cut short is a transport failure like any other
        let body = response
            .bytes()
            .await
            .map_err(|e| classify_error(url, e))?
            .to_vec();

        Ok(FetchResponse {
            status_code,
            content_type,
            location,
            body,
        })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<FetchResponse, FetchError> {
        let mut attempt = 1;
        loop {
            match self.fetch_once(url, timeout).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.attempts => {
                    debug!(url = %url, attempt, error = %e, "retrying request");
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn header_string(response: &reqwest::Response, name: header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

fn classify_error(url: &str, e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        FetchError::Connect {
            url: url.to_string(),
            message: e.to_string(),
        }
    } else {
        FetchError::Other {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}
