//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests with a per-request timeout
//! - Error classification (timeout, HTTP status, transport, content type)
//!
//! Nothing is retried here: a failed URL stays failed for the rest of the
//! run, and the next run is the retry.

use crate::config::UserAgentConfig;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Why a fetch failed
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP {0}")]
    Http(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("not an HTML page (content-type: {0})")]
    NotHtml(String),
}

impl FetchError {
    fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            Self::Timeout(timeout)
        } else if error.is_connect() {
            Self::Network(format!("connection failed: {}", error))
        } else {
            Self::Network(error.to_string())
        }
    }
}

/// A successfully fetched HTML page
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status: u16,

    /// Content-Type header value, if any
    pub content_type: Option<String>,

    /// Decoded page body
    pub body: String,
}

/// Builds an HTTP client with proper configuration
///
/// # Example
///
/// ```no_run
/// use news_cacher::config::UserAgentConfig;
/// use news_cacher::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "BoatNetBuddy".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: None,
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches a page with a wall-clock timeout
///
/// # Outcomes
///
/// | Condition | Result |
/// |-----------|--------|
/// | 2xx with HTML (or no) content type | `Ok(FetchedPage)` |
/// | 2xx with another content type | `FetchError::NotHtml` |
/// | Non-2xx status | `FetchError::Http` |
/// | Timeout (request or body) | `FetchError::Timeout` |
/// | Any other transport failure | `FetchError::Network` |
pub async fn fetch_page(
    client: &Client,
    url: &Url,
    timeout: Duration,
) -> Result<FetchedPage, FetchError> {
    let response = client
        .get(url.clone())
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| FetchError::from_reqwest(e, timeout))?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Http(status.as_u16()));
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    if let Some(ct) = &content_type {
        if !ct.to_ascii_lowercase().contains("html") {
            return Err(FetchError::NotHtml(ct.clone()));
        }
    }

    let body = response
        .text()
        .await
        .map_err(|e| FetchError::from_reqwest(e, timeout))?;

    Ok(FetchedPage {
        final_url,
        status: status.as_u16(),
        content_type,
        body,
    })
}
