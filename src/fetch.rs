//! Page fetching.
//!
//! Defines the `PageFetcher` trait and the reqwest-backed `HttpFetcher`.
//! One attempt per call; the timeout is always finite.

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::types::FetchError;

/// Browser-like user agent; the target page serves a stripped-down layout
/// to unknown clients.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// A single page request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    /// Extra headers as `(name, value)` pairs.
    pub headers: Vec<(String, String)>,
    pub timeout: Duration,
}

impl PageRequest {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            headers: vec![("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string())],
            timeout,
        }
    }
}

/// Abstraction over retrieving the raw page markup.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the page body. Non-success statuses are errors.
    async fn fetch(&self, request: &PageRequest) -> Result<String, FetchError>;
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new() -> anyhow::Result<Self> {
        let http = Client::builder()
            .build()
            .context("Failed to build HTTP client for page fetcher")?;
        Ok(Self { http })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<String, FetchError> {
        debug!(url = %request.url, timeout_secs = request.timeout.as_secs(), "Fetching page");

        let mut builder = self.http.get(&request.url).timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let resp = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: request.url.clone(),
                    timeout_secs: request.timeout.as_secs(),
                }
            } else {
                FetchError::Request {
                    url: request.url.clone(),
                    message: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: request.url.clone(),
                status: status.as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| FetchError::Body {
            url: request.url.clone(),
            message: e.to_string(),
        })?;

        debug!(url = %request.url, bytes = body.len(), "Page fetched");
        Ok(body)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req = PageRequest::new("https://example.test/tips", Duration::from_secs(30));
        assert_eq!(req.url, "https://example.test/tips");
        assert_eq!(req.timeout, Duration::from_secs(30));
        assert!(req
            .headers
            .iter()
            .any(|(k, v)| k == "User-Agent" && v == DEFAULT_USER_AGENT));
    }

    #[tokio::test]
    async fn test_invalid_url_is_request_error() {
        let fetcher = HttpFetcher::new().unwrap();
        let req = PageRequest::new("not a url", Duration::from_secs(2));
        let err = fetcher.fetch(&req).await.unwrap_err();
        assert!(matches!(err, FetchError::Request { .. }));
    }
}
