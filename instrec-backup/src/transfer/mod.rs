//! HTTP file fetch
//!
//! `fetch(url)` yields the status code and a byte stream; the caller decides
//! what a non-2xx status means and where the bytes go.

use futures::stream::{BoxStream, StreamExt};
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("instrec-backup/", env!("CARGO_PKG_VERSION"));

/// Fetch errors
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Status plus streamed body
pub struct FetchResponse {
    pub status: u16,
    pub body: BoxStream<'static, Result<Vec<u8>, FetchError>>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Streams the body behind a URL
#[async_trait::async_trait]
pub trait HttpFetch: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError>;
}

/// reqwest-backed fetcher
pub struct ReqwestFetcher {
    http: reqwest::Client,
}

impl ReqwestFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;

        Ok(Self { http })
    }
}

#[async_trait::async_trait]
impl HttpFetch for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        let url = reqwest::Url::parse(url).map_err(|e| FetchError::InvalidUrl(format!("{}: {}", url, e)))?;

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| {
                chunk
                    .map(|bytes| bytes.to_vec())
                    .map_err(|e| FetchError::Network(e.to_string()))
            })
            .boxed();

        Ok(FetchResponse { status, body })
    }
}
