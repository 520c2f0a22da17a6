//! Fetch-layer port
//!
//! The core only sees fetched pages or a failure. Retries, throttling and
//! redirects are the implementation's business.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use super::request::CrawlRequest;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Failed to read body of {url}: {message}")]
    Body { url: String, message: String },

    #[error("Gave up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: String,
    },
}

impl FetchError {
    /// Worth another attempt: network trouble, timeouts, 5xx and 429
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            Self::Body { .. } | Self::RetriesExhausted { .. } => false,
        }
    }
}

/// A successfully fetched page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub request: CrawlRequest,
    /// URL the body was finally served from, after redirects
    pub final_url: Url,
    pub status: u16,
    pub body: String,
    pub latency: Duration,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &CrawlRequest) -> Result<FetchedPage, FetchError>;
}
