//! HTTP fetcher for the store with rate limiting, adaptive delay and retries

use std::future::Future;
use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, direct::NotKeyed},
};
use reqwest::{
    Client,
    header::{COOKIE, HeaderMap, HeaderValue, USER_AGENT},
};
use tracing::{debug, warn};

use super::config::HttpConfig;
use super::throttle::AutoThrottle;
use crate::crawling::{CrawlRequest, FetchError, FetchedPage, PageFetcher};

/// Redirects are followed; the final URL is kept for age-check detection
const MAX_REDIRECTS: usize = 10;

/// Exponential backoff for transient fetch failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retry_attempts: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &HttpConfig) -> Self {
        Self {
            max_retry_attempts: config.max_retry_attempts,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Wait before retry number `attempt + 1`
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Run `attempt_fetch` until it succeeds, fails permanently, or the
    /// retries run out. A transient failure that was retried at least once
    /// ends as `RetriesExhausted`; anything else is returned as is.
    pub async fn run<F, Fut>(
        &self,
        url: &str,
        mut attempt_fetch: F,
    ) -> Result<FetchedPage, FetchError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<FetchedPage, FetchError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            match attempt_fetch().await {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < self.max_retry_attempts => {
                    let delay = self.backoff(attempt);
                    attempt += 1;
                    warn!(
                        url,
                        attempt,
                        max_attempts = self.max_retry_attempts,
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "transient fetch failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) if e.is_transient() && attempt > 0 => {
                    return Err(FetchError::RetriesExhausted {
                        url: url.to_string(),
                        attempts: attempt + 1,
                        last: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }
    }
}

pub struct HttpFetcher {
    client: Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    throttle: AutoThrottle,
    retry: RetryPolicy,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent).context("Invalid user agent")?,
        );

        let client = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .gzip(true)
            .brotli(true)
            .build()
            .context("Failed to create HTTP client")?;

        let quota = Quota::per_second(
            NonZeroU32::new(config.max_requests_per_second)
                .context("Rate limit must be greater than 0")?,
        );

        Ok(Self {
            client,
            rate_limiter: RateLimiter::direct(quota),
            throttle: AutoThrottle::new(&config.autothrottle),
            retry: RetryPolicy::from_config(config),
        })
    }

    pub fn current_delay(&self) -> Duration {
        self.throttle.current_delay()
    }

    async fn fetch_once(&self, request: &CrawlRequest) -> Result<FetchedPage, FetchError> {
        let url = request.url.as_str();

        let wait = self.throttle.reserve();
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        self.rate_limiter.until_ready().await;

        let mut builder = self.client.get(request.url.clone());
        if let Some(cookies) = request.cookie_header() {
            builder = builder.header(COOKIE, cookies);
        }

        let started = Instant::now();
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Network {
                    url: url.to_string(),
                    message: e.to_string(),
                }
            }
        })?;
        let latency = started.elapsed();
        let status = response.status();
        self.throttle.record(latency, status.as_u16());

        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await.map_err(|e| FetchError::Body {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        debug!(
            url,
            final_url = %final_url,
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            bytes = body.len(),
            "fetched"
        );

        Ok(FetchedPage {
            request: request.clone(),
            final_url,
            status: status.as_u16(),
            body,
            latency,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, request: &CrawlRequest) -> Result<FetchedPage, FetchError> {
        self.retry
            .run(request.url.as_str(), || self.fetch_once(request))
            .await
    }
}
