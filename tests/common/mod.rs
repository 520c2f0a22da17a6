//! Shared helpers for integration tests: fixture loading and an offline fetcher
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use url::Url;

use steam_harvest_lib::crawling::{CrawlRequest, DupeFilter, FetchError, FetchedPage, PageFetcher};

pub const SEED: &str = "https://store.steampowered.com/search/?sort_by=Released_DESC&category1=998";

pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("missing fixture {}: {e}", path.display()))
}

pub fn url(raw: &str) -> Url {
    Url::parse(raw).unwrap()
}

pub fn listing_url(page: u32) -> Url {
    url(&format!("{SEED}&page={page}"))
}

/// 2019-08-18, the instant the listing fixtures were captured against
pub fn frozen_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2019, 8, 18, 0, 0, 0).unwrap()
}

struct Route {
    final_url: Url,
    body: String,
}

/// Serves fixtures keyed by request fingerprint; anything else is a 404
#[derive(Default)]
pub struct StaticFetcher {
    routes: HashMap<String, Route>,
    requested: Mutex<Vec<CrawlRequest>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, request_url: &str, fixture_name: &str) -> Self {
        let request_url = url(request_url);
        self.routes.insert(
            DupeFilter::fingerprint(&request_url),
            Route {
                final_url: request_url,
                body: fixture(fixture_name),
            },
        );
        self
    }

    /// Serve `fixture_name` as if the request had been redirected to `final_url`
    pub fn redirect(mut self, request_url: &str, final_url: &str, fixture_name: &str) -> Self {
        self.routes.insert(
            DupeFilter::fingerprint(&url(request_url)),
            Route {
                final_url: url(final_url),
                body: fixture(fixture_name),
            },
        );
        self
    }

    pub fn requested(&self) -> Vec<CrawlRequest> {
        self.requested.lock().unwrap().clone()
    }

    /// The fixture catalog: four listing pages, two games, an age-gated title
    /// and a page without a title
    pub fn catalog() -> Self {
        Self::new()
            .route(SEED, "listing_page_1.html")
            .route(listing_url(2).as_str(), "listing_page_2.html")
            .route(listing_url(3).as_str(), "listing_page_3.html")
            .route(listing_url(4).as_str(), "listing_page_4.html")
            .route(
                "https://store.steampowered.com/app/620/Portal_2/",
                "detail_portal_2.html",
            )
            .route(
                "https://store.steampowered.com/app/412830/STEINSGATE/",
                "detail_steins_gate.html",
            )
            .redirect(
                "https://store.steampowered.com/app/999/Mature_Title/",
                "https://store.steampowered.com/agecheck/app/999/",
                "agecheck.html",
            )
            .route(
                "https://store.steampowered.com/app/1000/Untitled/",
                "detail_untitled.html",
            )
    }
}

#[async_trait]
impl PageFetcher for StaticFetcher {
    async fn fetch(&self, request: &CrawlRequest) -> Result<FetchedPage, FetchError> {
        self.requested.lock().unwrap().push(request.clone());
        tokio::task::yield_now().await;

        let Some(route) = self.routes.get(&DupeFilter::fingerprint(&request.url)) else {
            return Err(FetchError::HttpStatus {
                url: request.url.to_string(),
                status: 404,
            });
        };
        Ok(FetchedPage {
            request: request.clone(),
            final_url: route.final_url.clone(),
            status: 200,
            body: route.body.clone(),
            latency: Duration::from_millis(5),
        })
    }
}
