//! # Crawling
//!
//! Frontier control, link rules, duplicate filtering and record assembly,
//! plus the async orchestrator that drives them over a [`PageFetcher`].

pub mod assembler;
pub mod clock;
pub mod dupe_filter;
pub mod fetcher;
pub mod frontier;
pub mod orchestrator;
pub mod request;
pub mod rules;

pub use assembler::{ItemAssembler, Rejection};
pub use clock::{Clock, FixedClock, SystemClock};
pub use dupe_filter::DupeFilter;
pub use fetcher::{FetchError, FetchedPage, PageFetcher};
pub use frontier::{CrawlFrontierController, FrontierDecision, FrontierState, ListingPage};
pub use orchestrator::{HarvestError, HarvestOrchestrator, HarvestStats};
pub use request::{CrawlRequest, RequestKind};
pub use rules::{LinkMatcher, LinkRule, LinkRules};
