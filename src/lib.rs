//! Steam Harvest
//!
//! Recency-bounded crawler for the Steam store catalog. Listing pages sorted by
//! release date are walked until a page carries nothing inside the recency
//! window; detail pages are normalized into typed [`domain::GameRecord`]s.

pub mod crawling;
pub mod domain;
pub mod infrastructure;
pub mod normalization;

pub use crawling::{HarvestError, HarvestOrchestrator, HarvestStats};
pub use domain::GameRecord;
pub use infrastructure::AppConfig;
