//! Site characteristics and harvest defaults
//!
//! Store-specific constants for the Steam catalog plus the defaults every
//! configuration layer falls back to.

/// Steam store characteristics
pub mod site {
    /// Catalog search sorted newest-first, games only
    pub const SEED_URL: &str =
        "https://store.steampowered.com/search/?sort_by=Released_DESC&category1=998";

    /// Domains links may point into (subdomains included)
    pub const ALLOWED_DOMAINS: &[&str] = &["steampowered.com"];

    /// Path marker of the age verification interstitial
    pub const AGE_CHECK_MARKER: &str = "/agecheck/app";

    /// Tracking query parameter that makes otherwise identical URLs differ
    pub const TRACKING_PARAM: &str = "snr";

    /// Query parameter carrying the listing page number
    pub const PAGE_PARAM: &str = "page";

    /// Listing pages are numbered from 1
    pub const PAGE_NUMBERING_BASE: u32 = 1;
}

/// Fixed cookie set attached to every outgoing request
pub mod cookies {
    pub const LANGUAGE: &str = "Steam_language";
    pub const MATURE_CONTENT: (&str, &str) = ("mature_content", "1");
    pub const LAST_AGE_CHECK: (&str, &str) = ("lastagecheckage", "1-0-2000");
    pub const BIRTH_TIME: (&str, &str) = ("birthtime", "943999201");
}

/// Default harvest policy values
pub mod defaults {
    /// Minimum review count for `numReviews` to be kept
    pub const REVIEW_THRESHOLD: i64 = 500;

    /// Recency window in days
    pub const MAX_AGE_DAYS: i64 = 2;

    pub const LANGUAGE: &str = "english";

    /// Ordered most to least specific
    pub const DATE_FORMATS: &[&str] = &["%d %b, %Y", "%b %Y", "%B %Y", "%B, %Y", "%Y"];

    pub const MIN_LABEL: &str = "Minimum:";
    pub const REC_LABEL: &str = "Recommended:";
    pub const OS_LABEL: &str = "OS:";
    pub const CPU_LABEL: &str = "Processor:";
    pub const GPU_LABEL: &str = "Graphics:";
    pub const RAM_LABEL: &str = "Memory:";

    pub const REQUEST_TIMEOUT_MS: u64 = 30_000;
    pub const MAX_CONCURRENT_REQUESTS: u32 = 16;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 8;
    pub const MAX_RETRY_ATTEMPTS: u32 = 3;
    pub const RETRY_DELAY_MS: u64 = 500;

    pub const THROTTLE_START_DELAY_MS: u64 = 5_000;
    pub const THROTTLE_MAX_DELAY_MS: u64 = 60_000;
    pub const THROTTLE_TARGET_CONCURRENCY: f64 = 4.0;

    pub const USER_AGENT: &str = concat!("steam-harvest/", env!("CARGO_PKG_VERSION"));
}

/// Validation bounds for configuration values
pub mod validation {
    pub const MIN_CONCURRENT_REQUESTS: u32 = 1;
    pub const MAX_CONCURRENT_REQUESTS: u32 = 64;

    pub const MIN_REQUESTS_PER_SECOND: u32 = 1;
    pub const MAX_REQUESTS_PER_SECOND: u32 = 100;

    pub const MIN_REQUEST_TIMEOUT_MS: u64 = 1_000;
    pub const MAX_REQUEST_TIMEOUT_MS: u64 = 300_000;

    pub const MAX_RETRY_ATTEMPTS: u32 = 10;

    /// Ten years is already longer than any sane recency window
    pub const MAX_AGE_DAYS: i64 = 3_650;
}
