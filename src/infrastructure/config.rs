//! Application configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `STEAM_HARVEST_*` environment variables (`__` separates nested
//! keys, e.g. `STEAM_HARVEST_HARVEST__MAX_AGE_DAYS=7`). The result is validated
//! once at startup and never mutated afterwards.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::crawling::LinkRules;
use crate::domain::constants::{defaults, site, validation};
use crate::infrastructure::html::{SiteProfile, SiteSelectors};
use crate::normalization::processors::NormalizationPolicy;
use crate::normalization::{DateParser, LabelSet, RequirementsSlicing};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config from file: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

impl ConfigError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub harvest: HarvestConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

/// Harvest policy consumed by the frontier and the assembler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Review counts below this are dropped from the record
    pub review_threshold: i64,
    /// Recency window in days
    pub max_age_days: i64,
    pub labels: LabelSet,
    /// Tried in order, most specific first
    pub date_formats: Vec<String>,
    pub seed_url: String,
    /// URL marker of the age verification interstitial
    pub age_check_marker: String,
    pub allowed_domains: Vec<String>,
    /// Value of the store language cookie
    pub language: String,
    pub requirements_slicing: RequirementsSlicing,
    /// Optional hard cap on listing page numbers
    pub max_listing_pages: Option<u32>,
    pub selectors: SiteProfile,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            review_threshold: defaults::REVIEW_THRESHOLD,
            max_age_days: defaults::MAX_AGE_DAYS,
            labels: LabelSet::default(),
            date_formats: defaults::DATE_FORMATS
                .iter()
                .map(|format| (*format).to_string())
                .collect(),
            seed_url: site::SEED_URL.to_string(),
            age_check_marker: site::AGE_CHECK_MARKER.to_string(),
            allowed_domains: site::ALLOWED_DOMAINS
                .iter()
                .map(|domain| (*domain).to_string())
                .collect(),
            language: defaults::LANGUAGE.to_string(),
            requirements_slicing: RequirementsSlicing::default(),
            max_listing_pages: None,
            selectors: SiteProfile::default(),
        }
    }
}

impl HarvestConfig {
    pub fn date_parser(&self) -> DateParser {
        DateParser::new(&self.date_formats)
    }

    pub fn normalization_policy(&self) -> NormalizationPolicy {
        NormalizationPolicy::new(
            self.review_threshold,
            self.max_age_days,
            self.labels.clone(),
            self.requirements_slicing,
            self.date_parser(),
        )
    }

    pub fn seed_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.seed_url)
            .map_err(|e| ConfigError::invalid(format!("seed_url '{}': {e}", self.seed_url)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::invalid(format!(
                "seed_url must be http(s), got '{}'",
                self.seed_url
            )));
        }
        Ok(url)
    }

    pub fn site_selectors(&self) -> Result<SiteSelectors, ConfigError> {
        SiteSelectors::compile(&self.selectors)
            .map_err(|e| ConfigError::invalid(format!("selectors: {e}")))
    }

    pub fn link_rules(&self) -> Result<LinkRules, ConfigError> {
        LinkRules::from_listing(&self.selectors.listing, self.allowed_domains.clone())
            .map_err(|e| ConfigError::invalid(format!("selectors.listing: {e}")))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.review_threshold < 0 {
            return Err(ConfigError::invalid("review_threshold must not be negative"));
        }

        if !(0..=validation::MAX_AGE_DAYS).contains(&self.max_age_days) {
            return Err(ConfigError::invalid(format!(
                "max_age_days must be between 0 and {}",
                validation::MAX_AGE_DAYS
            )));
        }

        if self.date_formats.is_empty()
            || self.date_formats.iter().any(|format| format.trim().is_empty())
        {
            return Err(ConfigError::invalid(
                "date_formats must list at least one non-empty format",
            ));
        }

        if self.labels.is_ambiguous() {
            return Err(ConfigError::invalid(
                "requirement labels must be non-empty and distinct",
            ));
        }

        if self.language.trim().is_empty() {
            return Err(ConfigError::invalid("language must not be empty"));
        }

        if self.max_listing_pages == Some(0) {
            return Err(ConfigError::invalid("max_listing_pages must be greater than 0"));
        }

        let seed = self.seed_url()?;
        let rules = self.link_rules()?;
        if !rules.is_allowed(&seed) {
            return Err(ConfigError::invalid(format!(
                "seed_url host is outside allowed_domains {:?}",
                self.allowed_domains
            )));
        }
        self.site_selectors()?;

        Ok(())
    }
}

/// Adaptive delay settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoThrottleConfig {
    pub enabled: bool,
    pub start_delay_ms: u64,
    pub max_delay_ms: u64,
    /// Average number of requests to keep in flight against the server
    pub target_concurrency: f64,
}

impl Default for AutoThrottleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            start_delay_ms: defaults::THROTTLE_START_DELAY_MS,
            max_delay_ms: defaults::THROTTLE_MAX_DELAY_MS,
            target_concurrency: defaults::THROTTLE_TARGET_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub request_timeout_ms: u64,
    pub max_concurrent_requests: u32,
    pub max_requests_per_second: u32,
    pub max_retry_attempts: u32,
    /// Base delay of the exponential retry backoff
    pub retry_delay_ms: u64,
    pub autothrottle: AutoThrottleConfig,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            request_timeout_ms: defaults::REQUEST_TIMEOUT_MS,
            max_concurrent_requests: defaults::MAX_CONCURRENT_REQUESTS,
            max_requests_per_second: defaults::MAX_REQUESTS_PER_SECOND,
            max_retry_attempts: defaults::MAX_RETRY_ATTEMPTS,
            retry_delay_ms: defaults::RETRY_DELAY_MS,
            autothrottle: AutoThrottleConfig::default(),
        }
    }
}

impl HttpConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::invalid("user_agent must not be empty"));
        }

        if !(validation::MIN_REQUEST_TIMEOUT_MS..=validation::MAX_REQUEST_TIMEOUT_MS)
            .contains(&self.request_timeout_ms)
        {
            return Err(ConfigError::invalid(format!(
                "request_timeout_ms must be between {} and {}",
                validation::MIN_REQUEST_TIMEOUT_MS,
                validation::MAX_REQUEST_TIMEOUT_MS
            )));
        }

        if !(validation::MIN_CONCURRENT_REQUESTS..=validation::MAX_CONCURRENT_REQUESTS)
            .contains(&self.max_concurrent_requests)
        {
            return Err(ConfigError::invalid(format!(
                "max_concurrent_requests must be between {} and {}",
                validation::MIN_CONCURRENT_REQUESTS,
                validation::MAX_CONCURRENT_REQUESTS
            )));
        }

        if !(validation::MIN_REQUESTS_PER_SECOND..=validation::MAX_REQUESTS_PER_SECOND)
            .contains(&self.max_requests_per_second)
        {
            return Err(ConfigError::invalid(format!(
                "max_requests_per_second must be between {} and {}",
                validation::MIN_REQUESTS_PER_SECOND,
                validation::MAX_REQUESTS_PER_SECOND
            )));
        }

        if self.max_retry_attempts > validation::MAX_RETRY_ATTEMPTS {
            return Err(ConfigError::invalid(format!(
                "max_retry_attempts must not exceed {}",
                validation::MAX_RETRY_ATTEMPTS
            )));
        }

        let throttle = &self.autothrottle;
        if throttle.start_delay_ms > throttle.max_delay_ms {
            return Err(ConfigError::invalid(
                "autothrottle start_delay_ms cannot be greater than max_delay_ms",
            ));
        }
        if !throttle.target_concurrency.is_finite() || throttle.target_concurrency < 1.0 {
            return Err(ConfigError::invalid(
                "autothrottle target_concurrency must be at least 1.0",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
    pub json_format: bool,
    /// Human readable output on stderr
    pub console_output: bool,
    pub file_output: bool,
    pub log_dir: PathBuf,
    pub file_name: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_dir: PathBuf::from("logs"),
            file_name: "steam-harvest.log".to_string(),
        }
    }
}

impl LoggingConfig {
    pub const LEVELS: [&'static str; 5] = ["error", "warn", "info", "debug", "trace"];

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !Self::LEVELS.contains(&self.level.to_lowercase().as_str()) {
            return Err(ConfigError::invalid(format!(
                "logging level '{}' is not one of {:?}",
                self.level,
                Self::LEVELS
            )));
        }
        if !self.console_output && !self.file_output {
            return Err(ConfigError::invalid("No logging output configured"));
        }
        if self.file_output && self.file_name.trim().is_empty() {
            return Err(ConfigError::invalid("logging file_name must not be empty"));
        }
        Ok(())
    }
}

/// Where accepted records go. No path means stdout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_PREFIX: &'static str = "STEAM_HARVEST";
    pub const DEFAULT_PATH: &'static str = "config/harvest.toml";

    /// Load from an explicit file (must exist) or the optional default file
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::from(Path::new(Self::DEFAULT_PATH)).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix(Self::ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.harvest.validate()?;
        self.http.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
