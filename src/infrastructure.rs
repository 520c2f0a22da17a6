//! Infrastructure layer
//!
//! Configuration, HTML selection, the HTTP fetcher, logging and record sinks.

pub mod config;
pub mod html;
pub mod http_client;
pub mod logging;
pub mod record_sink;
pub mod throttle;

pub use self::config::{AppConfig, ConfigError, HarvestConfig, HttpConfig, LoggingConfig, OutputConfig};
pub use self::html::{HtmlPage, SelectorError, SelectorSpec, SiteProfile, SiteSelectors};
pub use self::http_client::{HttpFetcher, RetryPolicy};
pub use self::logging::{TracingReporter, init_logging_with_config};
pub use self::record_sink::{JsonLinesSink, MemoryRecordSink};
pub use self::throttle::AutoThrottle;
