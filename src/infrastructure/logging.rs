//! Logging setup and the tracing-backed soft failure reporter
//!
//! - Console output goes to stderr, stdout is reserved for harvested records
//! - Optional file output, plain or JSON, rotated by renaming on startup
//! - `RUST_LOG` overrides the configured level and dependency directives

use std::path::Path;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use lazy_static::lazy_static;
use tracing::{info, warn};
use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    EnvFilter, Registry,
    fmt::{
        self,
        format::{DefaultFields, Format, Full},
        time::ChronoUtc,
    },
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub use crate::infrastructure::config::LoggingConfig;
use crate::domain::{ParseFailureReporter, SoftParseFailure};

// Keeps the non-blocking file writer alive for the life of the process
lazy_static! {
    static ref LOG_GUARDS: Mutex<Vec<WorkerGuard>> = Mutex::new(Vec::new());
}

/// Noisy dependency targets, capped unless the level is trace
const QUIET_DIRECTIVES: [&str; 5] = [
    "reqwest=info",
    "hyper=warn",
    "h2=warn",
    "html5ever=warn",
    "selectors=warn",
];

/// Filter for the configured level. `RUST_LOG` wins when set.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(level))
}

fn default_filter(level: &str) -> EnvFilter {
    let level = level.to_lowercase();
    let mut filter = EnvFilter::new(&level);
    if level != "trace" {
        for directive in QUIET_DIRECTIVES {
            if let Ok(directive) = directive.parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

/// Rename a leftover log file to `<stem>.<timestamp>.log`
fn rotate_existing_log_file(log_dir: &Path, file_name: &str) -> Result<()> {
    let path = log_dir.join(file_name);
    if !path.exists() {
        return Ok(());
    }

    let metadata = std::fs::metadata(&path)
        .map_err(|e| anyhow!("Failed to get log file metadata: {}", e))?;
    let modified: chrono::DateTime<chrono::Utc> = metadata
        .modified()
        .unwrap_or_else(|_| std::time::SystemTime::now())
        .into();

    let stem = file_name.trim_end_matches(".log");
    let rotated = log_dir.join(format!("{stem}.{}.log", modified.format("%Y%m%dT%H%M%S")));
    std::fs::rename(&path, &rotated).map_err(|e| {
        anyhow!(
            "Failed to rotate log file {} to {}: {}",
            path.display(),
            rotated.display(),
            e
        )
    })?;
    Ok(())
}

type ConsoleLayer<S> =
    fmt::Layer<S, DefaultFields, Format<Full, ChronoUtc>, fn() -> std::io::Stderr>;

/// Human-readable stderr layer, generic over whatever it is stacked on
fn console_layer<S>() -> ConsoleLayer<S> {
    fmt::Layer::new()
        .with_writer(std::io::stderr as fn() -> std::io::Stderr)
        .with_timer(ChronoUtc::rfc_3339())
        .with_target(false)
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging_with_config(config: &LoggingConfig) -> Result<()> {
    let registry = Registry::default().with(build_filter(&config.level));

    let file_writer = if config.file_output {
        std::fs::create_dir_all(&config.log_dir).map_err(|e| {
            anyhow!("Failed to create log directory {:?}: {}", config.log_dir, e)
        })?;
        rotate_existing_log_file(&config.log_dir, &config.file_name)?;

        let appender = rolling::never(&config.log_dir, &config.file_name);
        let (writer, guard) = non_blocking(appender);
        LOG_GUARDS
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(guard);
        Some(writer)
    } else {
        None
    };

    let installed = match (file_writer, config.console_output) {
        (Some(writer), console) => {
            if config.json_format {
                let file_layer = fmt::Layer::new()
                    .json()
                    .with_writer(writer)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_ansi(false);
                registry
                    .with(file_layer)
                    .with(console.then(console_layer))
                    .try_init()
            } else {
                let file_layer = fmt::Layer::new()
                    .with_writer(writer)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_target(false)
                    .with_ansi(false);
                registry
                    .with(file_layer)
                    .with(console.then(console_layer))
                    .try_init()
            }
        }
        (None, true) => registry.with(console_layer()).try_init(),
        (None, false) => return Err(anyhow!("No logging output configured")),
    };
    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))?;

    info!(
        level = %config.level,
        json = config.json_format,
        console = config.console_output,
        file = config.file_output,
        log_dir = ?config.log_dir,
        "logging initialized"
    );
    Ok(())
}

/// Emits each soft parse failure as a structured warning
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl ParseFailureReporter for TracingReporter {
    fn report(&self, failure: SoftParseFailure) {
        warn!(
            kind = SoftParseFailure::KIND,
            field = %failure.field,
            raw = %failure.raw,
            "soft parse failure"
        );
    }
}
