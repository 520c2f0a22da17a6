use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use steam_harvest_lib::domain::RecordSink;
use steam_harvest_lib::infrastructure::{
    AppConfig, HttpFetcher, JsonLinesSink, TracingReporter, init_logging_with_config,
};
use steam_harvest_lib::HarvestOrchestrator;

/// Harvest recently released games from the Steam store as JSON lines
#[derive(Parser, Debug)]
#[command(name = "steam-harvest", version, about, long_about = None)]
struct Cli {
    /// TOML configuration file (defaults to config/harvest.toml when present)
    #[arg(short, long, env = "STEAM_HARVEST_CONFIG")]
    config: Option<PathBuf>,

    /// Write records to this file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Recency window in days
    #[arg(long)]
    max_age_days: Option<i64>,

    /// Minimum review count kept on a record
    #[arg(long)]
    review_threshold: Option<i64>,

    /// First listing page to crawl
    #[arg(long)]
    seed_url: Option<String>,

    /// Stop after this listing page number
    #[arg(long)]
    max_listing_pages: Option<u32>,

    /// Log level: error, warn, info, debug, trace
    #[arg(long)]
    log_level: Option<String>,

    /// Emit file logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(days) = self.max_age_days {
            config.harvest.max_age_days = days;
        }
        if let Some(threshold) = self.review_threshold {
            config.harvest.review_threshold = threshold;
        }
        if let Some(seed) = &self.seed_url {
            config.harvest.seed_url.clone_from(seed);
        }
        if self.max_listing_pages.is_some() {
            config.harvest.max_listing_pages = self.max_listing_pages;
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
        if self.json_logs {
            config.logging.json_format = true;
        }
        if self.output.is_some() {
            config.output.path.clone_from(&self.output);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("Invalid command line overrides")?;

    init_logging_with_config(&config.logging)?;
    info!(version = env!("CARGO_PKG_VERSION"), "steam-harvest starting");

    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
    let orchestrator = HarvestOrchestrator::from_config(&config.harvest, &config.http, fetcher)?
        .with_reporter(Arc::new(TracingReporter));

    let mut sink = match &config.output.path {
        Some(path) => JsonLinesSink::create(path)
            .await
            .with_context(|| format!("Failed to open output file {}", path.display()))?,
        None => JsonLinesSink::stdout(),
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupt received, finishing in-flight pages");
                on_signal.cancel();
            }
            Err(e) => error!(error = %e, "failed to listen for interrupt"),
        }
    });

    let stats = match orchestrator.run(&mut sink, cancel).await {
        Ok(stats) => stats,
        Err(e) => {
            // keep whatever was already written
            if let Err(flush) = sink.flush().await {
                error!(error = %flush, "failed to flush output");
            }
            return Err(e).context("Harvest failed");
        }
    };

    info!(
        stats = %serde_json::to_string(&stats).unwrap_or_default(),
        "run summary"
    );
    Ok(())
}
