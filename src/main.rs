//! # H2 News
//!
//! A news acquisition pipeline that collects hydrogen-industry items from a
//! configurable set of sources, normalizes them into one schema, and writes
//! a deduplicated JSON digest for downstream processing.
//!
//! ## Features
//!
//! - Three source access patterns: syndication feeds, CSS-selector page
//!   scraping, and per-keyword search providers (Naver Open API, Google News)
//! - Declarative YAML source configuration with per-source enable states
//! - Per-source failure isolation: one broken source never aborts the run
//! - URL-based deduplication, first occurrence wins
//! - Per-source outcome records plus an append-only failure log
//!
//! ## Usage
//!
//! ```sh
//! h2_news -c sources.yaml -o ./output
//! ```
//!
//! ## Architecture
//!
//! The application follows a pipeline architecture:
//! 1. **Configuration**: Load the YAML source map
//! 2. **Construction**: The factory builds a fetcher per active source
//! 3. **Fetching**: The manager drives every fetcher inside an error boundary
//! 4. **Output**: The deduplicated digest is written as JSON

use chrono::Local;
use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{fmt as tfmt, EnvFilter};

mod cli;
mod config;
mod error;
mod factory;
mod fetchers;
mod manager;
mod models;
mod outputs;
mod utils;

use cli::Cli;
use factory::FetcherFactory;
use manager::FailureLog;
use models::{NewsDigest, OutcomeStatus};
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("h2_news starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.output_dir, args.max_per_source, args.max_per_keyword, "Parsed CLI arguments");

    // Early check: ensure the digest output dir is writable
    if let Err(e) = ensure_writable_dir(&args.output_dir).await {
        error!(
            path = %args.output_dir,
            error = %e,
            "Output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Load configuration and build fetchers ----
    let sources = config::load_sources(&args.config).await?;
    let factory = FetcherFactory::new();
    let manager = factory
        .manager_from_config(&sources)
        .with_failure_log(FailureLog::new(&args.failure_log));

    if manager.is_empty() {
        error!(config = %args.config, "No active sources could be constructed");
    }

    // ---- Fetch everything ----
    let report = manager
        .fetch_all(args.max_per_source, args.max_per_keyword)
        .await;

    let succeeded = report
        .outcomes
        .iter()
        .filter(|o| o.status == OutcomeStatus::Success)
        .count();
    let warned = report
        .outcomes
        .iter()
        .filter(|o| o.status == OutcomeStatus::PartialWarning)
        .count();
    let failed = report
        .outcomes
        .iter()
        .filter(|o| o.status == OutcomeStatus::Failed)
        .count();
    info!(
        items = report.items.len(),
        succeeded,
        warned,
        failed,
        "Fetch run complete"
    );

    // ---- Write digest ----
    let digest = NewsDigest {
        local_date: Local::now().date_naive().to_string(),
        local_time: Local::now().time().format("%H:%M:%S").to_string(),
        items: report.items,
        outcomes: report.outcomes,
    };

    if let Err(e) = outputs::json::write_digest(&digest, &args.output_dir).await {
        error!(error = %e, "Failed to write digest");
        return Err(e);
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
