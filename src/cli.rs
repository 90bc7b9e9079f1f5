//! Command-line interface definitions.
//!
//! This module defines the CLI arguments and options using the `clap` crate.

use clap::Parser;

/// Command-line arguments for the news collector.
///
/// # Examples
///
/// ```sh
/// # Collect with the defaults next to the binary
/// h2_news
///
/// # Explicit paths and tighter limits
/// h2_news -c ./sources.yaml -o ./digests --max-per-source 3 --max-per-keyword 2
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Path to the YAML source configuration
    #[arg(short, long, default_value = "sources.yaml")]
    pub config: String,

    /// Output directory for the JSON digest
    #[arg(short, long, default_value = "./output")]
    pub output_dir: String,

    /// Maximum items per limit-based source
    #[arg(long, default_value_t = 5)]
    pub max_per_source: usize,

    /// Maximum items per keyword for search-based sources
    #[arg(long, default_value_t = 3)]
    pub max_per_keyword: usize,

    /// Append-only failure log written by the fetch manager
    #[arg(long, default_value = "logs/failed_sources.log")]
    pub failure_log: String,
}
