//! Data models for collected news items and per-source fetch outcomes.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`NewsItem`]: one normalized content record produced by a fetcher
//! - [`FetchBatch`]: a fetcher's return value (items plus an optional warning)
//! - [`FetchOutcome`]: the per-source diagnostic record emitted by the manager
//! - [`NewsDigest`]: the JSON-serializable result of one full run
//!
//! Items are created exclusively inside fetchers, never mutated afterwards,
//! and possibly discarded as duplicates by the manager.

use serde::{Deserialize, Serialize};

/// One normalized news record.
///
/// The only integrity invariant in the system lives here: a valid item has a
/// non-empty `title`, a non-empty `source`, and an absolute `http(s)` URL.
/// Fetchers enforce it through [`NewsItem::is_valid`] before returning.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NewsItem {
    /// Headline text.
    pub title: String,
    /// Absolute article URL; also the sole deduplication key.
    pub url: String,
    /// Human-readable origin, e.g. `"NaverNews(수소)"` for keyword hits, so
    /// provenance is recoverable from the item alone.
    pub source: String,
    /// Publication timestamp as reported by the source, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    /// The search keyword that produced this item, for keyword sources only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    /// Short description text; only some sources supply one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NewsItem {
    /// Shared validation rule applied by every fetcher.
    ///
    /// Invalid items are dropped silently at the item level; they are too
    /// granular to be actionable in logs and only show up as a smaller count.
    pub fn is_valid(&self) -> bool {
        if self.title.is_empty() || self.source.is_empty() {
            return false;
        }
        self.url.starts_with("http://") || self.url.starts_with("https://")
    }
}

/// What one fetch call hands back to the manager.
///
/// A batch can carry a warning alongside its items: a feed recovered by the
/// lenient parser, or a keyword provider where some keywords failed. The
/// manager reports such batches as [`OutcomeStatus::PartialWarning`].
#[derive(Debug, Default)]
pub struct FetchBatch {
    pub items: Vec<NewsItem>,
    pub warning: Option<String>,
}

impl FetchBatch {
    pub fn new(items: Vec<NewsItem>) -> Self {
        Self {
            items,
            warning: None,
        }
    }

    pub fn with_warning(items: Vec<NewsItem>, warning: impl Into<String>) -> Self {
        Self {
            items,
            warning: Some(warning.into()),
        }
    }
}

/// Status of one source's fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    PartialWarning,
    Failed,
}

/// Per-source result of one fetch attempt.
///
/// Outcomes exist for logging and reporting only; they are never consulted
/// when assembling the item collection.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FetchOutcome {
    /// Source name as registered with the manager.
    pub source: String,
    /// Number of items the source contributed before deduplication.
    pub item_count: usize,
    pub status: OutcomeStatus,
    /// Failure or warning reason; absent on clean success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl FetchOutcome {
    pub fn success(source: impl Into<String>, item_count: usize) -> Self {
        Self {
            source: source.into(),
            item_count,
            status: OutcomeStatus::Success,
            detail: None,
        }
    }

    pub fn warning(source: impl Into<String>, item_count: usize, detail: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            item_count,
            status: OutcomeStatus::PartialWarning,
            detail: Some(detail.into()),
        }
    }

    pub fn failed(source: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            item_count: 0,
            status: OutcomeStatus::Failed,
            detail: Some(detail.into()),
        }
    }
}

/// The serialized result of one full pipeline run.
#[derive(Debug, Deserialize, Serialize)]
pub struct NewsDigest {
    /// The date of the run in `YYYY-MM-DD` format.
    pub local_date: String,
    /// The local time of the run in `HH:MM:SS` format.
    pub local_time: String,
    /// Deduplicated items, first occurrence wins, registration order.
    pub items: Vec<NewsItem>,
    /// One outcome per registered source, in registration order.
    pub outcomes: Vec<FetchOutcome>,
}
