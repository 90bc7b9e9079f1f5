//! Declarative source configuration, loaded from YAML.
//!
//! The configuration file is a top-level mapping from source name to a
//! [`SourceConfig`] entry:
//!
//! ```yaml
//! H2 News:
//!   type: feed
//!   url: http://www.h2news.kr/rss/S1N1.xml
//!   status: active
//! H2 View:
//!   type: markup
//!   url: https://www.h2-view.com/news/
//!   status: active
//!   extra:
//!     article_selector: "article.post"
//!     title_selector: "h2.title"
//! NaverNews:
//!   type: keyword-search-naver
//!   status: active
//!   extra:
//!     client_id: "..."
//!     client_secret: "..."
//!     keywords: ["수소", "수전해", "연료전지"]
//! ```
//!
//! Document order is preserved by [`load_sources`] so that fetcher
//! registration (and therefore dedup precedence) is deterministic.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Participation state of a configured source.
///
/// Only `active` sources join a full run; `testing` entries are kept in the
/// file for diagnostics tooling, `disabled` entries are dormant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceStatus {
    Active,
    Disabled,
    Testing,
}

impl Default for SourceStatus {
    // An entry that forgets to declare its status stays dormant.
    fn default() -> Self {
        SourceStatus::Disabled
    }
}

/// One source entry, read-only to the pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Dispatch tag for the factory: `feed`, `markup`,
    /// `keyword-search-naver`, `keyword-search-google`, or any tag added
    /// through [`crate::factory::FetcherFactory::register`].
    #[serde(rename = "type")]
    pub kind: String,
    /// Base URL or search endpoint. May be empty for keyword providers whose
    /// endpoint is fixed.
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub status: SourceStatus,
    /// Open key/value map for provider-specific needs: selectors,
    /// credentials, keyword lists, header overrides.
    #[serde(default)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl SourceConfig {
    /// Look up a string value in `extra`.
    pub fn extra_str(&self, key: &str) -> Option<String> {
        self.extra
            .get(key)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }

    /// Look up a list of strings in `extra`; missing key yields an empty list.
    pub fn extra_str_list(&self, key: &str) -> Vec<String> {
        self.extra
            .get(key)
            .and_then(|v| v.as_sequence())
            .map(|seq| {
                seq.iter()
                    .filter_map(|v| v.as_str())
                    .map(|s| s.to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Load the source map from a YAML file, preserving document order.
#[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
pub async fn load_sources(
    path: impl AsRef<Path>,
) -> Result<Vec<(String, SourceConfig)>, Box<dyn Error>> {
    let text = tokio::fs::read_to_string(path.as_ref()).await?;
    let sources = parse_sources(&text)?;
    info!(count = sources.len(), "Loaded source configuration");
    Ok(sources)
}

/// Parse the YAML source mapping.
///
/// Goes through `serde_yaml::Mapping` rather than a `HashMap` so that the
/// entries come back in the order they were written.
pub fn parse_sources(text: &str) -> Result<Vec<(String, SourceConfig)>, Box<dyn Error>> {
    let mapping: serde_yaml::Mapping = serde_yaml::from_str(text)?;
    let mut sources = Vec::with_capacity(mapping.len());

    for (key, value) in mapping {
        let name = key
            .as_str()
            .ok_or_else(|| format!("source name must be a string, got: {key:?}"))?
            .to_string();
        let config: SourceConfig = serde_yaml::from_value(value)
            .map_err(|e| format!("source {name}: {e}"))?;
        debug!(source = %name, kind = %config.kind, status = ?config.status, "Parsed source entry");
        sources.push((name, config));
    }

    Ok(sources)
}
