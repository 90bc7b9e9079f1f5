//! Builds fetcher instances from declarative source configuration.
//!
//! Dispatch goes through a registry mapping type tags to builder closures,
//! so new fetcher variants can be added with [`FetcherFactory::register`]
//! without touching the dispatch logic. An unknown tag is a loud
//! construction-time error: a misconfigured source is a setup bug, not a
//! runtime condition.

use crate::config::{SourceConfig, SourceStatus};
use crate::error::FetchError;
use crate::fetchers::feed::FeedFetcher;
use crate::fetchers::google::GoogleNewsFetcher;
use crate::fetchers::markup::MarkupFetcher;
use crate::fetchers::naver::NaverApiFetcher;
use crate::fetchers::Fetcher;
use crate::manager::FetchManager;
use std::collections::HashMap;
use tracing::{debug, error, info, instrument};

/// Builder closure registered for one type tag.
pub type BuildFn = Box<dyn Fn(&str, &SourceConfig) -> Result<Fetcher, FetchError> + Send + Sync>;

/// Registry-based fetcher factory.
pub struct FetcherFactory {
    builders: HashMap<String, BuildFn>,
}

impl FetcherFactory {
    /// A factory with the four built-in variants registered.
    pub fn new() -> Self {
        let mut factory = Self {
            builders: HashMap::new(),
        };

        factory.register(
            "feed",
            Box::new(|name, config| {
                Ok(Fetcher::Limit(Box::new(FeedFetcher::new(
                    name,
                    &config.url,
                )?)))
            }),
        );

        factory.register(
            "markup",
            Box::new(|name, config| {
                let article_selector =
                    require_extra(name, config, "article_selector")?;
                let title_selector = require_extra(name, config, "title_selector")?;
                let link_selector = config
                    .extra_str("link_selector")
                    .unwrap_or_else(|| "a".to_string());
                Ok(Fetcher::Limit(Box::new(MarkupFetcher::new(
                    name,
                    &config.url,
                    &article_selector,
                    &title_selector,
                    &link_selector,
                    config.extra_str("date_selector"),
                )?)))
            }),
        );

        factory.register(
            "keyword-search-naver",
            Box::new(|name, config| {
                Ok(Fetcher::Keyword(Box::new(NaverApiFetcher::new(
                    name,
                    &config.url,
                    config.extra_str("client_id"),
                    config.extra_str("client_secret"),
                    config.extra_str_list("keywords"),
                )?)))
            }),
        );

        factory.register(
            "keyword-search-google",
            Box::new(|name, config| {
                Ok(Fetcher::Keyword(Box::new(GoogleNewsFetcher::new(
                    name,
                    &config.url,
                    config.extra_str_list("keywords"),
                )?)))
            }),
        );

        factory
    }

    /// Register (or replace) a builder for a type tag.
    pub fn register(&mut self, tag: &str, build: BuildFn) {
        debug!(%tag, "Registered fetcher type");
        self.builders.insert(tag.to_string(), build);
    }

    /// Construct a fetcher for one configuration entry.
    pub fn create(&self, name: &str, config: &SourceConfig) -> Result<Fetcher, FetchError> {
        let build = self
            .builders
            .get(&config.kind)
            .ok_or_else(|| FetchError::UnsupportedSourceType(config.kind.clone()))?;
        build(name, config)
    }

    /// Build a manager holding a fetcher for every `active` entry.
    ///
    /// Entries whose construction fails are logged and skipped; the rest of
    /// the configuration is unaffected.
    #[instrument(level = "info", skip_all)]
    pub fn manager_from_config(&self, sources: &[(String, SourceConfig)]) -> FetchManager {
        let mut manager = FetchManager::new();

        for (name, config) in sources {
            if config.status != SourceStatus::Active {
                debug!(source = %name, status = ?config.status, "Skipping non-active source");
                continue;
            }
            match self.create(name, config) {
                Ok(fetcher) => {
                    info!(source = %name, kind = %config.kind, "Fetcher ready");
                    manager.add_fetcher(fetcher);
                }
                Err(e) => {
                    error!(source = %name, error = %e, "Fetcher construction failed; skipping source");
                }
            }
        }

        info!(count = manager.len(), "Fetchers registered");
        manager
    }
}

impl Default for FetcherFactory {
    fn default() -> Self {
        Self::new()
    }
}

fn require_extra(name: &str, config: &SourceConfig, key: &str) -> Result<String, FetchError> {
    config
        .extra_str(key)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| FetchError::MissingConfig {
            source_name: name.to_string(),
            key: key.to_string(),
        })
}
