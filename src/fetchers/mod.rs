//! Source fetchers and the capability contract they implement.
//!
//! Every source exposes exactly one of two call shapes:
//!
//! 1. **Limit-based** ([`LimitFetch`]): feed and markup sources enumerate a
//!    fixed listing and are simply capped at `max_items`.
//! 2. **Keyword-based** ([`KeywordFetch`]): search providers have no natural
//!    listing and are queried once per configured keyword.
//!
//! The [`Fetcher`] enum makes the split explicit at the type level; invoking
//! the wrong shape yields [`FetchError::UnsupportedOperation`] so the manager
//! can treat all fetchers uniformly.
//!
//! # Supported sources
//!
//! | Type tag | Variant | Method |
//! |----------|---------|--------|
//! | `feed` | [`feed::FeedFetcher`] | RSS/Atom syndication |
//! | `markup` | [`markup::MarkupFetcher`] | CSS-selector HTML scraping |
//! | `keyword-search-naver` | [`naver::NaverApiFetcher`] | Naver Open API (authenticated) |
//! | `keyword-search-google` | [`google::GoogleNewsFetcher`] | Google News results page |

pub mod feed;
pub mod google;
pub mod markup;
pub mod naver;

use crate::error::FetchError;
use crate::models::FetchBatch;
use futures::future::BoxFuture;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use std::time::Duration;

/// Per-request network timeout shared by all fetchers.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Courtesy pause between successive keyword requests to the same provider.
/// Part of the contract with the search sites, not an optimization; the
/// async sleep never blocks other sources.
pub(crate) const KEYWORD_PAUSE: Duration = Duration::from_secs(1);

/// A fetcher that enumerates a fixed listing, capped at `max_items`.
pub trait LimitFetch: Send + Sync {
    fn source_name(&self) -> &str;
    /// Endpoint shown in diagnostics and the failure log.
    fn endpoint(&self) -> &str;
    fn fetch_by_limit(&self, max_items: usize) -> BoxFuture<'_, Result<FetchBatch, FetchError>>;
}

/// A fetcher that queries a search provider once per keyword.
pub trait KeywordFetch: Send + Sync {
    fn source_name(&self) -> &str;
    fn endpoint(&self) -> &str;
    /// The keyword list this source was configured with.
    fn keywords(&self) -> &[String];
    fn fetch_by_keywords<'a>(
        &'a self,
        keywords: &'a [String],
        max_per_keyword: usize,
    ) -> BoxFuture<'a, Result<FetchBatch, FetchError>>;
}

/// A constructed source fetcher, tagged with its call shape.
pub enum Fetcher {
    Limit(Box<dyn LimitFetch>),
    Keyword(Box<dyn KeywordFetch>),
}

impl Fetcher {
    pub fn source_name(&self) -> &str {
        match self {
            Fetcher::Limit(f) => f.source_name(),
            Fetcher::Keyword(f) => f.source_name(),
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            Fetcher::Limit(f) => f.endpoint(),
            Fetcher::Keyword(f) => f.endpoint(),
        }
    }

    pub async fn fetch_by_limit(&self, max_items: usize) -> Result<FetchBatch, FetchError> {
        match self {
            Fetcher::Limit(f) => f.fetch_by_limit(max_items).await,
            Fetcher::Keyword(f) => Err(FetchError::UnsupportedOperation {
                source_name: f.source_name().to_string(),
                operation: "fetch_by_limit",
            }),
        }
    }

    pub async fn fetch_by_keywords(
        &self,
        keywords: &[String],
        max_per_keyword: usize,
    ) -> Result<FetchBatch, FetchError> {
        match self {
            Fetcher::Keyword(f) => f.fetch_by_keywords(keywords, max_per_keyword).await,
            Fetcher::Limit(f) => Err(FetchError::UnsupportedOperation {
                source_name: f.source_name().to_string(),
                operation: "fetch_by_keywords",
            }),
        }
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let shape = match self {
            Fetcher::Limit(_) => "Limit",
            Fetcher::Keyword(_) => "Keyword",
        };
        f.debug_struct("Fetcher")
            .field("shape", &shape)
            .field("source", &self.source_name())
            .finish()
    }
}

/// Build an HTTP client with the shared request timeout.
pub(crate) fn plain_client() -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(FetchError::Client)
}

/// Build an HTTP client that identifies itself as a desktop browser.
///
/// Scraping fetchers use this to get past naive bot-blocking on public
/// pages.
pub(crate) fn browser_client() -> Result<reqwest::Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        USER_AGENT,
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
             (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        ),
    );
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("ko-KR,ko;q=0.9,en-US;q=0.8,en;q=0.7"),
    );

    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .default_headers(headers)
        .build()
        .map_err(FetchError::Client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsItem;
    use futures::FutureExt;

    struct StubLimit;

    impl LimitFetch for StubLimit {
        fn source_name(&self) -> &str {
            "stub-limit"
        }
        fn endpoint(&self) -> &str {
            "https://example.com/listing"
        }
        fn fetch_by_limit(
            &self,
            max_items: usize,
        ) -> BoxFuture<'_, Result<FetchBatch, FetchError>> {
            async move {
                let items = (0..max_items.min(2))
                    .map(|i| NewsItem {
                        title: format!("item {i}"),
                        url: format!("https://example.com/{i}"),
                        source: "stub-limit".to_string(),
                        published: None,
                        keyword: None,
                        description: None,
                    })
                    .collect();
                Ok(FetchBatch::new(items))
            }
            .boxed()
        }
    }

    struct StubKeyword;

    impl KeywordFetch for StubKeyword {
        fn source_name(&self) -> &str {
            "stub-keyword"
        }
        fn endpoint(&self) -> &str {
            ""
        }
        fn keywords(&self) -> &[String] {
            &[]
        }
        fn fetch_by_keywords<'a>(
            &'a self,
            _keywords: &'a [String],
            _max_per_keyword: usize,
        ) -> BoxFuture<'a, Result<FetchBatch, FetchError>> {
            async { Ok(FetchBatch::default()) }.boxed()
        }
    }

    #[tokio::test]
    async fn test_limit_fetcher_rejects_keyword_shape() {
        let fetcher = Fetcher::Limit(Box::new(StubLimit));
        let err = fetcher
            .fetch_by_keywords(&["h2".to_string()], 3)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedOperation { .. }));
        assert!(err.to_string().contains("fetch_by_keywords"));
    }

    #[tokio::test]
    async fn test_keyword_fetcher_rejects_limit_shape() {
        let fetcher = Fetcher::Keyword(Box::new(StubKeyword));
        let err = fetcher.fetch_by_limit(5).await.unwrap_err();
        assert!(matches!(err, FetchError::UnsupportedOperation { .. }));
        assert!(err.to_string().contains("fetch_by_limit"));
    }

    #[tokio::test]
    async fn test_matching_shape_goes_through() {
        let fetcher = Fetcher::Limit(Box::new(StubLimit));
        let batch = fetcher.fetch_by_limit(5).await.unwrap();
        assert_eq!(batch.items.len(), 2);
        assert_eq!(fetcher.source_name(), "stub-limit");
    }
}
