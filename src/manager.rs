//! Fetch orchestration across all registered sources.
//!
//! [`FetchManager::fetch_all`] is the single error boundary of the pipeline:
//! nothing raised inside a fetcher call propagates past it. Each source is
//! invoked through its call shape, failures become `failed` outcomes (and
//! failure-log lines), and the survivors' items are concatenated in
//! registration order and deduplicated by URL, first occurrence wins.

use crate::fetchers::Fetcher;
use crate::models::{FetchOutcome, NewsItem};
use chrono::Local;
use itertools::Itertools;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, instrument, warn};

/// Append-only failure log: one line per failed source, for operational
/// diagnosis only. Write errors are swallowed; losing a log line must not
/// fail a run that already has results.
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn record(&self, source: &str, endpoint: &str, detail: &str) {
        if let Some(parent) = self.path.parent() {
            let _ = tokio::fs::create_dir_all(parent).await;
        }
        let file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await;
        match file {
            Ok(mut file) => {
                let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
                let line = format!("[{timestamp}] {source}|{endpoint}|{detail}\n");
                if let Err(e) = file.write_all(line.as_bytes()).await {
                    warn!(path = %self.path.display(), error = %e, "Could not write failure log");
                }
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Could not write failure log");
            }
        }
    }
}

/// Everything one full run produces: deduplicated items plus a per-source
/// outcome record for observability.
#[derive(Debug)]
pub struct FetchReport {
    pub items: Vec<NewsItem>,
    pub outcomes: Vec<FetchOutcome>,
}

/// Holds the constructed fetchers and drives the fetch-all operation.
pub struct FetchManager {
    fetchers: Vec<Fetcher>,
    failure_log: Option<FailureLog>,
}

impl FetchManager {
    pub fn new() -> Self {
        Self {
            fetchers: Vec::new(),
            failure_log: None,
        }
    }

    pub fn with_failure_log(mut self, log: FailureLog) -> Self {
        self.failure_log = Some(log);
        self
    }

    pub fn add_fetcher(&mut self, fetcher: Fetcher) {
        self.fetchers.push(fetcher);
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }

    /// Fetch from every registered source.
    ///
    /// Infallible on purpose: the caller only ever observes a (possibly
    /// empty) item collection and the outcome list, never an error from a
    /// source-level fault.
    #[instrument(level = "info", skip_all, fields(sources = self.fetchers.len()))]
    pub async fn fetch_all(&self, max_per_source: usize, max_per_keyword: usize) -> FetchReport {
        let mut collected: Vec<NewsItem> = Vec::new();
        let mut outcomes: Vec<FetchOutcome> = Vec::new();

        for fetcher in &self.fetchers {
            let name = fetcher.source_name().to_string();

            let result = match fetcher {
                Fetcher::Limit(_) => fetcher.fetch_by_limit(max_per_source).await,
                Fetcher::Keyword(kw) => {
                    fetcher
                        .fetch_by_keywords(kw.keywords(), max_per_keyword)
                        .await
                }
            };

            match result {
                Ok(batch) => {
                    let count = batch.items.len();
                    match batch.warning {
                        Some(detail) => {
                            warn!(source = %name, count, %detail, "Source completed with warnings");
                            outcomes.push(FetchOutcome::warning(name.as_str(), count, detail));
                        }
                        None => {
                            info!(source = %name, count, "Source fetch complete");
                            outcomes.push(FetchOutcome::success(name.as_str(), count));
                        }
                    }
                    collected.extend(batch.items);
                }
                Err(e) => {
                    // Source isolation: one broken source never aborts the run.
                    error!(source = %name, error = %e, "Source fetch failed; continuing with remaining sources");
                    if let Some(log) = &self.failure_log {
                        log.record(&name, fetcher.endpoint(), &e.to_string()).await;
                    }
                    outcomes.push(FetchOutcome::failed(name.as_str(), e.to_string()));
                }
            }
        }

        let total = collected.len();
        let items: Vec<NewsItem> = collected
            .into_iter()
            .unique_by(|item| item.url.clone())
            .collect();
        info!(
            total,
            unique = items.len(),
            duplicates = total - items.len(),
            "Collection complete"
        );

        FetchReport { items, outcomes }
    }
}

impl Default for FetchManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_sources;
    use crate::error::FetchError;
    use crate::factory::FetcherFactory;
    use crate::fetchers::{KeywordFetch, LimitFetch};
    use crate::models::{FetchBatch, OutcomeStatus};
    use crate::utils::test_http::{serve, Route};
    use futures::future::BoxFuture;
    use futures::FutureExt;

    fn item(title: &str, url: &str, source: &str) -> NewsItem {
        NewsItem {
            title: title.to_string(),
            url: url.to_string(),
            source: source.to_string(),
            published: None,
            keyword: None,
            description: None,
        }
    }

    /// Limit-shaped stub: `None` items means the fetch fails.
    struct StubLimit {
        name: String,
        items: Option<Vec<NewsItem>>,
    }

    impl LimitFetch for StubLimit {
        fn source_name(&self) -> &str {
            &self.name
        }
        fn endpoint(&self) -> &str {
            "https://stub.example.com/"
        }
        fn fetch_by_limit(
            &self,
            max_items: usize,
        ) -> BoxFuture<'_, Result<FetchBatch, FetchError>> {
            async move {
                match &self.items {
                    Some(items) => Ok(FetchBatch::new(
                        items.iter().take(max_items).cloned().collect(),
                    )),
                    None => Err(FetchError::Structure(format!(
                        "{} listing went missing",
                        self.name
                    ))),
                }
            }
            .boxed()
        }
    }

    fn ok_fetcher(name: &str, items: Vec<NewsItem>) -> Fetcher {
        Fetcher::Limit(Box::new(StubLimit {
            name: name.to_string(),
            items: Some(items),
        }))
    }

    fn failing_fetcher(name: &str) -> Fetcher {
        Fetcher::Limit(Box::new(StubLimit {
            name: name.to_string(),
            items: None,
        }))
    }

    struct StubKeyword {
        name: String,
        keywords: Vec<String>,
    }

    impl KeywordFetch for StubKeyword {
        fn source_name(&self) -> &str {
            &self.name
        }
        fn endpoint(&self) -> &str {
            ""
        }
        fn keywords(&self) -> &[String] {
            &self.keywords
        }
        fn fetch_by_keywords<'a>(
            &'a self,
            keywords: &'a [String],
            max_per_keyword: usize,
        ) -> BoxFuture<'a, Result<FetchBatch, FetchError>> {
            async move {
                let items = keywords
                    .iter()
                    .flat_map(|kw| {
                        (0..max_per_keyword.min(1)).map(move |_| NewsItem {
                            title: format!("hit for {kw}"),
                            url: format!("https://search.example.com/{kw}"),
                            source: format!("{}({kw})", self.name),
                            published: None,
                            keyword: Some(kw.clone()),
                            description: None,
                        })
                    })
                    .collect();
                Ok(FetchBatch::new(items))
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_source_isolation() {
        let mut manager = FetchManager::new();
        manager.add_fetcher(ok_fetcher(
            "first",
            vec![item("a", "https://x/1", "first")],
        ));
        manager.add_fetcher(failing_fetcher("second"));
        manager.add_fetcher(ok_fetcher(
            "third",
            vec![item("c", "https://x/3", "third")],
        ));

        let report = manager.fetch_all(10, 3).await;

        assert_eq!(report.items.len(), 2);
        assert_eq!(report.outcomes.len(), 3);
        let failed: Vec<_> = report
            .outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].source, "second");
        assert!(failed[0].detail.as_deref().unwrap().contains("listing went missing"));
    }

    #[tokio::test]
    async fn test_dedup_keeps_first_occurrence() {
        let mut manager = FetchManager::new();
        manager.add_fetcher(ok_fetcher(
            "first",
            vec![item("original headline", "https://x/same", "first")],
        ));
        manager.add_fetcher(ok_fetcher(
            "second",
            vec![
                item("rewritten headline", "https://x/same", "second"),
                item("fresh story", "https://x/other", "second"),
            ],
        ));

        let report = manager.fetch_all(10, 3).await;

        assert_eq!(report.items.len(), 2);
        assert_eq!(report.items[0].title, "original headline");
        assert_eq!(report.items[0].source, "first");
        // Outcomes count contributions before deduplication.
        assert_eq!(report.outcomes[1].item_count, 2);
    }

    #[tokio::test]
    async fn test_keyword_fetchers_run_with_their_configured_keywords() {
        let mut manager = FetchManager::new();
        manager.add_fetcher(Fetcher::Keyword(Box::new(StubKeyword {
            name: "search".to_string(),
            keywords: vec!["수소".to_string(), "암모니아".to_string()],
        })));

        let report = manager.fetch_all(10, 3).await;

        assert_eq!(report.items.len(), 2);
        let kws: Vec<_> = report
            .items
            .iter()
            .map(|i| i.keyword.as_deref().unwrap())
            .collect();
        assert_eq!(kws, vec!["수소", "암모니아"]);
    }

    #[tokio::test]
    async fn test_per_source_limit_is_enforced() {
        let many: Vec<NewsItem> = (0..20)
            .map(|i| item(&format!("t{i}"), &format!("https://x/{i}"), "big"))
            .collect();
        let mut manager = FetchManager::new();
        manager.add_fetcher(ok_fetcher("big", many));

        let report = manager.fetch_all(5, 3).await;
        assert_eq!(report.items.len(), 5);
    }

    #[tokio::test]
    async fn test_empty_manager_yields_empty_report() {
        let manager = FetchManager::new();
        let report = manager.fetch_all(5, 3).await;
        assert!(report.items.is_empty());
        assert!(report.outcomes.is_empty());
    }

    #[tokio::test]
    async fn test_failure_log_gets_one_line_per_failure() {
        let dir = std::env::temp_dir().join("h2_news_faillog_test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("failed_sources.log");

        let mut manager =
            FetchManager::new().with_failure_log(FailureLog::new(&path));
        manager.add_fetcher(failing_fetcher("broken"));
        manager.add_fetcher(ok_fetcher("fine", vec![item("a", "https://x/1", "fine")]));

        manager.fetch_all(5, 3).await;

        let log = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = log.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("broken|https://stub.example.com/|"));
        let _ = std::fs::remove_dir_all(&dir);
    }

    /// Full path from configuration to report: one feed source with five
    /// entries (one invalid), one markup source with two blocks (one a
    /// duplicate of a feed URL).
    #[tokio::test]
    async fn test_end_to_end_feed_and_markup() {
        let rss = r#"<?xml version="1.0"?><rss version="2.0"><channel>
          <item><title>Story one</title><link>https://h2news.kr/a/1</link></item>
          <item><title></title><link>https://h2news.kr/a/2</link></item>
          <item><title>Story three</title><link>https://h2news.kr/a/3</link></item>
          <item><title>Story four</title><link>https://h2news.kr/a/4</link></item>
          <item><title>Story five</title><link>https://h2news.kr/a/5</link></item>
        </channel></rss>"#;
        let page = r#"<html><body>
          <article><h2>Duplicate of story one</h2><a href="https://h2news.kr/a/1">x</a></article>
          <article><h2>Only here</h2><a href="https://h2view.example.com/only-here">x</a></article>
        </body></html>"#;

        let base = serve(vec![
            Route::new("/rss", 200, rss),
            Route::new("/page", 200, page),
        ])
        .await;

        let yaml = format!(
            r#"
Feed Source:
  type: feed
  url: {base}/rss
  status: active
Markup Source:
  type: markup
  url: {base}/page
  status: active
  extra:
    article_selector: article
    title_selector: h2
"#
        );
        let sources = parse_sources(&yaml).unwrap();
        let manager = FetcherFactory::new().manager_from_config(&sources);
        assert_eq!(manager.len(), 2);

        let report = manager.fetch_all(10, 3).await;

        // 4 valid feed entries + 1 unique markup entry.
        assert_eq!(report.items.len(), 5);
        assert_eq!(report.outcomes.len(), 2);
        assert!(report
            .outcomes
            .iter()
            .all(|o| o.status == OutcomeStatus::Success));
        // First occurrence of the duplicated URL came from the feed.
        let dup = report
            .items
            .iter()
            .find(|i| i.url == "https://h2news.kr/a/1")
            .unwrap();
        assert_eq!(dup.source, "Feed Source");
    }
}
