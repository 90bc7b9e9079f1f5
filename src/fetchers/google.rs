//! Google News results-page fetcher (unauthenticated keyword provider).
//!
//! Same keyword-loop shape as the Naver API fetcher, but scrapes the public
//! news search results page instead of calling an API. Google reshuffles its
//! markup periodically, so block extraction tries a layered set of selectors
//! before giving up. A keyword with zero matches is simply empty, never an
//! error.

use crate::error::FetchError;
use crate::fetchers::{browser_client, KeywordFetch, KEYWORD_PAUSE};
use crate::models::{FetchBatch, NewsItem};
use crate::utils::squash_ws;
use futures::future::BoxFuture;
use futures::FutureExt;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

const DEFAULT_SEARCH_URL: &str = "https://www.google.com/search";

/// Searches the Google News tab by scraping its results page.
pub struct GoogleNewsFetcher {
    source_name: String,
    base_url: String,
    keywords: Vec<String>,
    client: reqwest::Client,
}

impl GoogleNewsFetcher {
    pub fn new(source_name: &str, url: &str, keywords: Vec<String>) -> Result<Self, FetchError> {
        Ok(Self {
            source_name: source_name.to_string(),
            base_url: if url.is_empty() {
                DEFAULT_SEARCH_URL.to_string()
            } else {
                url.to_string()
            },
            keywords,
            client: browser_client()?,
        })
    }

    #[instrument(level = "info", skip_all, fields(source = %self.source_name))]
    async fn search(
        &self,
        keywords: &[String],
        max_per_keyword: usize,
    ) -> Result<FetchBatch, FetchError> {
        let mut all_items = Vec::new();
        let mut failures: Vec<String> = Vec::new();

        for (i, keyword) in keywords.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(KEYWORD_PAUSE).await;
            }
            info!(%keyword, "Google news search");

            let url = format!(
                "{}?q={}&tbm=nws&hl=ko&gl=kr&num={}",
                self.base_url,
                urlencoding::encode(keyword),
                max_per_keyword
            );

            let response = match self.client.get(&url).send().await {
                Ok(r) => r,
                Err(e) => {
                    warn!(%keyword, error = %e, "Google request failed; continuing with next keyword");
                    failures.push(format!("'{keyword}': {e}"));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                warn!(%keyword, %status, "Google returned an error page");
                failures.push(format!("'{keyword}': HTTP {status}"));
                continue;
            }

            let body = match response.text().await {
                Ok(b) => b,
                Err(e) => {
                    warn!(%keyword, error = %e, "Failed reading Google response body");
                    failures.push(format!("'{keyword}': {e}"));
                    continue;
                }
            };

            let items = extract_results(&body, &self.source_name, keyword, max_per_keyword);
            if items.is_empty() {
                // No matches for a keyword is an empty result, not a failure.
                debug!(%keyword, "No results for keyword");
            }
            all_items.extend(items);
        }

        info!(count = all_items.len(), failed_keywords = failures.len(), "Google search complete");
        if failures.is_empty() {
            Ok(FetchBatch::new(all_items))
        } else {
            Ok(FetchBatch::with_warning(all_items, failures.join("; ")))
        }
    }
}

impl KeywordFetch for GoogleNewsFetcher {
    fn source_name(&self) -> &str {
        &self.source_name
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }

    fn keywords(&self) -> &[String] {
        &self.keywords
    }

    fn fetch_by_keywords<'a>(
        &'a self,
        keywords: &'a [String],
        max_per_keyword: usize,
    ) -> BoxFuture<'a, Result<FetchBatch, FetchError>> {
        self.search(keywords, max_per_keyword).boxed()
    }
}

/// Extract validated items from one results page.
///
/// Selector fallbacks, newest markup first; all are static strings so the
/// parses cannot fail.
fn extract_results(
    body: &str,
    source_name: &str,
    keyword: &str,
    max_per_keyword: usize,
) -> Vec<NewsItem> {
    let document = Html::parse_document(body);

    let block_selectors = ["div.SoaBEf", "div[data-sokoban-container]", "div.g"];
    let title_selectors = [r#"div[role="heading"]"#, "h3", ".n0jPhd"];
    let link_selector = Selector::parse("a").unwrap();
    let date_selector = Selector::parse(".OSrXXb").unwrap();

    let blocks: Vec<_> = block_selectors
        .iter()
        .map(|s| Selector::parse(s).unwrap())
        .find_map(|sel| {
            let found: Vec<_> = document.select(&sel).collect();
            (!found.is_empty()).then_some(found)
        })
        .unwrap_or_default();

    let mut items = Vec::new();
    for block in blocks.into_iter().take(max_per_keyword) {
        let title = title_selectors.iter().find_map(|s| {
            let sel = Selector::parse(s).unwrap();
            block
                .select(&sel)
                .next()
                .map(|el| squash_ws(&el.text().collect::<Vec<_>>().join(" ")))
        });
        let Some(title) = title else { continue };

        let Some(href) = block
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };
        let url = clean_redirect_url(href);

        let published = block
            .select(&date_selector)
            .next()
            .map(|el| squash_ws(&el.text().collect::<Vec<_>>().join(" ")));

        let item = NewsItem {
            title,
            url,
            source: format!("{source_name}({keyword})"),
            published,
            keyword: Some(keyword.to_string()),
            description: None,
        };
        if item.is_valid() {
            items.push(item);
        }
    }

    items
}

/// Strip Google's `/url?q=<target>&...` redirect wrapper.
fn clean_redirect_url(href: &str) -> String {
    match href.strip_prefix("/url?q=") {
        Some(rest) => rest.split('&').next().unwrap_or(rest).to_string(),
        None => href.to_string(),
    }
}
