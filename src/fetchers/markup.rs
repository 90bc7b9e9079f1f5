//! Selector-based HTML page fetcher.
//!
//! For sites with no feed, a page is retrieved with browser-identifying
//! headers and mined with three CSS selectors: `article_selector` picks the
//! repeating content blocks, `title_selector` and `link_selector` locate the
//! headline and anchor within each block. Relative hrefs are resolved
//! against the page's own URL.
//!
//! Zero matching blocks is reported as a structural failure, not a transport
//! one, so operators know to update selectors rather than retry.

use crate::error::FetchError;
use crate::fetchers::{browser_client, LimitFetch};
use crate::models::{FetchBatch, NewsItem};
use crate::utils::squash_ws;
use futures::future::BoxFuture;
use futures::FutureExt;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument};
use url::Url;

/// Fetches one HTML listing page as a limit-based source.
#[derive(Debug)]
pub struct MarkupFetcher {
    source_name: String,
    url: String,
    base_url: Url,
    article_selector: String,
    title_selector: String,
    link_selector: String,
    date_selector: Option<String>,
    client: reqwest::Client,
}

impl MarkupFetcher {
    /// Build a markup fetcher, validating the page URL and every selector.
    ///
    /// Selector strings are parsed here so a typo in the configuration
    /// surfaces at construction time, not mid-run.
    pub fn new(
        source_name: &str,
        url: &str,
        article_selector: &str,
        title_selector: &str,
        link_selector: &str,
        date_selector: Option<String>,
    ) -> Result<Self, FetchError> {
        if url.is_empty() {
            return Err(FetchError::MissingConfig {
                source_name: source_name.to_string(),
                key: "url".to_string(),
            });
        }
        let base_url = Url::parse(url)
            .map_err(|_| FetchError::Structure(format!("invalid page URL: {url}")))?;

        check_selector(article_selector)?;
        check_selector(title_selector)?;
        check_selector(link_selector)?;
        if let Some(ref sel) = date_selector {
            check_selector(sel)?;
        }

        Ok(Self {
            source_name: source_name.to_string(),
            url: url.to_string(),
            base_url,
            article_selector: article_selector.to_string(),
            title_selector: title_selector.to_string(),
            link_selector: link_selector.to_string(),
            date_selector,
            client: browser_client()?,
        })
    }

    #[instrument(level = "info", skip_all, fields(source = %self.source_name, url = %self.url))]
    async fn fetch(&self, max_items: usize) -> Result<FetchBatch, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Transport {
                url: self.url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.url.clone(),
                status,
            });
        }

        let body = response.text().await.map_err(|e| FetchError::Transport {
            url: self.url.clone(),
            source: e,
        })?;

        let items = self.extract(&body, max_items)?;
        info!(count = items.len(), "Markup blocks extracted");
        Ok(FetchBatch::new(items))
    }

    /// Pull items out of a fetched page.
    ///
    /// Synchronous on purpose: `scraper::Html` is not `Send`, so the parsed
    /// document must never live across an await point.
    fn extract(&self, body: &str, max_items: usize) -> Result<Vec<NewsItem>, FetchError> {
        let document = Html::parse_document(body);
        let article_sel = parse_selector(&self.article_selector)?;
        let title_sel = parse_selector(&self.title_selector)?;
        let link_sel = parse_selector(&self.link_selector)?;
        let date_sel = self
            .date_selector
            .as_deref()
            .map(parse_selector)
            .transpose()?;

        let blocks: Vec<_> = document.select(&article_sel).collect();
        if blocks.is_empty() {
            return Err(FetchError::Structure(format!(
                "selector `{}` matched no content blocks on {} (site structure likely changed)",
                self.article_selector, self.url
            )));
        }

        let mut items = Vec::new();
        for block in blocks.into_iter().take(max_items) {
            // A block missing its title or link is skipped, not fatal.
            let Some(title_el) = block.select(&title_sel).next() else {
                debug!("Block has no title element; skipping");
                continue;
            };
            let title = squash_ws(&title_el.text().collect::<Vec<_>>().join(" "));

            let Some(href) = block
                .select(&link_sel)
                .next()
                .and_then(|a| a.value().attr("href"))
            else {
                debug!("Block has no link element; skipping");
                continue;
            };
            let Ok(resolved) = self.base_url.join(href) else {
                debug!(%href, "Unresolvable href; skipping");
                continue;
            };

            let published = date_sel.as_ref().and_then(|sel| {
                block
                    .select(sel)
                    .next()
                    .map(|el| squash_ws(&el.text().collect::<Vec<_>>().join(" ")))
            });

            let item = NewsItem {
                title,
                url: resolved.to_string(),
                source: self.source_name.clone(),
                published,
                keyword: None,
                description: None,
            };
            if item.is_valid() {
                items.push(item);
            }
        }

        Ok(items)
    }
}

impl LimitFetch for MarkupFetcher {
    fn source_name(&self) -> &str {
        &self.source_name
    }

    fn endpoint(&self) -> &str {
        &self.url
    }

    fn fetch_by_limit(&self, max_items: usize) -> BoxFuture<'_, Result<FetchBatch, FetchError>> {
        self.fetch(max_items).boxed()
    }
}

fn check_selector(selector: &str) -> Result<(), FetchError> {
    parse_selector(selector).map(|_| ())
}

fn parse_selector(selector: &str) -> Result<Selector, FetchError> {
    Selector::parse(selector).map_err(|_| FetchError::Selector(selector.to_string()))
}
