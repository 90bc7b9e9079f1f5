//! Syndication feed fetcher.
//!
//! Retrieves an RSS or Atom feed and maps each entry to a [`NewsItem`].
//! Parsing is two-tiered: `feed-rs` handles well-formed feeds, and a lenient
//! `quick-xml` scan recovers `<item>`/`<entry>` blocks from malformed-but-
//! usable XML. Recovered entries are returned with a warning so the manager
//! reports the source as `partial_warning` instead of `success`.

use crate::error::FetchError;
use crate::fetchers::{plain_client, LimitFetch};
use crate::models::{FetchBatch, NewsItem};
use futures::future::BoxFuture;
use futures::FutureExt;
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, info, instrument, warn};

/// Fetches one syndication feed as a limit-based source.
#[derive(Debug)]
pub struct FeedFetcher {
    source_name: String,
    url: String,
    client: reqwest::Client,
}

impl FeedFetcher {
    pub fn new(source_name: &str, url: &str) -> Result<Self, FetchError> {
        if url.is_empty() {
            return Err(FetchError::MissingConfig {
                source_name: source_name.to_string(),
                key: "url".to_string(),
            });
        }
        Ok(Self {
            source_name: source_name.to_string(),
            url: url.to_string(),
            client: plain_client()?,
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

        let body = response.bytes().await.map_err(|e| FetchError::Transport {
            url: self.url.clone(),
            source: e,
        })?;

        let (entries, warning) = parse_feed(&body, &self.source_name, &self.url)?;
        let items: Vec<NewsItem> = entries
            .into_iter()
            .take(max_items)
            .filter(NewsItem::is_valid)
            .collect();

        info!(count = items.len(), recovered = warning.is_some(), "Feed entries collected");
        match warning {
            Some(w) => Ok(FetchBatch::with_warning(items, w)),
            None => Ok(FetchBatch::new(items)),
        }
    }
}

impl LimitFetch for FeedFetcher {
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

/// Parse a feed body into entries, falling back to lenient recovery.
///
/// Returns the mapped entries and, when the lenient path was used, a warning
/// describing what happened. A feed with zero entries is a structural
/// failure: the site answered, but its feed changed or emptied out.
fn parse_feed(
    body: &[u8],
    source_name: &str,
    url: &str,
) -> Result<(Vec<NewsItem>, Option<String>), FetchError> {
    match feed_rs::parser::parse(body) {
        Ok(feed) => {
            if feed.entries.is_empty() {
                return Err(FetchError::Structure(format!(
                    "feed has no entries: {url}"
                )));
            }
            let items = feed
                .entries
                .into_iter()
                .map(|entry| NewsItem {
                    title: entry
                        .title
                        .map(|t| crate::utils::squash_ws(&t.content))
                        .unwrap_or_default(),
                    url: entry
                        .links
                        .first()
                        .map(|l| l.href.clone())
                        .unwrap_or_default(),
                    source: source_name.to_string(),
                    published: entry
                        .published
                        .or(entry.updated)
                        .map(|d| d.format("%Y-%m-%d %H:%M:%S").to_string()),
                    keyword: None,
                    description: entry.summary.map(|s| crate::utils::squash_ws(&s.content)),
                })
                .collect();
            Ok((items, None))
        }
        Err(parse_err) => {
            warn!(error = %parse_err, "Strict feed parse failed; attempting lenient recovery");
            let recovered = lenient_scan(body, source_name);
            if recovered.is_empty() {
                return Err(FetchError::FeedParse {
                    url: url.to_string(),
                    reason: parse_err.to_string(),
                });
            }
            let warning = format!(
                "feed XML malformed ({parse_err}); recovered {} entries",
                recovered.len()
            );
            Ok((recovered, Some(warning)))
        }
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    None,
    Title,
    Link,
}

/// Scan malformed XML for `<item>`/`<entry>` blocks with a title and a link.
///
/// Stops at the first unreadable byte and returns whatever was recovered up
/// to that point.
fn lenient_scan(body: &[u8], source_name: &str) -> Vec<NewsItem> {
    let text = String::from_utf8_lossy(body);
    let mut reader = Reader::from_str(&text);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut in_entry = false;
    let mut field = Field::None;
    let mut title = String::new();
    let mut link = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    in_entry = true;
                    title.clear();
                    link.clear();
                    field = Field::None;
                }
                b"title" if in_entry => field = Field::Title,
                b"link" if in_entry => {
                    field = Field::Link;
                    if let Ok(Some(href)) = e.try_get_attribute("href") {
                        link = String::from_utf8_lossy(&href.value).into_owned();
                    }
                }
                _ => field = Field::None,
            },
            Ok(Event::Empty(e)) => {
                // Atom-style <link href="..."/>
                if in_entry && e.local_name().as_ref() == b"link" {
                    if let Ok(Some(href)) = e.try_get_attribute("href") {
                        link = String::from_utf8_lossy(&href.value).into_owned();
                    }
                }
            }
            Ok(Event::Text(t)) => {
                let chunk = t
                    .unescape()
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(t.as_ref()).into_owned());
                match field {
                    Field::Title => title.push_str(&chunk),
                    Field::Link if link.is_empty() => link = chunk.trim().to_string(),
                    _ => {}
                }
            }
            Ok(Event::CData(t)) => {
                let chunk = String::from_utf8_lossy(t.as_ref()).into_owned();
                match field {
                    Field::Title => title.push_str(&chunk),
                    Field::Link if link.is_empty() => link = chunk.trim().to_string(),
                    _ => {}
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"item" | b"entry" => {
                    if !title.is_empty() && !link.is_empty() {
                        items.push(NewsItem {
                            title: crate::utils::squash_ws(&title),
                            url: link.clone(),
                            source: source_name.to_string(),
                            published: None,
                            keyword: None,
                            description: None,
                        });
                    }
                    in_entry = false;
                    field = Field::None;
                }
                _ => field = Field::None,
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(error = %e, recovered = items.len(), "Lenient scan stopped");
                break;
            }
            Ok(_) => {}
        }
    }

    items
}
