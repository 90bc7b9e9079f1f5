//! Naver Open API news search fetcher (authenticated keyword provider).
//!
//! Queries `https://openapi.naver.com/v1/search/news.json` once per keyword
//! with the client id/secret headers Naver requires. Missing credentials are
//! a configuration problem surfaced at construction time — logged, not
//! raised — and every subsequent call short-circuits to an empty batch with
//! an explicit reason.
//!
//! Per-keyword failures (including 401/403/429 from the API) are logged with
//! their specific cause and never stop the remaining keywords.

use crate::error::FetchError;
use crate::fetchers::{plain_client, KeywordFetch, KEYWORD_PAUSE};
use crate::models::{FetchBatch, NewsItem};
use futures::future::BoxFuture;
use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, error, info, instrument, warn};

const DEFAULT_API_URL: &str = "https://openapi.naver.com/v1/search/news.json";

// Naver wraps query matches in <b> tags inside titles and descriptions.
static BOLD_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?b>").unwrap());

/// Searches Naver news through the authenticated Open API.
pub struct NaverApiFetcher {
    source_name: String,
    api_url: String,
    client_id: Option<String>,
    client_secret: Option<String>,
    keywords: Vec<String>,
    client: reqwest::Client,
}

impl NaverApiFetcher {
    /// Build the fetcher. `url` overrides the fixed API endpoint when
    /// non-empty; credentials and the keyword list come from the source's
    /// `extra` map.
    pub fn new(
        source_name: &str,
        url: &str,
        client_id: Option<String>,
        client_secret: Option<String>,
        keywords: Vec<String>,
    ) -> Result<Self, FetchError> {
        let client_id = client_id.filter(|s| !s.is_empty());
        let client_secret = client_secret.filter(|s| !s.is_empty());
        if client_id.is_none() || client_secret.is_none() {
            warn!(
                source = source_name,
                "Naver API credentials missing; searches will return nothing \
                 (set extra.client_id and extra.client_secret)"
            );
        }

        Ok(Self {
            source_name: source_name.to_string(),
            api_url: if url.is_empty() {
                DEFAULT_API_URL.to_string()
            } else {
                url.to_string()
            },
            client_id,
            client_secret,
            keywords,
            client: plain_client()?,
        })
    }

    #[instrument(level = "info", skip_all, fields(source = %self.source_name))]
    async fn search(
        &self,
        keywords: &[String],
        max_per_keyword: usize,
    ) -> Result<FetchBatch, FetchError> {
        let (Some(client_id), Some(client_secret)) = (&self.client_id, &self.client_secret) else {
            return Ok(FetchBatch::with_warning(
                Vec::new(),
                "naver api credentials missing",
            ));
        };

        let mut all_items = Vec::new();
        let mut failures: Vec<String> = Vec::new();

        for (i, keyword) in keywords.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(KEYWORD_PAUSE).await;
            }
            info!(%keyword, "Naver search");

            let display = max_per_keyword.to_string();
            let response = self
                .client
                .get(&self.api_url)
                .header("X-Naver-Client-Id", client_id.as_str())
                .header("X-Naver-Client-Secret", client_secret.as_str())
                .query(&[
                    ("query", keyword.as_str()),
                    ("display", display.as_str()),
                    ("sort", "date"),
                ])
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    warn!(%keyword, error = %e, "Naver request failed; continuing with next keyword");
                    failures.push(format!("'{keyword}': {e}"));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let cause = match status.as_u16() {
                    401 => "invalid credentials (401)",
                    403 => "insufficient grant (403)",
                    429 => "quota exceeded (429)",
                    _ => "http error",
                };
                error!(%keyword, %status, cause, "Naver API rejected the request");
                failures.push(format!("'{keyword}': {cause}"));
                continue;
            }

            let body = match response.text().await {
                Ok(b) => b,
                Err(e) => {
                    warn!(%keyword, error = %e, "Failed reading Naver response body");
                    failures.push(format!("'{keyword}': {e}"));
                    continue;
                }
            };

            match parse_response(&body, &self.source_name, keyword, max_per_keyword) {
                Ok(items) => {
                    if items.is_empty() {
                        debug!(%keyword, "No results for keyword");
                    }
                    all_items.extend(items);
                }
                Err(e) => {
                    warn!(%keyword, error = %e, "Unparseable Naver response");
                    failures.push(format!("'{keyword}': bad response ({e})"));
                }
            }
        }

        info!(count = all_items.len(), failed_keywords = failures.len(), "Naver search complete");
        if failures.is_empty() {
            Ok(FetchBatch::new(all_items))
        } else {
            Ok(FetchBatch::with_warning(all_items, failures.join("; ")))
        }
    }
}

impl KeywordFetch for NaverApiFetcher {
    fn source_name(&self) -> &str {
        &self.source_name
    }

    fn endpoint(&self) -> &str {
        &self.api_url
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

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(rename = "pubDate", default)]
    pub_date: String,
    #[serde(default)]
    description: String,
}

/// Map one API response body to validated items tagged with the keyword.
fn parse_response(
    body: &str,
    source_name: &str,
    keyword: &str,
    max_per_keyword: usize,
) -> Result<Vec<NewsItem>, serde_json::Error> {
    let response: SearchResponse = serde_json::from_str(body)?;

    let items = response
        .items
        .into_iter()
        .take(max_per_keyword)
        .map(|hit| {
            let description = BOLD_TAG.replace_all(&hit.description, "").into_owned();
            NewsItem {
                title: BOLD_TAG.replace_all(&hit.title, "").into_owned(),
                url: hit.link,
                source: format!("{source_name}({keyword})"),
                published: normalize_pub_date(&hit.pub_date),
                keyword: Some(keyword.to_string()),
                description: (!description.is_empty()).then_some(description),
            }
        })
        .filter(NewsItem::is_valid)
        .collect();

    Ok(items)
}

/// Naver reports RFC-2822 dates; normalize when possible, pass through raw
/// otherwise.
fn normalize_pub_date(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    match chrono::DateTime::parse_from_rfc2822(raw) {
        Ok(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        Err(_) => Some(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_http::{serve, Route};

    const RESPONSE: &str = r#"{
      "total": 2, "start": 1, "display": 2,
      "items": [
        {"title": "<b>수소</b> 충전소 확대", "link": "https://n.news.naver.com/article/1",
         "pubDate": "Fri, 28 Aug 2026 10:30:00 +0900", "description": "<b>수소</b> 인프라 관련 기사"},
        {"title": "연료전지 발전소 준공", "link": "https://n.news.naver.com/article/2",
         "pubDate": "not a date", "description": ""}
      ]
    }"#;

    #[test]
    fn test_parse_response_strips_markup_and_tags_keyword() {
        let items = parse_response(RESPONSE, "NaverNews", "수소", 5).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "수소 충전소 확대");
        assert_eq!(items[0].source, "NaverNews(수소)");
        assert_eq!(items[0].keyword.as_deref(), Some("수소"));
        assert_eq!(items[0].published.as_deref(), Some("2026-08-28 10:30:00"));
        assert_eq!(items[0].description.as_deref(), Some("수소 인프라 관련 기사"));
        // Unparseable date passes through raw; empty description is dropped.
        assert_eq!(items[1].published.as_deref(), Some("not a date"));
        assert!(items[1].description.is_none());
    }

    #[test]
    fn test_parse_response_applies_per_keyword_cap() {
        let items = parse_response(RESPONSE, "NaverNews", "수소", 1).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_parse_response_drops_invalid_items() {
        let body = r#"{"items": [{"title": "", "link": "https://x/1"}, {"title": "ok", "link": "nowhere"}]}"#;
        let items = parse_response(body, "NaverNews", "수소", 5).unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_missing_credentials_short_circuit() {
        let fetcher =
            NaverApiFetcher::new("NaverNews", "", None, None, vec!["수소".to_string()]).unwrap();
        let batch = fetcher
            .fetch_by_keywords(&["수소".to_string()], 3)
            .await
            .unwrap();
        assert!(batch.items.is_empty());
        assert!(batch.warning.unwrap().contains("credentials missing"));
    }

    #[tokio::test]
    async fn test_keyword_isolation_on_transport_failure() {
        let base = serve(vec![
            Route::new("query=bad", 500, "boom"),
            Route::new("query=good", 200, RESPONSE),
        ])
        .await;
        let fetcher = NaverApiFetcher::new(
            "NaverNews",
            &format!("{base}/v1/search/news.json"),
            Some("id".to_string()),
            Some("secret".to_string()),
            vec![],
        )
        .unwrap();

        let keywords = vec!["bad".to_string(), "good".to_string()];
        let batch = fetcher.fetch_by_keywords(&keywords, 5).await.unwrap();

        // The failing keyword is reported, the succeeding one still delivers.
        assert_eq!(batch.items.len(), 2);
        assert!(batch.items.iter().all(|i| i.keyword.as_deref() == Some("good")));
        assert!(batch.warning.unwrap().contains("'bad'"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_successive_keyword_requests_are_paced_apart() {
        // An unparsable endpoint makes every request fail without touching
        // the network, leaving only the inter-keyword pacing on the clock.
        let fetcher = NaverApiFetcher::new(
            "NaverNews",
            "http://",
            Some("id".to_string()),
            Some("secret".to_string()),
            vec![],
        )
        .unwrap();

        let start = tokio::time::Instant::now();
        fetcher
            .fetch_by_keywords(&["수소".to_string()], 3)
            .await
            .unwrap();
        // A single keyword goes out immediately.
        assert!(start.elapsed() < KEYWORD_PAUSE);

        let start = tokio::time::Instant::now();
        fetcher
            .fetch_by_keywords(&["수소".to_string(), "수전해".to_string()], 3)
            .await
            .unwrap();
        assert!(start.elapsed() >= KEYWORD_PAUSE);
    }

    #[tokio::test]
    async fn test_auth_errors_are_reported_with_cause() {
        let base = serve(vec![Route::new("query=", 401, "{}")]).await;
        let fetcher = NaverApiFetcher::new(
            "NaverNews",
            &format!("{base}/v1/search/news.json"),
            Some("id".to_string()),
            Some("wrong".to_string()),
            vec![],
        )
        .unwrap();

        let keywords = vec!["수소".to_string()];
        let batch = fetcher.fetch_by_keywords(&keywords, 3).await.unwrap();
        assert!(batch.items.is_empty());
        assert!(batch.warning.unwrap().contains("invalid credentials (401)"));
    }
}
