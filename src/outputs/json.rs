//! JSON digest output.
//!
//! Writes one file per run, named by date:
//!
//! ```text
//! output_dir/
//! └── 2026-08-30.json
//! ```
//!
//! A later run on the same date overwrites the earlier file; the digest is a
//! snapshot, not a journal.

use crate::models::NewsDigest;
use std::error::Error;
use tokio::fs;
use tracing::{error, info, instrument};

/// Serialize a digest and write it under `output_dir`.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir))]
pub async fn write_digest(digest: &NewsDigest, output_dir: &str) -> Result<String, Box<dyn Error>> {
    let json = serde_json::to_string(digest)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(%output_dir, error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = format!(
        "{}/{}.json",
        output_dir.trim_end_matches('/'),
        digest.local_date
    );
    fs::write(&path, json).await?;
    info!(%path, items = digest.items.len(), "Wrote JSON digest");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FetchOutcome, NewsItem};

    #[tokio::test]
    async fn test_write_digest_roundtrip() {
        let dir = std::env::temp_dir().join("h2_news_digest_test");
        let _ = std::fs::remove_dir_all(&dir);

        let digest = NewsDigest {
            local_date: "2026-08-30".to_string(),
            local_time: "07:45:00".to_string(),
            items: vec![NewsItem {
                title: "Story".to_string(),
                url: "https://h2news.kr/a/1".to_string(),
                source: "H2 News".to_string(),
                published: None,
                keyword: None,
                description: None,
            }],
            outcomes: vec![FetchOutcome::success("H2 News", 1)],
        };

        let path = write_digest(&digest, dir.to_str().unwrap()).await.unwrap();
        assert!(path.ends_with("2026-08-30.json"));

        let text = std::fs::read_to_string(&path).unwrap();
        let back: NewsDigest = serde_json::from_str(&text).unwrap();
        assert_eq!(back.items.len(), 1);
        assert_eq!(back.outcomes[0].source, "H2 News");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
