//! Small helpers shared across fetchers and the binary entry point.

use std::error::Error;
use tokio::fs;
use tracing::{info, instrument};

/// Collapse runs of whitespace into single spaces and trim the ends.
///
/// Element text extracted with `scraper` arrives as fragments separated by
/// the markup's own indentation; this normalizes it into headline-shaped
/// text.
pub fn squash_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Ensure a directory exists and is writable.
///
/// Missing directories are created, then a throwaway probe file is written
/// and removed. Called at startup so a bad output path aborts the run
/// before any network traffic.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let probe = format!("{}/.write_probe", path.trim_end_matches('/'));
    fs::write(&probe, b"").await?;
    fs::remove_file(&probe).await?;
    info!("Output directory is writable");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squash_ws() {
        assert_eq!(squash_ws("  Hydrogen \n   deal  signed "), "Hydrogen deal signed");
        assert_eq!(squash_ws("already clean"), "already clean");
        assert_eq!(squash_ws("   "), "");
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates_missing_dirs() {
        let dir = std::env::temp_dir().join("h2_news_probe_test");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.to_str().unwrap().to_string();
        assert!(ensure_writable_dir(&path).await.is_ok());
        assert!(dir.is_dir());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_fixture_server_routes_by_substring() {
        let base = test_http::serve(vec![
            test_http::Route::new("query=good", 200, "{\"items\":[]}"),
            test_http::Route::new("/page", 200, "<html></html>"),
        ])
        .await;

        let client = reqwest::Client::new();
        let resp = client
            .get(format!("{base}/search?query=good"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(resp.text().await.unwrap(), "{\"items\":[]}");

        let resp = client.get(format!("{base}/nowhere")).send().await.unwrap();
        assert_eq!(resp.status().as_u16(), 404);
    }
}
