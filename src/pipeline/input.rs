//! Feed resolution: load the crawler's JSON from a local path or a URL.
//!
//! Every failure here is an input-data error and happens before any HTML is
//! generated or any browser is launched.

use crate::error::Article2PdfError;
use crate::feed::Feed;
use std::path::PathBuf;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load and parse the feed at `source`.
///
/// If the source is a URL, fetch it over HTTP with `timeout_secs`.
/// Otherwise read it from disk.
pub async fn load_feed(source: &str, timeout_secs: u64) -> Result<Feed, Article2PdfError> {
    let bytes = if is_url(source) {
        download_feed(source, timeout_secs).await?
    } else {
        read_local(source).await?
    };

    debug!("Read {} bytes of feed data from {}", bytes.len(), source);
    let feed = Feed::from_slice(&bytes, source)?;
    info!(
        "Loaded feed with {} articles (crawled at {})",
        feed.articles.len(),
        feed.crawled_at.as_deref().unwrap_or("unknown")
    );
    Ok(feed)
}

async fn read_local(path_str: &str) -> Result<Vec<u8>, Article2PdfError> {
    let path = PathBuf::from(path_str);

    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Article2PdfError::DataFileNotFound { path })
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(Article2PdfError::PermissionDenied { path })
        }
        Err(e) => Err(Article2PdfError::DataFileUnreadable { path, source: e }),
    }
}

async fn download_feed(url: &str, timeout_secs: u64) -> Result<Vec<u8>, Article2PdfError> {
    info!("Downloading feed from: {}", url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Article2PdfError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            Article2PdfError::DownloadTimeout {
                url: url.to_string(),
                secs: timeout_secs,
            }
        } else {
            Article2PdfError::DownloadFailed {
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    })?;

    if !response.status().is_success() {
        return Err(Article2PdfError::DownloadFailed {
            url: url.to_string(),
            reason: format!("HTTP {}", response.status()),
        });
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| Article2PdfError::DownloadFailed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    Ok(bytes.to_vec())
}
