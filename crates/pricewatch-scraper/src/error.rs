use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// Every fetch strategy failed. `status` and `message` describe the last
    /// failure; `message` is a short body excerpt or the transport error.
    #[error("fetch failed for {url} (status {}): {message}", status_label(.status))]
    Fetch {
        url: String,
        status: Option<u16>,
        message: String,
    },

    #[error("invalid listing URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Failure to persist a cached HTML artifact. Never fatal to a scrape.
#[derive(Debug, Error)]
#[error("failed to write cache file {}: {source}", .path.display())]
pub struct CacheError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

#[allow(clippy::ref_option)]
fn status_label(status: &Option<u16>) -> String {
    status.map_or_else(|| "none".to_string(), |s| s.to_string())
}
