use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from tracker HTTP calls and feed parsing.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request timed out")]
    Timeout,

    #[error("failed to parse feed: {0}")]
    Parse(String),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

/// One RSS item as published, before its description is parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeedItem {
    pub guid: String,
    pub link: String,
    pub title: String,
    pub published_at: Option<DateTime<Utc>>,
    /// HTML-ish `Label: Value` pairs separated by `<br/>`.
    pub description: String,
}

/// A feed item with its description split into typed fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub guid: String,
    pub link: String,
    pub title: String,
    pub authors: Vec<String>,
    pub narrators: Vec<String>,
    pub series: Vec<String>,
    pub category: String,
    pub summary: String,
    pub tags: String,
    pub description: String,
    pub leechers: i64,
    pub seeders: i64,
    pub added: String,
}

impl FeedEntry {
    /// Tracker id of the release: the guid's last path segment, or the whole guid
    /// when it has no usable segment.
    pub fn booksearch_id(&self) -> &str {
        booksearch_id(&self.guid)
    }
}

pub fn booksearch_id(guid: &str) -> &str {
    match guid.rfind('/') {
        Some(idx) if idx + 1 < guid.len() => &guid[idx + 1..],
        _ => guid,
    }
}

/// Source of feed items.
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<RawFeedItem>, FeedError>;
}

/// Downloads `.torrent` files.
#[async_trait]
pub trait TorrentFetcher: Send + Sync {
    async fn fetch_torrent(&self, url: &str) -> Result<Vec<u8>, FeedError>;
}
