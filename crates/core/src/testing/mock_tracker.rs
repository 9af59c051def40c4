//! Mock tracker serving feeds and torrent files.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::feed::{FeedError, FeedSource, RawFeedItem, TorrentFetcher};

use super::fixtures;

/// Mock implementation of both [`FeedSource`] and [`TorrentFetcher`].
///
/// Feed URLs that were never configured answer with HTTP 404. Torrent URLs
/// that were never configured serve [`fixtures::torrent_bytes`] named after
/// the URL, so every link gets its own info hash.
#[derive(Debug)]
pub struct MockTracker {
    feeds: Arc<RwLock<HashMap<String, Vec<RawFeedItem>>>>,
    torrents: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    feed_requests: Arc<RwLock<Vec<String>>>,
    torrent_requests: Arc<RwLock<Vec<String>>>,
}

impl Default for MockTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTracker {
    pub fn new() -> Self {
        Self {
            feeds: Arc::new(RwLock::new(HashMap::new())),
            torrents: Arc::new(RwLock::new(HashMap::new())),
            feed_requests: Arc::new(RwLock::new(Vec::new())),
            torrent_requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Serve `items` at `url`.
    pub async fn set_feed(&self, url: &str, items: Vec<RawFeedItem>) {
        self.feeds.write().await.insert(url.to_string(), items);
    }

    /// Serve `bytes` as the torrent file at `url`.
    pub async fn set_torrent(&self, url: &str, bytes: Vec<u8>) {
        self.torrents.write().await.insert(url.to_string(), bytes);
    }

    /// Number of feed fetches so far.
    pub async fn feed_requests(&self) -> usize {
        self.feed_requests.read().await.len()
    }

    /// URLs of every torrent download so far.
    pub async fn torrent_requests(&self) -> Vec<String> {
        self.torrent_requests.read().await.clone()
    }
}

#[async_trait]
impl FeedSource for MockTracker {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<RawFeedItem>, FeedError> {
        self.feed_requests.write().await.push(url.to_string());

        self.feeds
            .read()
            .await
            .get(url)
            .cloned()
            .ok_or_else(|| FeedError::Status {
                url: url.to_string(),
                status: 404,
            })
    }
}

#[async_trait]
impl TorrentFetcher for MockTracker {
    async fn fetch_torrent(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        self.torrent_requests.write().await.push(url.to_string());

        Ok(self
            .torrents
            .read()
            .await
            .get(url)
            .cloned()
            .unwrap_or_else(|| fixtures::torrent_bytes(url)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_feed_is_not_found() {
        let tracker = MockTracker::new();
        let result = tracker.fetch_feed("https://tracker/nope").await;

        assert!(matches!(result, Err(FeedError::Status { status: 404, .. })));
        assert_eq!(tracker.feed_requests().await, 1);
    }

    #[tokio::test]
    async fn test_torrent_defaults_differ_per_url() {
        let tracker = MockTracker::new();
        let a = tracker.fetch_torrent("https://tracker/dl/1.torrent").await.unwrap();
        let b = tracker.fetch_torrent("https://tracker/dl/2.torrent").await.unwrap();

        assert_ne!(a, b);
        assert_eq!(tracker.torrent_requests().await.len(), 2);
    }
}
