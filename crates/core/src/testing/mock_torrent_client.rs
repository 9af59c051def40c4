//! Mock torrent client for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::torrent_client::{
    parse_tags, AddTorrentOptions, TorrentClient, TorrentClientError, TorrentFile, TorrentInfo,
};

/// A recorded add-from-URL call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedAdd {
    pub url: String,
    pub options: AddTorrentOptions,
    pub timestamp: chrono::DateTime<Utc>,
}

/// A recorded add-tags call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedTagging {
    pub hashes: Vec<String>,
    pub tag: String,
}

/// Mock implementation of the TorrentClient trait.
///
/// Provides controllable behavior for testing:
/// - Pre-populate torrents and their file lists
/// - Track added torrents and tag calls for assertions
/// - Simulate failures, globally or per torrent
///
/// # Example
///
/// ```rust,ignore
/// let client = MockTorrentClient::new();
/// client.add_torrent(fixtures::torrent_info("abc", "books", "/downloads/Book")).await;
/// client.set_files("abc", vec![TorrentFile::new("Book/book.epub")]).await;
///
/// // ... run an importer ...
///
/// assert!(client.torrent("abc").await.unwrap().has_tag("imported"));
/// ```
#[derive(Debug)]
pub struct MockTorrentClient {
    /// Known torrents, in insertion order.
    torrents: Arc<RwLock<Vec<TorrentInfo>>>,
    /// File lists by hash.
    files: Arc<RwLock<HashMap<String, Vec<TorrentFile>>>>,
    /// Hashes whose file listing fails.
    failing_files: Arc<RwLock<HashSet<String>>>,
    /// Recorded add_from_url calls.
    added: Arc<RwLock<Vec<RecordedAdd>>>,
    /// Recorded add_tags calls.
    taggings: Arc<RwLock<Vec<RecordedTagging>>>,
    /// If set, the next operation will fail with this error.
    next_error: Arc<RwLock<Option<TorrentClientError>>>,
}

impl Default for MockTorrentClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTorrentClient {
    /// Create a new mock torrent client.
    pub fn new() -> Self {
        Self {
            torrents: Arc::new(RwLock::new(Vec::new())),
            files: Arc::new(RwLock::new(HashMap::new())),
            failing_files: Arc::new(RwLock::new(HashSet::new())),
            added: Arc::new(RwLock::new(Vec::new())),
            taggings: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Pre-populate a torrent. A torrent with the same hash is replaced.
    pub async fn add_torrent(&self, info: TorrentInfo) {
        let mut torrents = self.torrents.write().await;
        torrents.retain(|t| t.hash != info.hash);
        torrents.push(info);
    }

    /// Set the file list reported for `hash`.
    pub async fn set_files(&self, hash: &str, files: Vec<TorrentFile>) {
        self.files.write().await.insert(hash.to_string(), files);
    }

    /// Make file listing fail for `hash`.
    pub async fn fail_files(&self, hash: &str) {
        self.failing_files.write().await.insert(hash.to_string());
    }

    /// Current state of a torrent.
    pub async fn torrent(&self, hash: &str) -> Option<TorrentInfo> {
        self.torrents
            .read()
            .await
            .iter()
            .find(|t| t.hash == hash)
            .cloned()
    }

    /// Get all recorded add_from_url calls.
    pub async fn added(&self) -> Vec<RecordedAdd> {
        self.added.read().await.clone()
    }

    /// Get all recorded add_tags calls.
    pub async fn taggings(&self) -> Vec<RecordedTagging> {
        self.taggings.read().await.clone()
    }

    /// Configure the next operation to fail with the given error.
    pub async fn set_next_error(&self, error: TorrentClientError) {
        *self.next_error.write().await = Some(error);
    }

    /// Take the next error if set.
    async fn take_error(&self) -> Option<TorrentClientError> {
        self.next_error.write().await.take()
    }
}

#[async_trait]
impl TorrentClient for MockTorrentClient {
    fn name(&self) -> &str {
        "mock"
    }

    async fn list_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        Ok(self
            .torrents
            .read()
            .await
            .iter()
            .filter(|t| t.category == category)
            .cloned()
            .collect())
    }

    async fn add_from_url(
        &self,
        url: &str,
        options: &AddTorrentOptions,
    ) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        self.added.write().await.push(RecordedAdd {
            url: url.to_string(),
            options: options.clone(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn add_tags(&self, hashes: &[String], tag: &str) -> Result<(), TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        self.taggings.write().await.push(RecordedTagging {
            hashes: hashes.to_vec(),
            tag: tag.to_string(),
        });

        // Unknown hashes are ignored, as the Web API does.
        let mut torrents = self.torrents.write().await;
        for torrent in torrents.iter_mut().filter(|t| hashes.contains(&t.hash)) {
            let mut tags = parse_tags(&torrent.tags);
            tags.insert(tag.to_string());
            torrent.tags = tags.into_iter().collect::<Vec<_>>().join(",");
        }
        Ok(())
    }

    async fn list_files(&self, hash: &str) -> Result<Vec<TorrentFile>, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }

        if self.failing_files.read().await.contains(hash) {
            return Err(TorrentClientError::ApiError(format!(
                "file listing failed for {}",
                hash
            )));
        }

        if let Some(files) = self.files.read().await.get(hash) {
            return Ok(files.clone());
        }
        if self.torrent(hash).await.is_some() {
            return Ok(Vec::new());
        }
        Err(TorrentClientError::TorrentNotFound(hash.to_string()))
    }

    async fn version(&self) -> Result<String, TorrentClientError> {
        if let Some(err) = self.take_error().await {
            return Err(err);
        }
        Ok("v4.6.0-mock".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn test_list_by_category() {
        let client = MockTorrentClient::new();
        client.add_torrent(fixtures::torrent_info("a", "books", "/d")).await;
        client.add_torrent(fixtures::torrent_info("b", "audiobooks", "/d")).await;

        let books = client.list_by_category("books").await.unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].hash, "a");
        assert!(client.list_by_category("other").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_tags_is_idempotent() {
        let client = MockTorrentClient::new();
        client.add_torrent(fixtures::torrent_info("a", "books", "/d")).await;

        let hashes = vec!["a".to_string(), "unknown".to_string()];
        client.add_tags(&hashes, "imported").await.unwrap();
        client.add_tags(&hashes, "imported").await.unwrap();

        let torrent = client.torrent("a").await.unwrap();
        assert_eq!(torrent.tags, "imported");
        assert_eq!(client.taggings().await.len(), 2);
    }

    #[tokio::test]
    async fn test_add_from_url_records_options() {
        let client = MockTorrentClient::new();
        let options = AddTorrentOptions::new()
            .with_auto_tmm(true)
            .with_category("personal-books");

        client
            .add_from_url("https://tracker/dl/1.torrent", &options)
            .await
            .unwrap();

        let added = client.added().await;
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].url, "https://tracker/dl/1.torrent");
        assert_eq!(added[0].options.category.as_deref(), Some("personal-books"));
        assert!(added[0].options.auto_tmm);
    }

    #[tokio::test]
    async fn test_list_files() {
        let client = MockTorrentClient::new();
        client.add_torrent(fixtures::torrent_info("a", "books", "/d")).await;
        client.add_torrent(fixtures::torrent_info("b", "books", "/d")).await;
        client.set_files("a", vec![TorrentFile::new("x/book.epub")]).await;
        client.fail_files("b").await;

        assert_eq!(client.list_files("a").await.unwrap().len(), 1);
        assert!(client.list_files("b").await.is_err());
        assert!(matches!(
            client.list_files("c").await,
            Err(TorrentClientError::TorrentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_next_error_applies_once() {
        let client = MockTorrentClient::new();
        client.set_next_error(TorrentClientError::Timeout).await;

        assert!(client.version().await.is_err());
        assert!(client.version().await.is_ok());
    }
}
