//! Types for torrent client operations.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during torrent client operations.
#[derive(Debug, Error)]
pub enum TorrentClientError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Torrent not found: {0}")]
    TorrentNotFound(String),

    #[error("Torrent rejected: {0}")]
    Rejected(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Internal error: {0}")]
    Internal(String),
}

/// A torrent as reported by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentInfo {
    /// Info hash (lowercase hex).
    pub hash: String,
    pub name: String,
    /// Comma-separated tag list, empty when untagged.
    pub tags: String,
    /// Save path as seen by the client.
    pub save_path: String,
    pub category: String,
}

impl TorrentInfo {
    /// Parsed tag set. An empty `tags` string yields an empty set.
    pub fn tag_set(&self) -> BTreeSet<String> {
        parse_tags(&self.tags)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.split(',').any(|t| t.trim() == tag)
    }
}

/// Split a comma-separated tag list, trimming and dropping empty entries.
pub fn parse_tags(tags: &str) -> BTreeSet<String> {
    tags.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// A file inside a torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentFile {
    /// Path relative to the torrent's save path, `/`-separated.
    pub name: String,
}

impl TorrentFile {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Options for adding a torrent by URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddTorrentOptions {
    /// Let the client pick the save path from the category (automatic torrent management).
    pub auto_tmm: bool,
    /// Category assigned for later routing.
    pub category: Option<String>,
}

impl AddTorrentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_tmm(mut self, enabled: bool) -> Self {
        self.auto_tmm = enabled;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Render as the client's option map.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("autoTMM", self.auto_tmm.to_string())];
        if let Some(category) = &self.category {
            params.push(("category", category.clone()));
        }
        params
    }
}

/// Trait for torrent client backends.
#[async_trait]
pub trait TorrentClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// List torrents assigned to a category.
    async fn list_by_category(&self, category: &str)
        -> Result<Vec<TorrentInfo>, TorrentClientError>;

    /// Hand a torrent URL to the client.
    async fn add_from_url(
        &self,
        url: &str,
        options: &AddTorrentOptions,
    ) -> Result<(), TorrentClientError>;

    /// Add a tag to the given torrents. Adding a tag that is already present is a no-op.
    async fn add_tags(&self, hashes: &[String], tag: &str) -> Result<(), TorrentClientError>;

    /// List the files of a torrent, relative to its save path.
    async fn list_files(&self, hash: &str) -> Result<Vec<TorrentFile>, TorrentClientError>;

    /// Client version string, used as a connectivity check.
    async fn version(&self) -> Result<String, TorrentClientError>;
}
