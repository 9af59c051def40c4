//! Pipeline-level error taxonomy and run aggregation.

use std::fmt;

use thiserror::Error;

use crate::feed::FeedError;
use crate::importer::CopyError;
use crate::notify::NotifyError;
use crate::paths::PathMapError;
use crate::store::{MediaType, StoreError};
use crate::torrent::TorrentParseError;
use crate::torrent_client::TorrentClientError;

/// Errors surfaced by the feed pipeline and the importers.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Network or I/O failure talking to an external system.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed torrent: {0}")]
    MalformedTorrent(#[from] TorrentParseError),

    #[error("malformed feed item: {0}")]
    MalformedFeedItem(String),

    /// No torrent category exists for the derived (scope, media type) pair.
    #[error("no torrent category found for scope={scope}, media_type={media_type}")]
    NoCategory { scope: String, media_type: MediaType },

    /// Uniqueness violation in the store.
    #[error("store conflict: {0}")]
    StoreConflict(String),

    #[error("store error: {0}")]
    Store(String),

    #[error(transparent)]
    PathOutsideRoot(#[from] PathMapError),

    /// File copy failed or the torrent held no book files.
    #[error("import failed: {0}")]
    ImportFailure(String),

    #[error("run cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}

impl From<TorrentClientError> for PipelineError {
    fn from(e: TorrentClientError) -> Self {
        PipelineError::Transport(format!("torrent client: {}", e))
    }
}

impl From<NotifyError> for PipelineError {
    fn from(e: NotifyError) -> Self {
        PipelineError::Transport(format!("notifier: {}", e))
    }
}

impl From<FeedError> for PipelineError {
    fn from(e: FeedError) -> Self {
        match e {
            FeedError::Parse(msg) => PipelineError::MalformedFeedItem(msg),
            other => PipelineError::Transport(other.to_string()),
        }
    }
}

impl From<StoreError> for PipelineError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(msg) => PipelineError::StoreConflict(msg),
            other => PipelineError::Store(other.to_string()),
        }
    }
}

impl From<CopyError> for PipelineError {
    fn from(e: CopyError) -> Self {
        PipelineError::ImportFailure(e.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(e: std::io::Error) -> Self {
        PipelineError::Transport(e.to_string())
    }
}

/// A single failure collected during a run, with the context it happened in.
#[derive(Debug)]
pub struct RunFailure {
    pub context: String,
    pub error: PipelineError,
}

/// Failures aggregated over a whole run.
#[derive(Debug, Default)]
pub struct RunErrors {
    failures: Vec<RunFailure>,
}

impl RunErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, context: impl Into<String>, error: PipelineError) {
        self.failures.push(RunFailure {
            context: context.into(),
            error,
        });
    }

    pub fn extend(&mut self, other: RunErrors) {
        self.failures.extend(other.failures);
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> &[RunFailure] {
        &self.failures
    }

    pub fn was_cancelled(&self) -> bool {
        self.failures.iter().any(|f| f.error.is_cancelled())
    }
}

impl fmt::Display for RunErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error(s) during run", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  - {}: {}", failure.context, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for RunErrors {}
