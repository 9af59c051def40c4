//! Testing utilities and mock implementations for pipeline tests.
//!
//! This module provides mock implementations of the external gateways
//! (torrent client, tracker, notifier), so the feed watcher and the
//! importers can be driven end to end without real infrastructure.
//!
//! # Example
//!
//! ```rust,ignore
//! use bookwarden_core::testing::{fixtures, MockNotifier, MockTorrentClient, MockTracker};
//!
//! let tracker = MockTracker::new();
//! let client = MockTorrentClient::new();
//! let notifier = MockNotifier::new();
//!
//! // Configure responses
//! tracker.set_feed("https://tracker/rss", vec![fixtures::feed_item(1, "JF Brink", "Ebooks - Fantasy")]).await;
//! client.add_torrent(fixtures::torrent_info("abc", "books", "/downloads/Book")).await;
//!
//! // Wire into FeedWatcher / BookImporter...
//! ```

mod mock_notifier;
mod mock_torrent_client;
mod mock_tracker;

pub use mock_notifier::{MockNotifier, SentNotification};
pub use mock_torrent_client::{MockTorrentClient, RecordedAdd, RecordedTagging};
pub use mock_tracker::MockTracker;

/// Test fixtures and helper functions.
pub mod fixtures {
    use sha1::{Digest, Sha1};

    use crate::feed::{format_description, FeedEntry, RawFeedItem};
    use crate::torrent_client::TorrentInfo;

    fn info_dict(name: &str) -> String {
        format!(
            "d6:lengthi1024e4:name{}:{}12:piece lengthi16384ee",
            name.len(),
            name
        )
    }

    /// A minimal single-file .torrent whose info dictionary is named `name`.
    ///
    /// Different names give different info hashes.
    pub fn torrent_bytes(name: &str) -> Vec<u8> {
        format!("d8:announce18:http://tracker/ann4:info{}e", info_dict(name)).into_bytes()
    }

    /// Info hash of [`torrent_bytes`] for the same `name`.
    pub fn torrent_hash(name: &str) -> String {
        hex::encode(Sha1::digest(info_dict(name).as_bytes()))
    }

    /// A feed item by `author` in the tracker category `category`.
    ///
    /// The guid ends in `id`, so the booksearch id is `id` as a string.
    pub fn feed_item(id: u32, author: &str, category: &str) -> RawFeedItem {
        let entry = FeedEntry {
            authors: vec![author.to_string()],
            category: category.to_string(),
            summary: format!("Book number {}", id),
            ..Default::default()
        };
        RawFeedItem {
            guid: format!("https://tracker/t/{}", id),
            link: format!("https://tracker/dl/{}.torrent", id),
            title: format!("Book {}", id),
            published_at: None,
            description: format_description(&entry),
        }
    }

    /// A completed, untagged torrent as the client would report it.
    pub fn torrent_info(hash: &str, category: &str, save_path: &str) -> TorrentInfo {
        TorrentInfo {
            hash: hash.to_string(),
            name: format!("Torrent {}", hash),
            tags: String::new(),
            save_path: save_path.to_string(),
            category: category.to_string(),
        }
    }
}
