//! Feed watcher lifecycle integration tests.
//!
//! These tests drive a full feed watcher run against a file-backed store and
//! the mock tracker, torrent client and notifier:
//! feed -> description -> author match -> category -> dedup -> dispatch

use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use bookwarden_core::{
    notify::NotifierKind,
    store::{
        CatalogStore, FeedStore, MediaType, NewAuthorSubscription, NewFeed, NewNotifier,
        NewSubscriptionItem, NewTorrentCategory, SubscriptionStore,
    },
    testing::{fixtures, MockNotifier, MockTorrentClient, MockTracker},
    FeedWatcher, RunContext, SqliteStore,
};

const FEED_URL: &str = "https://tracker/rss/books";

/// Test helper to create all dependencies for feed watcher testing.
struct TestHarness {
    store: Arc<SqliteStore>,
    tracker: Arc<MockTracker>,
    torrent_client: Arc<MockTorrentClient>,
    notifier: Arc<MockNotifier>,
    subscription_id: i64,
    _temp_dir: TempDir,
}

impl TestHarness {
    /// JF Brink (alias J.F. Brink) subscribed in the personal scope, with a
    /// personal audiobook category and one enabled feed.
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteStore::new(&temp_dir.path().join("test.db")).expect("Failed to create store"),
        );
        store.seed_defaults().unwrap();

        let personal = store.get_scope_by_name("personal").unwrap().unwrap();
        let author = store.create_author("JF Brink").unwrap();
        store.add_alias(author.id, "J.F. Brink").unwrap();
        let subscription = store
            .create_subscription(NewAuthorSubscription {
                author_id: author.id,
                scope_id: personal.id,
                ..Default::default()
            })
            .unwrap();
        store
            .create_torrent_category(NewTorrentCategory {
                name: "personal-audiobooks".to_string(),
                scope_id: personal.id,
                media_type: MediaType::Audiobook,
            })
            .unwrap();
        store.create_feed(NewFeed::new("books", FEED_URL)).unwrap();

        Self {
            store,
            tracker: Arc::new(MockTracker::new()),
            torrent_client: Arc::new(MockTorrentClient::new()),
            notifier: Arc::new(MockNotifier::new()),
            subscription_id: subscription.id,
            _temp_dir: temp_dir,
        }
    }

    fn add_ebook_category(&self) {
        let personal = self.store.get_scope_by_name("personal").unwrap().unwrap();
        self.store
            .create_torrent_category(NewTorrentCategory {
                name: "personal-books".to_string(),
                scope_id: personal.id,
                media_type: MediaType::Ebook,
            })
            .unwrap();
    }

    fn watcher(&self) -> FeedWatcher {
        FeedWatcher::new(
            self.store.clone(),
            self.tracker.clone(),
            self.tracker.clone(),
            self.torrent_client.clone(),
            self.notifier.clone(),
        )
    }
}

#[tokio::test]
async fn test_alias_match_dispatches_to_scope_category() {
    let h = TestHarness::new();
    h.tracker
        .set_feed(
            FEED_URL,
            vec![fixtures::feed_item(1006, "J.F. Brink", "Audiobooks - Fiction")],
        )
        .await;

    let report = h.watcher().run(&RunContext::detached()).await;
    assert!(report.is_success(), "{}", report.errors);
    assert_eq!(report.dispatched, 1);

    let added = h.torrent_client.added().await;
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].url, "https://tracker/dl/1006.torrent");
    assert_eq!(
        added[0].options.category.as_deref(),
        Some("personal-audiobooks")
    );
    assert!(added[0].options.auto_tmm);

    let item = h
        .store
        .find_item_by_booksearch_id("1006")
        .unwrap()
        .expect("dispatch record");
    assert_eq!(item.author_subscription_id, h.subscription_id);
    assert_eq!(item.media_type, MediaType::Audiobook);
    assert_eq!(
        item.torrent_hash,
        fixtures::torrent_hash("https://tracker/dl/1006.torrent")
    );
    assert_eq!(item.title.as_deref(), Some("Book 1006"));
}

#[tokio::test]
async fn test_previously_dispatched_item_is_skipped() {
    let h = TestHarness::new();
    h.store
        .create_subscription_item(NewSubscriptionItem {
            author_subscription_id: h.subscription_id,
            torrent_hash: "0".repeat(40),
            booksearch_id: "1003".to_string(),
            media_type: MediaType::Audiobook,
            title: None,
            downloaded_at: Utc::now(),
        })
        .unwrap();
    h.tracker
        .set_feed(
            FEED_URL,
            vec![fixtures::feed_item(1003, "JF Brink", "Audiobooks - Fiction")],
        )
        .await;

    let report = h.watcher().run(&RunContext::detached()).await;

    assert!(report.is_success());
    assert_eq!(report.duplicates, 1);
    assert!(h.torrent_client.added().await.is_empty());
    assert!(h.tracker.torrent_requests().await.is_empty());
    assert_eq!(h.store.count_subscription_items().unwrap(), 1);
}

#[tokio::test]
async fn test_media_type_routes_to_category() {
    let h = TestHarness::new();
    h.add_ebook_category();
    h.tracker
        .set_feed(
            FEED_URL,
            vec![
                fixtures::feed_item(2001, "JF Brink", "Ebooks - Science Fiction"),
                fixtures::feed_item(2002, "JF Brink", "Audiobooks - Science Fiction"),
            ],
        )
        .await;

    let report = h.watcher().run(&RunContext::detached()).await;
    assert!(report.is_success(), "{}", report.errors);

    let categories: Vec<_> = h
        .torrent_client
        .added()
        .await
        .into_iter()
        .map(|a| a.options.category.unwrap_or_default())
        .collect();
    assert_eq!(categories, vec!["personal-books", "personal-audiobooks"]);

    let ebook = h.store.find_item_by_booksearch_id("2001").unwrap().unwrap();
    assert_eq!(ebook.media_type, MediaType::Ebook);
}

#[tokio::test]
async fn test_unknown_author_has_no_effect() {
    let h = TestHarness::new();
    h.tracker
        .set_feed(
            FEED_URL,
            vec![fixtures::feed_item(3000, "Unknown Author", "Ebooks - Fantasy")],
        )
        .await;

    let report = h.watcher().run(&RunContext::detached()).await;

    assert!(report.is_success());
    assert_eq!(report.unmatched, 1);
    assert!(h.torrent_client.added().await.is_empty());
    assert_eq!(h.store.count_subscription_items().unwrap(), 0);
    assert!(h.notifier.sent().await.is_empty());
}

#[tokio::test]
async fn test_repeated_runs_dispatch_once() {
    let h = TestHarness::new();
    h.tracker
        .set_feed(
            FEED_URL,
            vec![fixtures::feed_item(1006, "J.F. Brink", "Audiobooks - Fiction")],
        )
        .await;

    for _ in 0..3 {
        let report = h.watcher().run(&RunContext::detached()).await;
        assert!(report.is_success(), "{}", report.errors);
    }

    assert_eq!(h.torrent_client.added().await.len(), 1);
    assert_eq!(h.store.count_subscription_items().unwrap(), 1);
}

#[tokio::test]
async fn test_dispatch_notifies_subscription_notifier() {
    let h = TestHarness::new();
    let discord = h
        .store
        .get_notification_type_by_name("discord")
        .unwrap()
        .unwrap();
    let notifier = h
        .store
        .create_notifier(NewNotifier {
            name: "family-discord".to_string(),
            notification_type_id: discord.id,
            url: "https://discord.test/webhook".to_string(),
        })
        .unwrap();

    // A second author subscribed with a notifier.
    let personal = h.store.get_scope_by_name("personal").unwrap().unwrap();
    let author = h.store.create_author("Ursula K. Le Guin").unwrap();
    h.store
        .create_subscription(NewAuthorSubscription {
            author_id: author.id,
            scope_id: personal.id,
            notifier_id: Some(notifier.id),
            ..Default::default()
        })
        .unwrap();

    h.tracker
        .set_feed(
            FEED_URL,
            vec![
                fixtures::feed_item(4001, "ursula k le guin", "Audiobooks - Fantasy"),
                fixtures::feed_item(4002, "JF Brink", "Audiobooks - Fantasy"),
            ],
        )
        .await;

    let report = h.watcher().run(&RunContext::detached()).await;
    assert_eq!(report.dispatched, 2);

    // Only the subscription with a notifier produces a message.
    let sent = h.notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].target.name, "family-discord");
    assert_eq!(sent[0].target.kind, NotifierKind::Discord);
    assert_eq!(sent[0].title(), "Book 4001");
    let embed = &sent[0].message.embeds[0];
    assert_eq!(embed.field_value("Subscribed Author"), Some("Ursula K. Le Guin"));
}

#[tokio::test]
async fn test_failed_item_does_not_stop_feed() {
    let h = TestHarness::new();
    let broken = fixtures::feed_item(5001, "JF Brink", "Audiobooks - Fiction");
    h.tracker
        .set_torrent(&broken.link, b"<html>login required</html>".to_vec())
        .await;
    h.tracker
        .set_feed(
            FEED_URL,
            vec![
                broken,
                fixtures::feed_item(5002, "JF Brink", "Audiobooks - Fiction"),
            ],
        )
        .await;

    let report = h.watcher().run(&RunContext::detached()).await;

    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.dispatched, 1);
    assert!(h.store.find_item_by_booksearch_id("5002").unwrap().is_some());
    assert!(h.store.find_item_by_booksearch_id("5001").unwrap().is_none());
}
