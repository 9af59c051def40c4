//! Importer lifecycle integration tests.
//!
//! A torrent moves through the importer as:
//! [untagged, completed] -> copy book files flat -> [imported]
//!                       \-> failure             -> [manual-intervention]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use bookwarden_core::{
    importer::{ImportType, LibraryTarget, DEFAULT_CATEGORY},
    notify::{NotifierDirectory, NotifierKind, NotifierTarget},
    paths::PathMapper,
    store::{
        CatalogStore, FeedStore, MediaType, NewAuthorSubscription, NewFeed, NewLibrary,
        NewTorrentCategory, SubscriptionStore,
    },
    testing::{fixtures, MockNotifier, MockTorrentClient, MockTracker},
    torrent_client::TorrentFile,
    AuthorSubscriptionImporter, BookImporter, FeedWatcher, RunContext, SqliteStore,
};

/// Test helper with a download root and a library root on disk.
struct TestHarness {
    torrent_client: Arc<MockTorrentClient>,
    notifier: Arc<MockNotifier>,
    downloads: PathBuf,
    library: PathBuf,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let downloads = temp_dir.path().join("mnt/downloads");
        let library = temp_dir.path().join("lib");
        std::fs::create_dir_all(&downloads).unwrap();

        Self {
            torrent_client: Arc::new(MockTorrentClient::new()),
            notifier: Arc::new(MockNotifier::new()),
            downloads,
            library,
            _temp_dir: temp_dir,
        }
    }

    fn paths(&self) -> PathMapper {
        PathMapper::new("/downloads", self.downloads.clone())
    }

    fn ebook_importer(&self) -> BookImporter {
        let mut directory = NotifierDirectory::new();
        directory.insert(NotifierTarget {
            name: "books".to_string(),
            kind: NotifierKind::Discord,
            url: "https://discord.test/books".to_string(),
        });

        BookImporter::new(
            MediaType::Ebook,
            self.torrent_client.clone(),
            self.notifier.clone(),
            self.paths(),
        )
        .with_library(LibraryTarget::new("books", self.library.clone()))
        .with_import_type(ImportType::new("books", "books").with_notifier("books"))
        .with_directory(directory)
    }

    /// Write a downloaded file as the client would have placed it.
    fn download(&self, torrent_dir: &str, relative: &str) {
        let path = self.downloads.join(torrent_dir).join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, format!("contents of {}", relative)).unwrap();
    }

    async fn add_torrent(&self, hash: &str, category: &str, torrent_dir: &str, files: &[&str]) {
        self.torrent_client
            .add_torrent(fixtures::torrent_info(
                hash,
                category,
                &format!("/downloads/{}", torrent_dir),
            ))
            .await;
        self.torrent_client
            .set_files(hash, files.iter().map(|f| TorrentFile::new(*f)).collect())
            .await;
    }
}

fn subdirectories(dir: &Path) -> usize {
    std::fs::read_dir(dir)
        .unwrap()
        .filter(|e| e.as_ref().unwrap().path().is_dir())
        .count()
}

#[tokio::test]
async fn test_import_flattens_nested_files() {
    let h = TestHarness::new();
    h.download("Deep", "Level1/Level2/deep-book.epub");
    h.add_torrent("deadbeef", "books", "Deep", &["Level1/Level2/deep-book.epub"])
        .await;

    let report = h.ebook_importer().run(&RunContext::detached()).await;

    assert!(report.is_success(), "{}", report.errors);
    assert_eq!(report.imported, 1);
    assert!(h.library.join("deep-book.epub").is_file());
    assert_eq!(subdirectories(&h.library), 0);
    assert!(h
        .torrent_client
        .torrent("deadbeef")
        .await
        .unwrap()
        .has_tag("imported"));

    let sent = h.notifier.sent_to("books").await;
    assert_eq!(sent.len(), 1);
    let embed = &sent[0].message.embeds[0];
    assert_eq!(embed.field_value("Files"), Some("• deep-book.epub"));
    assert_eq!(embed.field_value("Category"), Some("books"));
}

#[tokio::test]
async fn test_torrent_without_books_needs_manual_intervention() {
    let h = TestHarness::new();
    h.download("Extras", "readme.txt");
    h.download("Extras", "cover.jpg");
    h.add_torrent("cafe", "books", "Extras", &["readme.txt", "cover.jpg"])
        .await;

    let report = h.ebook_importer().run(&RunContext::detached()).await;

    assert_eq!(report.manual_intervention, 1);
    assert_eq!(report.errors.len(), 1);
    assert!(!h.library.exists() || std::fs::read_dir(&h.library).unwrap().count() == 0);

    let torrent = h.torrent_client.torrent("cafe").await.unwrap();
    assert!(torrent.has_tag("manual-intervention"));
    assert!(!torrent.has_tag("imported"));

    let sent = h.notifier.sent().await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].title(), "Manual Intervention Required");
}

#[tokio::test]
async fn test_second_run_is_a_no_op() {
    let h = TestHarness::new();
    h.download("Book", "book.epub");
    h.download("Broken", "notes.txt");
    h.add_torrent("aaaa", "books", "Book", &["book.epub"]).await;
    h.add_torrent("bbbb", "books", "Broken", &["notes.txt"]).await;
    let importer = h.ebook_importer();

    let first = importer.run(&RunContext::detached()).await;
    assert_eq!(first.imported, 1);
    assert_eq!(first.manual_intervention, 1);
    let taggings = h.torrent_client.taggings().await.len();

    let second = importer.run(&RunContext::detached()).await;

    assert!(second.is_success());
    assert_eq!(second.torrents_seen, 0);
    assert_eq!(h.torrent_client.taggings().await.len(), taggings);
    assert_eq!(h.notifier.sent().await.len(), 2);
    assert!(h.library.join("book.epub").is_file());
}

#[tokio::test]
async fn test_file_listing_failure_needs_manual_intervention() {
    let h = TestHarness::new();
    h.add_torrent("ffff", "books", "Gone", &[]).await;
    h.torrent_client.fail_files("ffff").await;

    let report = h.ebook_importer().run(&RunContext::detached()).await;

    assert_eq!(report.manual_intervention, 1);
    assert!(h
        .torrent_client
        .torrent("ffff")
        .await
        .unwrap()
        .has_tag("manual-intervention"));
}

#[tokio::test]
async fn test_cancelled_import_tags_nothing() {
    let h = TestHarness::new();
    h.download("Book", "book.epub");
    h.add_torrent("aaaa", "books", "Book", &["book.epub"]).await;

    let (ctx, handle) = RunContext::new();
    handle.cancel();
    let report = h.ebook_importer().run(&ctx).await;

    assert!(report.errors.was_cancelled());
    assert!(h.torrent_client.taggings().await.is_empty());
    assert!(!h.library.join("book.epub").exists());
}

#[tokio::test]
async fn test_dispatched_torrent_is_imported_into_subscription_library() {
    let h = TestHarness::new();
    let store = Arc::new(SqliteStore::in_memory().unwrap());
    store.seed_defaults().unwrap();

    // Subscription routed to an ebook library, with a notifier.
    let personal = store.get_scope_by_name("personal").unwrap().unwrap();
    let author = store.create_author("JF Brink").unwrap();
    let library = store
        .create_library(NewLibrary {
            name: "personal-ebooks".to_string(),
            path: h.library.display().to_string(),
            media_type: MediaType::Ebook,
        })
        .unwrap();
    store
        .create_subscription(NewAuthorSubscription {
            author_id: author.id,
            scope_id: personal.id,
            ebook_library_id: Some(library.id),
            ..Default::default()
        })
        .unwrap();
    store
        .create_torrent_category(NewTorrentCategory {
            name: DEFAULT_CATEGORY.to_string(),
            scope_id: personal.id,
            media_type: MediaType::Ebook,
        })
        .unwrap();
    store
        .create_feed(NewFeed::new("books", "https://tracker/rss"))
        .unwrap();

    // Dispatch through the feed watcher.
    let tracker = Arc::new(MockTracker::new());
    let item = fixtures::feed_item(7001, "JF Brink", "Ebooks - Fantasy");
    let hash = fixtures::torrent_hash(&item.link);
    tracker.set_feed("https://tracker/rss", vec![item]).await;
    let watcher = FeedWatcher::new(
        store.clone(),
        tracker.clone(),
        tracker,
        h.torrent_client.clone(),
        h.notifier.clone(),
    );
    let report = watcher.run(&RunContext::detached()).await;
    assert_eq!(report.dispatched, 1);

    // The client finishes the download.
    h.download("Book 7001", "Book 7001/book-7001.epub");
    h.add_torrent(&hash, DEFAULT_CATEGORY, "Book 7001", &["Book 7001/book-7001.epub"])
        .await;

    let ebook = Arc::new(BookImporter::new(
        MediaType::Ebook,
        h.torrent_client.clone(),
        h.notifier.clone(),
        h.paths(),
    ));
    let audiobook = Arc::new(BookImporter::new(
        MediaType::Audiobook,
        h.torrent_client.clone(),
        h.notifier.clone(),
        h.paths(),
    ));
    let importer =
        AuthorSubscriptionImporter::new(store.clone(), h.torrent_client.clone(), ebook, audiobook);

    let report = importer.run(&RunContext::detached()).await;

    assert!(report.is_success(), "{}", report.errors);
    assert_eq!(report.imported, 1);
    assert!(h.library.join("book-7001.epub").is_file());
    assert!(h
        .torrent_client
        .torrent(&hash)
        .await
        .unwrap()
        .has_tag("imported"));
}
