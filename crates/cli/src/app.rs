//! Wiring of the store and gateways for one pipeline stage.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tracing::{info, warn};

use bookwarden_core::feed::TrackerClient;
use bookwarden_core::importer::{FileCopier, ImportTags};
use bookwarden_core::metrics::RUN_DURATION;
use bookwarden_core::notify::{DiscordNotifier, Notifier, NotifierDirectory};
use bookwarden_core::paths::PathMapper;
use bookwarden_core::store::{CatalogStore, FeedStore, MediaType, SubscriptionStore};
use bookwarden_core::torrent_client::{QBittorrentClient, TorrentClient};
use bookwarden_core::{
    AuthorSubscriptionImporter, BookImporter, Config, FeedWatcher, ImportRunReport, RunContext,
    SqliteStore,
};

/// Which importer to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ImportTarget {
    Ebooks,
    Audiobooks,
    AuthorSubscriptions,
    All,
}

pub struct App {
    config: Config,
    store: Arc<SqliteStore>,
}

impl App {
    /// Open the store named in the configuration, creating its tables.
    pub fn open(config: Config) -> Result<Self> {
        let store = SqliteStore::new(&config.database.path)
            .with_context(|| format!("Failed to open database {:?}", config.database.path))?;
        info!(path = ?config.database.path, "Store opened");
        Ok(Self {
            config,
            store: Arc::new(store),
        })
    }

    pub fn migrate(&self) -> Result<()> {
        self.store
            .seed_defaults()
            .context("Failed to seed default rows")?;
        info!("Schema up to date");
        Ok(())
    }

    fn torrent_client(&self) -> Result<Arc<dyn TorrentClient>> {
        let client = QBittorrentClient::new(self.config.qbit.clone())
            .context("Failed to create qBittorrent client")?;
        info!(url = %self.config.qbit.url, "Using qBittorrent");
        Ok(Arc::new(client))
    }

    fn notifier(&self) -> Result<Arc<dyn Notifier>> {
        let timeout = Duration::from_secs(self.config.notifications.timeout_secs as u64);
        let notifier = DiscordNotifier::new(timeout).context("Failed to create notifier")?;
        Ok(Arc::new(notifier))
    }

    fn directory(&self) -> Result<NotifierDirectory> {
        let mut directory = NotifierDirectory::from_config(&self.config.notifications.notifiers);
        directory
            .extend_from_store(self.store.as_ref())
            .context("Failed to load notifiers")?;
        Ok(directory)
    }

    pub async fn feedwatch(&self, ctx: &RunContext) -> Result<()> {
        let _timer = RUN_DURATION.with_label_values(&["feedwatch"]).start_timer();
        let tracker = Arc::new(
            TrackerClient::new(&self.config.book_search)
                .context("Failed to create tracker client")?,
        );
        let watcher = FeedWatcher::new(
            self.store.clone(),
            tracker.clone(),
            tracker,
            self.torrent_client()?,
            self.notifier()?,
        );

        let report = watcher.run(ctx).await.into_result()?;
        info!(
            dispatched = report.dispatched,
            duplicates = report.duplicates,
            unmatched = report.unmatched,
            "Feed watch complete"
        );
        Ok(())
    }

    fn book_importer(
        &self,
        media_type: MediaType,
        client: &Arc<dyn TorrentClient>,
        notifier: &Arc<dyn Notifier>,
        directory: &NotifierDirectory,
    ) -> BookImporter {
        let importers = &self.config.importers;
        let config = match media_type {
            MediaType::Ebook => &importers.ebook,
            MediaType::Audiobook => &importers.audiobook,
        };
        let paths = PathMapper::new(
            self.config.qbit.download_path.clone(),
            self.config.qbit.local_download_path.clone(),
        );

        BookImporter::new(media_type, client.clone(), notifier.clone(), paths)
            .configure(config)
            .with_tags(ImportTags::from_config(importers))
            .with_copier(FileCopier::new().with_checksum_verification(importers.verify_checksums))
            .with_directory(directory.clone())
    }

    pub async fn import(&self, ctx: &RunContext, target: ImportTarget) -> Result<()> {
        let client = self.torrent_client()?;
        let notifier = self.notifier()?;
        let directory = self.directory()?;
        let ebook = Arc::new(self.book_importer(MediaType::Ebook, &client, &notifier, &directory));
        let audiobook = Arc::new(self.book_importer(
            MediaType::Audiobook,
            &client,
            &notifier,
            &directory,
        ));

        let mut report = ImportRunReport::default();
        if matches!(target, ImportTarget::Ebooks | ImportTarget::All) {
            let _timer = RUN_DURATION
                .with_label_values(&["import_ebooks"])
                .start_timer();
            report.merge(ebook.run(ctx).await);
        }
        if matches!(target, ImportTarget::Audiobooks | ImportTarget::All) && !ctx.is_cancelled() {
            let _timer = RUN_DURATION
                .with_label_values(&["import_audiobooks"])
                .start_timer();
            report.merge(audiobook.run(ctx).await);
        }
        if matches!(target, ImportTarget::AuthorSubscriptions | ImportTarget::All)
            && !ctx.is_cancelled()
        {
            let _timer = RUN_DURATION
                .with_label_values(&["import_author_subscriptions"])
                .start_timer();
            let importer =
                AuthorSubscriptionImporter::new(self.store.clone(), client, ebook, audiobook)
                    .with_category(self.config.importers.author_subscription_category.clone());
            report.merge(importer.run(ctx).await);
        }

        let report = report.into_result()?;
        info!(
            seen = report.torrents_seen,
            imported = report.imported,
            "Import complete"
        );
        Ok(())
    }

    /// Check that every dependency of a run is reachable.
    pub async fn doctor(&self, ctx: &RunContext) -> Result<()> {
        let feeds = self.store.list_feeds().context("Failed to list feeds")?;
        let subscriptions = self
            .store
            .list_subscription_details()
            .context("Failed to list subscriptions")?;
        let libraries = self
            .store
            .list_libraries()
            .context("Failed to list libraries")?;
        println!(
            "store: ok ({} feeds, {} subscriptions, {} libraries)",
            feeds.len(),
            subscriptions.len(),
            libraries.len()
        );

        let directory = self.directory()?;
        println!("notifiers: {}", directory.len());

        let client = self.torrent_client()?;
        let version = ctx
            .guard(client.version())
            .await
            .context("Failed to reach qBittorrent")?;
        println!("qbittorrent: ok ({})", version);

        let importers = &self.config.importers;
        for library in importers.ebook.libraries.iter().chain(&importers.audiobook.libraries) {
            if library.path.is_dir() {
                println!("library {}: ok ({})", library.name, library.path.display());
            } else {
                warn!(library = %library.name, path = ?library.path, "Library directory missing");
                println!(
                    "library {}: missing, created on first import ({})",
                    library.name,
                    library.path.display()
                );
            }
        }
        Ok(())
    }
}
