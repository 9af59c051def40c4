//! Import of torrents dispatched by the feed watcher.
//!
//! Torrents in the author-subscription category carry no routing of their
//! own. The subscription item recorded at dispatch time names the
//! subscription, and through it the library and the notifier.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::context::RunContext;
use crate::error::PipelineError;
use crate::store::{MediaType, Store, SubscriptionItemDetail};
use crate::torrent_client::{TorrentClient, TorrentInfo};

use super::book_importer::{record_result, BookImporter};
use super::types::{ImportOutcome, ImportRunReport, LibraryTarget};

pub const DEFAULT_CATEGORY: &str = "author-subscriptions";

/// Routes author-subscription torrents to the ebook or audiobook importer.
pub struct AuthorSubscriptionImporter {
    store: Arc<dyn Store>,
    client: Arc<dyn TorrentClient>,
    ebook: Arc<BookImporter>,
    audiobook: Arc<BookImporter>,
    category: String,
}

impl AuthorSubscriptionImporter {
    pub fn new(
        store: Arc<dyn Store>,
        client: Arc<dyn TorrentClient>,
        ebook: Arc<BookImporter>,
        audiobook: Arc<BookImporter>,
    ) -> Self {
        Self {
            store,
            client,
            ebook,
            audiobook,
            category: DEFAULT_CATEGORY.to_string(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    fn importer(&self, media_type: MediaType) -> &BookImporter {
        match media_type {
            MediaType::Ebook => &self.ebook,
            MediaType::Audiobook => &self.audiobook,
        }
    }

    pub async fn run(&self, ctx: &RunContext) -> ImportRunReport {
        info!(category = %self.category, "Starting author subscription importer");
        let mut report = ImportRunReport::default();

        let torrents = match ctx.guard(self.client.list_by_category(&self.category)).await {
            Ok(torrents) => torrents,
            Err(e) => {
                warn!(category = %self.category, error = %e, "Failed to list torrents");
                report.errors.push(format!("category '{}'", self.category), e);
                return report;
            }
        };

        // Both importers share the sentinel tags.
        let tags = self.ebook.tags();
        for torrent in torrents.iter().filter(|t| tags.is_pending(t)) {
            report.torrents_seen += 1;
            let result = self.import_one(ctx, torrent).await;
            if record_result(&mut report, torrent, result) {
                warn!("Author subscription importer cancelled");
                break;
            }
        }

        info!(
            seen = report.torrents_seen,
            imported = report.imported,
            manual_intervention = report.manual_intervention,
            errors = report.errors.len(),
            "Author subscription importer finished"
        );
        report
    }

    async fn import_one(
        &self,
        ctx: &RunContext,
        torrent: &TorrentInfo,
    ) -> Result<ImportOutcome, PipelineError> {
        ctx.check()?;
        let Some(detail) = self.store.find_item_detail_by_hash(&torrent.hash)? else {
            let reason = "no subscription item for torrent hash".to_string();
            self.ebook.mark_unrouted(ctx, torrent, &reason).await?;
            return Ok(ImportOutcome::ManualIntervention { reason });
        };

        let SubscriptionItemDetail { item, subscription } = &detail;
        let importer = self.importer(item.media_type);
        let target = subscription.notifier.as_ref();
        debug!(
            hash = %torrent.hash,
            author = %subscription.author.name,
            scope = %subscription.scope.name,
            media_type = %item.media_type,
            "Found subscription item"
        );

        let Some(library) = subscription.library_for(item.media_type) else {
            let reason = format!(
                "subscription for '{}' ({}) has no {} library",
                subscription.author.name, subscription.scope.name, item.media_type
            );
            importer.mark_manual(ctx, torrent, &reason, target).await?;
            return Ok(ImportOutcome::ManualIntervention { reason });
        };

        importer
            .import_one(ctx, torrent, &LibraryTarget::from(library), target)
            .await
    }
}
