//! Feed watcher run loop.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::context::RunContext;
use crate::error::{PipelineError, RunErrors};
use crate::feed::{parse_description, FeedEntry, FeedSource, RawFeedItem, TorrentFetcher};
use crate::matcher::AuthorMatcher;
use crate::metrics::{FEED_ITEMS, TORRENTS_DISPATCHED};
use crate::notify::{dispatch, Notifier};
use crate::store::{Feed, MediaType, NewSubscriptionItem, Store, StoreError};
use crate::torrent::extract_info_hash;
use crate::torrent_client::{AddTorrentOptions, TorrentClient};

use super::notification::grabbed_notification;
use super::types::{FeedRunReport, ItemOutcome};

/// Polls every enabled feed once and dispatches items by subscribed authors.
pub struct FeedWatcher {
    store: Arc<dyn Store>,
    source: Arc<dyn FeedSource>,
    fetcher: Arc<dyn TorrentFetcher>,
    client: Arc<dyn TorrentClient>,
    notifier: Arc<dyn Notifier>,
}

/// Per-run state shared by every feed.
struct RunState {
    matcher: AuthorMatcher,
    /// Booksearch ids dispatched during this run.
    dispatched: HashSet<String>,
}

impl FeedWatcher {
    pub fn new(
        store: Arc<dyn Store>,
        source: Arc<dyn FeedSource>,
        fetcher: Arc<dyn TorrentFetcher>,
        client: Arc<dyn TorrentClient>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            store,
            source,
            fetcher,
            client,
            notifier,
        }
    }

    /// Process every feed once. Errors are collected in the report; the run goes on
    /// past failing items and feeds and stops early only when cancelled.
    pub async fn run(&self, ctx: &RunContext) -> FeedRunReport {
        info!("Starting feed watcher");
        let mut report = FeedRunReport::default();

        let matcher = match AuthorMatcher::load_from_store(self.store.as_ref()) {
            Ok(matcher) => matcher,
            Err(e) => {
                error!(error = %e, "Failed to load subscriptions");
                report.errors.push("load subscriptions", e.into());
                return report;
            }
        };

        let feeds = match self.store.list_feeds() {
            Ok(feeds) => feeds,
            Err(e) => {
                error!(error = %e, "Failed to list feeds");
                report.errors.push("list feeds", e.into());
                return report;
            }
        };
        info!(count = feeds.len(), "Found feeds to process");

        let mut state = RunState {
            matcher,
            dispatched: HashSet::new(),
        };

        for feed in &feeds {
            if !feed.enabled {
                debug!(feed = %feed.name, "Feed disabled, skipping");
                report.feeds_skipped += 1;
                continue;
            }

            let errors = self.watch_feed(ctx, feed, &mut state, &mut report).await;
            report.feeds_processed += 1;

            let cancelled = errors.was_cancelled();
            report.errors.extend(errors);
            if cancelled {
                warn!("Feed watcher cancelled");
                break;
            }
        }

        info!(
            feeds = report.feeds_processed,
            items = report.items_seen,
            dispatched = report.dispatched,
            duplicates = report.duplicates,
            unmatched = report.unmatched,
            errors = report.errors.len(),
            "Feed watcher finished"
        );
        report
    }

    async fn watch_feed(
        &self,
        ctx: &RunContext,
        feed: &Feed,
        state: &mut RunState,
        report: &mut FeedRunReport,
    ) -> RunErrors {
        let mut errors = RunErrors::new();
        info!(feed = %feed.name, url = %feed.url, "Processing feed");

        let items = match ctx.guard(self.source.fetch_feed(&feed.url)).await {
            Ok(items) => items,
            Err(e) => {
                warn!(feed = %feed.name, error = %e, "Failed to fetch feed");
                errors.push(format!("feed '{}'", feed.name), e);
                return errors;
            }
        };
        debug!(feed = %feed.name, items = items.len(), "Parsed feed");

        for item in items {
            report.items_seen += 1;
            match self.process_item(ctx, &item, state).await {
                Ok(outcome) => {
                    FEED_ITEMS.with_label_values(&[outcome.as_str()]).inc();
                    report.record(outcome);
                }
                Err(e) => {
                    FEED_ITEMS.with_label_values(&["failed"]).inc();
                    warn!(
                        feed = %feed.name,
                        title = %item.title,
                        guid = %item.guid,
                        error = %e,
                        "Error processing feed item"
                    );
                    let cancelled = e.is_cancelled();
                    errors.push(
                        format!("feed '{}' item '{}' ({})", feed.name, item.title, item.guid),
                        e,
                    );
                    if cancelled {
                        break;
                    }
                }
            }
        }

        errors
    }

    async fn process_item(
        &self,
        ctx: &RunContext,
        item: &RawFeedItem,
        state: &mut RunState,
    ) -> Result<ItemOutcome, PipelineError> {
        ctx.check()?;

        let entry = FeedEntry {
            guid: item.guid.clone(),
            link: item.link.clone(),
            title: item.title.clone(),
            ..parse_description(&item.description)
        };
        let booksearch_id = entry.booksearch_id().to_string();

        let Some(subscription) = state.matcher.find(entry.authors.as_slice()) else {
            return Ok(ItemOutcome::Unmatched);
        };

        if booksearch_id.is_empty() {
            return Err(PipelineError::MalformedFeedItem("item has no guid".to_string()));
        }
        if entry.link.is_empty() {
            return Err(PipelineError::MalformedFeedItem("item has no link".to_string()));
        }

        info!(
            title = %entry.title,
            author = %subscription.author.name,
            scope = %subscription.scope.name,
            feed_authors = ?entry.authors,
            "Found matching subscription"
        );

        let media_type = MediaType::from_feed_category(&entry.category);
        let category = self
            .store
            .find_torrent_category(subscription.scope.id, media_type)?
            .ok_or_else(|| PipelineError::NoCategory {
                scope: subscription.scope.name.clone(),
                media_type,
            })?;
        debug!(
            category = %category.name,
            feed_category = %entry.category,
            "Determined torrent category"
        );

        if state.dispatched.contains(&booksearch_id) {
            debug!(booksearch_id = %booksearch_id, "Already dispatched in this run");
            return Ok(ItemOutcome::Duplicate);
        }
        ctx.check()?;
        if self.store.find_item_by_booksearch_id(&booksearch_id)?.is_some() {
            info!(
                booksearch_id = %booksearch_id,
                title = %entry.title,
                "Item already downloaded, skipping"
            );
            return Ok(ItemOutcome::Duplicate);
        }

        let bytes = ctx.guard(self.fetcher.fetch_torrent(&entry.link)).await?;
        let hash = extract_info_hash(&bytes)?;
        debug!(hash = %hash, title = %entry.title, "Downloaded torrent");

        let options = AddTorrentOptions::new()
            .with_auto_tmm(true)
            .with_category(category.name.clone());
        ctx.guard(self.client.add_from_url(&entry.link, &options))
            .await?;
        state.dispatched.insert(booksearch_id.clone());
        TORRENTS_DISPATCHED
            .with_label_values(&[media_type.as_str()])
            .inc();
        info!(
            title = %entry.title,
            category = %category.name,
            hash = %hash,
            "Added torrent to client"
        );

        // The torrent is with the client now; a failed insert is only logged.
        let record = NewSubscriptionItem {
            author_subscription_id: subscription.subscription.id,
            torrent_hash: hash.clone(),
            booksearch_id: booksearch_id.clone(),
            media_type,
            title: Some(entry.title.clone()).filter(|t| !t.is_empty()),
            downloaded_at: Utc::now(),
        };
        match self.store.create_subscription_item(record) {
            Ok(_) => {}
            Err(StoreError::Conflict(_)) => {
                info!(booksearch_id = %booksearch_id, "Subscription item already recorded");
            }
            Err(e) => {
                error!(hash = %hash, error = %e, "Failed to create subscription item record");
            }
        }

        let message = grabbed_notification(&entry, subscription);
        dispatch(
            ctx,
            self.notifier.as_ref(),
            subscription.notifier.as_ref(),
            &message,
        )
        .await;

        info!(
            title = %entry.title,
            author = %subscription.author.name,
            hash = %hash,
            "Successfully processed feed item"
        );
        Ok(ItemOutcome::Dispatched)
    }
}
