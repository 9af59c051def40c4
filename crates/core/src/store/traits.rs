//! Storage traits, split by concern.
//!
//! All methods are synchronous: each call is one short statement or
//! transaction against the embedded database.

use thiserror::Error;

use crate::notify::NotifierTarget;

use super::types::*;

/// Error type for store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Referenced row does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
    /// Uniqueness or foreign-key constraint violated.
    #[error("Constraint violation: {0}")]
    Conflict(String),
    /// Any other database failure.
    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        match &e {
            rusqlite::Error::SqliteFailure(err, _)
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                StoreError::Conflict(e.to_string())
            }
            _ => StoreError::Database(e.to_string()),
        }
    }
}

/// RSS feed sources.
pub trait FeedStore: Send + Sync {
    fn create_feed(&self, feed: NewFeed) -> Result<Feed, StoreError>;

    fn get_feed(&self, id: i64) -> Result<Option<Feed>, StoreError>;

    /// All feeds ordered by id.
    fn list_feeds(&self) -> Result<Vec<Feed>, StoreError>;

    fn set_feed_enabled(&self, id: i64, enabled: bool) -> Result<(), StoreError>;

    /// Delete a feed together with its filters, filter sets and set entries.
    fn delete_feed(&self, id: i64) -> Result<(), StoreError>;
}

/// Reference tables: authors, aliases, scopes, categories, notifiers, libraries.
pub trait CatalogStore: Send + Sync {
    fn create_author(&self, name: &str) -> Result<Author, StoreError>;

    fn get_author_by_name(&self, name: &str) -> Result<Option<Author>, StoreError>;

    fn list_authors(&self) -> Result<Vec<Author>, StoreError>;

    /// Delete an author with its aliases, subscriptions and their items.
    fn delete_author(&self, id: i64) -> Result<(), StoreError>;

    fn add_alias(&self, author_id: i64, name: &str) -> Result<AuthorAlias, StoreError>;

    fn list_aliases(&self) -> Result<Vec<AuthorAlias>, StoreError>;

    fn delete_alias(&self, id: i64) -> Result<(), StoreError>;

    fn create_scope(&self, name: &str) -> Result<SubscriptionScope, StoreError>;

    fn get_scope_by_name(&self, name: &str) -> Result<Option<SubscriptionScope>, StoreError>;

    fn list_scopes(&self) -> Result<Vec<SubscriptionScope>, StoreError>;

    fn create_torrent_category(
        &self,
        category: NewTorrentCategory,
    ) -> Result<TorrentCategory, StoreError>;

    fn list_torrent_categories(&self) -> Result<Vec<TorrentCategory>, StoreError>;

    /// The category used for a (scope, media type) pair. When several rows
    /// exist for the pair, the oldest one is used.
    fn find_torrent_category(
        &self,
        scope_id: i64,
        media_type: MediaType,
    ) -> Result<Option<TorrentCategory>, StoreError>;

    fn create_notification_type(&self, name: &str) -> Result<NotificationType, StoreError>;

    fn get_notification_type_by_name(
        &self,
        name: &str,
    ) -> Result<Option<NotificationType>, StoreError>;

    fn create_notifier(&self, notifier: NewNotifier) -> Result<Notifier, StoreError>;

    fn list_notifiers(&self) -> Result<Vec<Notifier>, StoreError>;

    /// Notifiers joined with their notification type. Rows of an unsupported
    /// type are skipped.
    fn list_notifier_targets(&self) -> Result<Vec<NotifierTarget>, StoreError>;

    fn create_library(&self, library: NewLibrary) -> Result<Library, StoreError>;

    fn get_library_by_name(&self, name: &str) -> Result<Option<Library>, StoreError>;

    fn list_libraries(&self) -> Result<Vec<Library>, StoreError>;
}

/// Author subscriptions and their dispatch records.
pub trait SubscriptionStore: Send + Sync {
    fn create_subscription(
        &self,
        subscription: NewAuthorSubscription,
    ) -> Result<AuthorSubscription, StoreError>;

    fn delete_subscription(&self, id: i64) -> Result<(), StoreError>;

    /// Every subscription with author, scope, notifier and libraries, ordered by id.
    fn list_subscription_details(&self) -> Result<Vec<SubscriptionDetail>, StoreError>;

    /// Insert a dispatch record. A duplicate `booksearch_id` is a `Conflict`.
    fn create_subscription_item(
        &self,
        item: NewSubscriptionItem,
    ) -> Result<AuthorSubscriptionItem, StoreError>;

    fn find_item_by_booksearch_id(
        &self,
        booksearch_id: &str,
    ) -> Result<Option<AuthorSubscriptionItem>, StoreError>;

    /// Dispatch record for a torrent hash with its subscription preloaded.
    fn find_item_detail_by_hash(
        &self,
        torrent_hash: &str,
    ) -> Result<Option<SubscriptionItemDetail>, StoreError>;

    fn count_subscription_items(&self) -> Result<usize, StoreError>;
}

/// Legacy expression-filter plane and the feed-item audit log.
pub trait FilterStore: Send + Sync {
    fn list_filter_keys(&self) -> Result<Vec<FilterKey>, StoreError>;

    fn list_filter_operators(&self) -> Result<Vec<FilterOperator>, StoreError>;

    fn list_filter_set_types(&self) -> Result<Vec<FeedFilterSetType>, StoreError>;

    fn create_feed_filter(&self, filter: NewFeedFilter) -> Result<FeedFilter, StoreError>;

    fn list_feed_filters(&self, feed_id: i64) -> Result<Vec<FeedFilter>, StoreError>;

    fn create_filter_set(
        &self,
        feed_filter_id: i64,
        set_type: FilterSetKind,
    ) -> Result<FeedFilterSet, StoreError>;

    fn list_filter_sets(&self, feed_filter_id: i64) -> Result<Vec<FeedFilterSet>, StoreError>;

    fn add_filter_set_entry(
        &self,
        feed_filter_set_id: i64,
        key: FilterKind,
        operator: FilterOperatorKind,
        value: FilterValue,
    ) -> Result<FeedFilterSetEntry, StoreError>;

    fn list_filter_set_entries(
        &self,
        feed_filter_set_id: i64,
    ) -> Result<Vec<FeedFilterSetEntry>, StoreError>;

    /// Append to the audit log. A duplicate guid is a `Conflict`.
    fn record_feed_item(&self, item: NewFeedItem) -> Result<FeedItem, StoreError>;

    fn list_feed_items(&self) -> Result<Vec<FeedItem>, StoreError>;
}

/// Everything the pipeline needs from persistence.
pub trait Store: FeedStore + CatalogStore + SubscriptionStore + FilterStore {}

impl<T> Store for T where T: FeedStore + CatalogStore + SubscriptionStore + FilterStore {}
