//! Entity types owned by the store.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::notify::NotifierTarget;

use super::StoreError;

/// Kind of book a torrent carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Ebook,
    Audiobook,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Ebook => "ebook",
            MediaType::Audiobook => "audiobook",
        }
    }

    /// Derive the media type from a tracker category label such as
    /// `"Audiobooks - Fiction"` or `"Ebooks - Fantasy"`.
    pub fn from_feed_category(category: &str) -> Self {
        if category.starts_with("Audiobooks") {
            MediaType::Audiobook
        } else {
            MediaType::Ebook
        }
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ebook" => Ok(MediaType::Ebook),
            "audiobook" => Ok(MediaType::Audiobook),
            other => Err(StoreError::Database(format!("unknown media type: {}", other))),
        }
    }
}

/// An RSS source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFeed {
    pub name: String,
    pub url: String,
    pub enabled: bool,
}

impl NewFeed {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Alternative spelling of an author's name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorAlias {
    pub id: i64,
    pub author_id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Routing bucket such as `personal` or `family`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionScope {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Torrent-client category used for a (scope, media type) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorrentCategory {
    pub id: i64,
    pub name: String,
    pub scope_id: i64,
    pub media_type: MediaType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTorrentCategory {
    pub name: String,
    pub scope_id: i64,
    pub media_type: MediaType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationType {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notifier {
    pub id: i64,
    pub name: String,
    pub notification_type_id: i64,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotifier {
    pub name: String,
    pub notification_type_id: i64,
    pub url: String,
}

/// Destination directory for imported books.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Library {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub media_type: MediaType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLibrary {
    pub name: String,
    pub path: String,
    pub media_type: MediaType,
}

/// "Deliver items by this author, in this scope, via this notifier."
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorSubscription {
    pub id: i64,
    pub author_id: i64,
    pub scope_id: i64,
    pub notifier_id: Option<i64>,
    pub ebook_library_id: Option<i64>,
    pub audiobook_library_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewAuthorSubscription {
    pub author_id: i64,
    pub scope_id: i64,
    pub notifier_id: Option<i64>,
    pub ebook_library_id: Option<i64>,
    pub audiobook_library_id: Option<i64>,
}

/// Idempotency record: this tracker item was handed to the torrent client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorSubscriptionItem {
    pub id: i64,
    pub author_subscription_id: i64,
    pub torrent_hash: String,
    pub booksearch_id: String,
    pub media_type: MediaType,
    pub title: Option<String>,
    pub downloaded_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubscriptionItem {
    pub author_subscription_id: i64,
    pub torrent_hash: String,
    pub booksearch_id: String,
    pub media_type: MediaType,
    pub title: Option<String>,
    pub downloaded_at: DateTime<Utc>,
}

/// A subscription with its author, scope, notifier and libraries loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionDetail {
    pub subscription: AuthorSubscription,
    pub author: Author,
    pub scope: SubscriptionScope,
    pub notifier: Option<NotifierTarget>,
    pub ebook_library: Option<Library>,
    pub audiobook_library: Option<Library>,
}

impl SubscriptionDetail {
    pub fn library_for(&self, media_type: MediaType) -> Option<&Library> {
        match media_type {
            MediaType::Ebook => self.ebook_library.as_ref(),
            MediaType::Audiobook => self.audiobook_library.as_ref(),
        }
    }
}

/// A subscription item with its subscription preloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct SubscriptionItemDetail {
    pub item: AuthorSubscriptionItem,
    pub subscription: SubscriptionDetail,
}

// Legacy expression-filter plane. Stored and editable, not consulted by the matcher.

/// Feed item field a filter entry tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterKind {
    Author,
    Series,
    Title,
    Category,
    Summary,
    Tags,
    Description,
}

impl FilterKind {
    pub const ALL: [FilterKind; 7] = [
        FilterKind::Author,
        FilterKind::Series,
        FilterKind::Title,
        FilterKind::Category,
        FilterKind::Summary,
        FilterKind::Tags,
        FilterKind::Description,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterKind::Author => "author",
            FilterKind::Series => "series",
            FilterKind::Title => "title",
            FilterKind::Category => "category",
            FilterKind::Summary => "summary",
            FilterKind::Tags => "tags",
            FilterKind::Description => "description",
        }
    }
}

impl FromStr for FilterKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StoreError::Database(format!("unknown filter key: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperatorKind {
    Equals,
    Contains,
    Fnmatch,
    Regex,
}

impl FilterOperatorKind {
    pub const ALL: [FilterOperatorKind; 4] = [
        FilterOperatorKind::Equals,
        FilterOperatorKind::Contains,
        FilterOperatorKind::Fnmatch,
        FilterOperatorKind::Regex,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOperatorKind::Equals => "equals",
            FilterOperatorKind::Contains => "contains",
            FilterOperatorKind::Fnmatch => "fnmatch",
            FilterOperatorKind::Regex => "regex",
        }
    }
}

impl FromStr for FilterOperatorKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterOperatorKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StoreError::Database(format!("unknown filter operator: {}", s)))
    }
}

/// How the entries of a filter set combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterSetKind {
    Any,
    All,
}

impl FilterSetKind {
    pub const ALL: [FilterSetKind; 2] = [FilterSetKind::Any, FilterSetKind::All];

    pub fn as_str(&self) -> &'static str {
        match self {
            FilterSetKind::Any => "any",
            FilterSetKind::All => "all",
        }
    }
}

impl FromStr for FilterSetKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterSetKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StoreError::Database(format!("unknown filter set type: {}", s)))
    }
}

/// Typed operand of a filter entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FilterValue {
    Int(i64),
    String(String),
    Bool(bool),
}

impl FilterValue {
    /// Storage tag and textual payload.
    pub(crate) fn to_columns(&self) -> (&'static str, String) {
        match self {
            FilterValue::Int(v) => ("int", v.to_string()),
            FilterValue::String(v) => ("string", v.clone()),
            FilterValue::Bool(v) => ("bool", v.to_string()),
        }
    }

    pub(crate) fn from_columns(tag: &str, raw: String) -> Result<Self, StoreError> {
        match tag {
            "int" => raw
                .parse()
                .map(FilterValue::Int)
                .map_err(|_| StoreError::Database(format!("invalid int filter value: {}", raw))),
            "bool" => raw
                .parse()
                .map(FilterValue::Bool)
                .map_err(|_| StoreError::Database(format!("invalid bool filter value: {}", raw))),
            "string" => Ok(FilterValue::String(raw)),
            other => Err(StoreError::Database(format!(
                "unknown filter value type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterKey {
    pub id: i64,
    pub name: FilterKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterOperator {
    pub id: i64,
    pub name: FilterOperatorKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedFilterSetType {
    pub id: i64,
    pub name: FilterSetKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedFilter {
    pub id: i64,
    pub name: String,
    pub feed_id: i64,
    pub torrent_category_id: Option<i64>,
    pub notifier_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFeedFilter {
    pub name: String,
    pub feed_id: i64,
    pub torrent_category_id: Option<i64>,
    pub notifier_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedFilterSet {
    pub id: i64,
    pub feed_filter_id: i64,
    pub set_type: FilterSetKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedFilterSetEntry {
    pub id: i64,
    pub feed_filter_set_id: i64,
    pub key: FilterKind,
    pub operator: FilterOperatorKind,
    pub value: FilterValue,
}

/// Audit record of a feed item that matched the legacy filters. Insert-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: i64,
    pub guid: String,
    pub title: String,
    pub link: String,
    pub category: String,
    pub description: String,
    pub pub_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFeedItem {
    pub guid: String,
    pub title: String,
    pub link: String,
    pub category: String,
    pub description: String,
    pub pub_date: Option<DateTime<Utc>>,
}
