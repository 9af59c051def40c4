//! Persistence for feeds, authors, subscriptions, routing tables and the
//! legacy filter plane.

mod sqlite;
mod traits;
mod types;

pub use sqlite::SqliteStore;
pub use traits::{CatalogStore, FeedStore, FilterStore, Store, StoreError, SubscriptionStore};
pub use types::*;
