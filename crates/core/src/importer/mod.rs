//! Post-download importers.
//!
//! A [`BookImporter`] scans the torrent client for pending torrents in its
//! configured categories, copies book files flat into a library and records
//! progress with the `imported` and `manual-intervention` tags. The
//! [`AuthorSubscriptionImporter`] routes torrents dispatched by the feed
//! watcher through the subscription recorded for their hash.

mod author_subscriptions;
mod book_importer;
mod copier;
mod notification;
mod types;

pub use author_subscriptions::{AuthorSubscriptionImporter, DEFAULT_CATEGORY};
pub use book_importer::BookImporter;
pub use copier::{CopyError, FileCopier};
pub use notification::{imported_notification, manual_intervention_notification};
pub use types::{
    book_extensions, is_book_file, ImportOutcome, ImportRunReport, ImportTags, ImportType,
    LibraryTarget,
};
