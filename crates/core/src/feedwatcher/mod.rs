//! Feed watcher: turns tracker RSS items by subscribed authors into torrent-client downloads.
//!
//! For every enabled feed, each item is parsed, matched against the author index,
//! de-duplicated by tracker id, hashed, handed to the torrent client, recorded and
//! announced. Failures are isolated per item and per feed and aggregated for the run.

mod notification;
mod runner;
mod types;

pub use notification::grabbed_notification;
pub use runner::FeedWatcher;
pub use types::{FeedRunReport, ItemOutcome};
