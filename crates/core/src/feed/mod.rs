//! Tracker RSS feeds: fetching, item parsing and torrent downloads.

mod description;
mod tracker;
mod types;

pub use description::{format_description, parse_description};
pub use tracker::{parse_feed, TrackerClient};
pub use types::*;
