//! Torrent client abstraction.
//!
//! The pipeline only needs four capabilities from the external client: list
//! by category, add from URL, add tags, list files. `QBittorrentClient` is the
//! Web API backend; tests use `testing::MockTorrentClient`.

mod qbittorrent;
mod types;

pub use qbittorrent::QBittorrentClient;
pub use types::*;
