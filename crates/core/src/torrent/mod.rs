//! Torrent file codec.
//!
//! Decodes bencoded `.torrent` payloads and recomputes the info hash the way
//! BitTorrent clients do: SHA-1 over the canonically re-encoded `info` dict.

mod info_hash;

pub use info_hash::{extract_info_hash, TorrentParseError};
