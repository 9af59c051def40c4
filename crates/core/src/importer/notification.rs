use std::path::Path;

use chrono::{SecondsFormat, Utc};

use crate::notify::{Embed, WebhookMessage};
use crate::store::MediaType;
use crate::torrent_client::TorrentInfo;

const USERNAME: &str = "Bookwarden";
const MANUAL_COLOR: u32 = 0xFFA500;
const IMPORTED_COLOR: u32 = 0x00FF00;

fn embed_author(media_type: MediaType) -> &'static str {
    match media_type {
        MediaType::Ebook => "Ebook Importer",
        MediaType::Audiobook => "Audiobook Importer",
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// A torrent needs a human to look at it.
pub fn manual_intervention_notification(
    media_type: MediaType,
    torrent: &TorrentInfo,
    reason: &str,
) -> WebhookMessage {
    let embed = Embed::new("Manual Intervention Required")
        .with_author(embed_author(media_type))
        .with_description(torrent.name.clone())
        .with_color(MANUAL_COLOR)
        .with_timestamp(now())
        .field("Reason", reason, false)
        .field("Torrent Hash", torrent.hash.clone(), true)
        .field("Category", torrent.category.clone(), true);

    WebhookMessage::new(USERNAME).with_embed(embed)
}

/// Files of `torrent` were copied into `destination`.
pub fn imported_notification(
    media_type: MediaType,
    torrent: &TorrentInfo,
    files: &[String],
    destination: &Path,
) -> WebhookMessage {
    let title = match media_type {
        MediaType::Ebook => "New Book(s) Imported",
        MediaType::Audiobook => "New Audiobook(s) Imported",
    };
    let listing = files
        .iter()
        .map(|f| format!("• {}", f))
        .collect::<Vec<_>>()
        .join("\n");

    let embed = Embed::new(title)
        .with_author(embed_author(media_type))
        .with_description(torrent.name.clone())
        .with_color(IMPORTED_COLOR)
        .with_timestamp(now())
        .field("Files", listing, false)
        .field("Category", torrent.category.clone(), true)
        .field("Destination", destination.display().to_string(), true);

    WebhookMessage::new(USERNAME).with_embed(embed)
}
