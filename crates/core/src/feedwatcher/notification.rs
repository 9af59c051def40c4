use chrono::{SecondsFormat, Utc};

use crate::feed::FeedEntry;
use crate::notify::{Embed, WebhookMessage};
use crate::store::SubscriptionDetail;

const USERNAME: &str = "Bookwarden";
const EMBED_AUTHOR: &str = "Feed Watcher";
const GRABBED_COLOR: u32 = 16761392;
const MAX_DESCRIPTION_CHARS: usize = 1000;

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max - 3).collect();
    truncated.push_str("...");
    truncated
}

/// Announce that `entry` was handed to the torrent client for `subscription`.
pub fn grabbed_notification(entry: &FeedEntry, subscription: &SubscriptionDetail) -> WebhookMessage {
    let embed = Embed::new(entry.title.clone())
        .with_author(EMBED_AUTHOR)
        .with_url(entry.link.clone())
        .with_description("Book Grabbed")
        .with_color(GRABBED_COLOR)
        .with_timestamp(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true))
        .field("Category", entry.category.clone(), false)
        .field("Series", entry.series.join(", "), false)
        .field("Authors", entry.authors.join(", "), false)
        .field("Narrators", entry.narrators.join(", "), false)
        .field("Tags", entry.tags.clone(), false)
        .field("Subscribed Author", subscription.author.name.clone(), true)
        .field("Subscription Scope", subscription.scope.name.clone(), true)
        .field(
            "Description",
            truncate(&entry.description, MAX_DESCRIPTION_CHARS),
            false,
        );

    WebhookMessage::new(USERNAME).with_embed(embed)
}
