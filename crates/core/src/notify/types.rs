//! Notification payloads and targets.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request timeout")]
    Timeout,

    #[error("unsupported notifier kind: {0}")]
    Unsupported(String),
}

/// Kind of notification endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifierKind {
    Discord,
}

impl NotifierKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifierKind::Discord => "discord",
        }
    }
}

impl fmt::Display for NotifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotifierKind {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discord" => Ok(NotifierKind::Discord),
            other => Err(NotifyError::Unsupported(other.to_string())),
        }
    }
}

/// An addressable notification endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifierTarget {
    pub name: String,
    pub kind: NotifierKind,
    pub url: String,
}

/// Webhook payload: a username, optional content, and rich embeds.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookMessage {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embeds: Vec<Embed>,
}

impl WebhookMessage {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Default::default()
        }
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embed {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default)]
    pub color: u32,
    /// RFC 3339 timestamp.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<EmbedAuthor>,
}

impl Embed {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = color;
        self
    }

    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = timestamp.into();
        self
    }

    pub fn with_author(mut self, name: impl Into<String>) -> Self {
        self.author = Some(EmbedAuthor { name: name.into() });
        self
    }

    /// Append a field unless its value is empty.
    pub fn field(mut self, name: &str, value: impl Into<String>, inline: bool) -> Self {
        let value = value.into();
        if !value.trim().is_empty() {
            self.fields.push(EmbedField {
                name: name.to_string(),
                value,
                inline,
            });
        }
        self
    }

    pub fn field_value(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedAuthor {
    pub name: String,
}

/// Delivers messages to notification endpoints.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        target: &NotifierTarget,
        message: &WebhookMessage,
    ) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifier_kind_from_str() {
        assert_eq!("discord".parse::<NotifierKind>().unwrap(), NotifierKind::Discord);
        assert_eq!("Discord".parse::<NotifierKind>().unwrap(), NotifierKind::Discord);
        assert!("slack".parse::<NotifierKind>().is_err());
    }

    #[test]
    fn test_empty_fields_are_skipped() {
        let embed = Embed::new("Book Grabbed")
            .field("Series", "", false)
            .field("Authors", "Jane Doe", false)
            .field("Tags", "   ", true);
        assert_eq!(embed.fields.len(), 1);
        assert_eq!(embed.field_value("Authors"), Some("Jane Doe"));
    }

    #[test]
    fn test_message_serialization_shape() {
        let message = WebhookMessage::new("Bookwarden").with_embed(
            Embed::new("Title")
                .with_url("https://tracker/t/1")
                .with_color(0x00FF00)
                .with_author("Feed Watcher")
                .field("Category", "Ebooks", true),
        );

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["username"], "Bookwarden");
        assert!(json.get("content").is_none());
        assert_eq!(json["embeds"][0]["title"], "Title");
        assert_eq!(json["embeds"][0]["color"], 0x00FF00);
        assert_eq!(json["embeds"][0]["author"]["name"], "Feed Watcher");
        assert_eq!(json["embeds"][0]["fields"][0]["inline"], true);
        assert!(json["embeds"][0].get("description").is_none());
    }
}
