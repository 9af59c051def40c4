use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::notify::NotifierKind;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub qbit: QbitConfig,
    #[serde(default)]
    pub book_search: BookSearchConfig,
    #[serde(default)]
    pub importers: ImportersConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("bookwarden.db")
}

/// qBittorrent Web API connection and the download mount it writes to.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QbitConfig {
    /// Base URL (e.g., "http://localhost:8080")
    pub url: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Save path prefix as the client sees it.
    #[serde(default)]
    pub download_path: String,
    /// Where the same storage is mounted locally.
    #[serde(default)]
    pub local_download_path: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_qbit_timeout")]
    pub timeout_secs: u32,
}

fn default_qbit_timeout() -> u32 {
    30
}

/// Tracker access used for feed and torrent file fetches.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BookSearchConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub search_endpoint: String,
    #[serde(default)]
    pub api_key: String,
    /// Proxy for plain HTTP requests. A bare `host:port` is accepted.
    #[serde(default)]
    pub http_proxy: Option<String>,
    /// Proxy for HTTPS requests. A bare `host:port` is accepted.
    #[serde(default)]
    pub https_proxy: Option<String>,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u32,
}

impl Default for BookSearchConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            search_endpoint: String::new(),
            api_key: String::new(),
            http_proxy: None,
            https_proxy: None,
            timeout_secs: default_http_timeout(),
        }
    }
}

fn default_http_timeout() -> u32 {
    15
}

/// Settings shared by the ebook, audiobook and author-subscription importers.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImportersConfig {
    #[serde(default = "default_imported_tag")]
    pub imported_tag: String,
    #[serde(default = "default_manual_intervention_tag")]
    pub manual_intervention_tag: String,
    #[serde(default = "default_author_subscription_category")]
    pub author_subscription_category: String,
    /// Compare SHA-256 of source and destination after each copy.
    #[serde(default)]
    pub verify_checksums: bool,
    #[serde(default)]
    pub ebook: ImporterConfig,
    #[serde(default)]
    pub audiobook: ImporterConfig,
}

impl Default for ImportersConfig {
    fn default() -> Self {
        Self {
            imported_tag: default_imported_tag(),
            manual_intervention_tag: default_manual_intervention_tag(),
            author_subscription_category: default_author_subscription_category(),
            verify_checksums: false,
            ebook: ImporterConfig::default(),
            audiobook: ImporterConfig::default(),
        }
    }
}

fn default_imported_tag() -> String {
    "imported".to_string()
}

fn default_manual_intervention_tag() -> String {
    "manual-intervention".to_string()
}

fn default_author_subscription_category() -> String {
    "author-subscriptions".to_string()
}

/// Libraries and category routes for one media type.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImporterConfig {
    #[serde(default)]
    pub libraries: Vec<LibraryConfig>,
    #[serde(default)]
    pub import_types: Vec<ImportTypeConfig>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LibraryConfig {
    pub name: String,
    pub path: PathBuf,
}

/// Route completed torrents of `category` into `library`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImportTypeConfig {
    pub category: String,
    /// Name of a library of the same media type.
    pub library: String,
    #[serde(default)]
    pub notifier: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub notifiers: Vec<NotifierConfig>,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u32,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            notifiers: Vec::new(),
            timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NotifierConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NotifierKind,
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    None,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_filter(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::None => "off",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Write the registry here after each run (node-exporter textfile collector).
    #[serde(default)]
    pub textfile_path: Option<PathBuf>,
}

/// Sanitized config for display (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub database: DatabaseConfig,
    pub qbit: SanitizedQbitConfig,
    pub book_search: SanitizedBookSearchConfig,
    pub importers: ImportersConfig,
    pub notifications: SanitizedNotificationsConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

/// Sanitized qBittorrent config (password hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedQbitConfig {
    pub url: String,
    pub username: String,
    pub password_configured: bool,
    pub download_path: String,
    pub local_download_path: String,
    pub timeout_secs: u32,
}

/// Sanitized tracker config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedBookSearchConfig {
    pub base_url: String,
    pub search_endpoint: String,
    pub api_key_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub https_proxy: Option<String>,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedNotificationsConfig {
    pub notifiers: Vec<SanitizedNotifierConfig>,
    pub timeout_secs: u32,
}

/// Webhook URLs embed their token, so only presence is shown.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedNotifierConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NotifierKind,
    pub url_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            database: config.database.clone(),
            qbit: SanitizedQbitConfig {
                url: config.qbit.url.clone(),
                username: config.qbit.username.clone(),
                password_configured: !config.qbit.password.is_empty(),
                download_path: config.qbit.download_path.clone(),
                local_download_path: config.qbit.local_download_path.clone(),
                timeout_secs: config.qbit.timeout_secs,
            },
            book_search: SanitizedBookSearchConfig {
                base_url: config.book_search.base_url.clone(),
                search_endpoint: config.book_search.search_endpoint.clone(),
                api_key_configured: !config.book_search.api_key.is_empty(),
                http_proxy: config.book_search.http_proxy.clone(),
                https_proxy: config.book_search.https_proxy.clone(),
                timeout_secs: config.book_search.timeout_secs,
            },
            importers: config.importers.clone(),
            notifications: SanitizedNotificationsConfig {
                notifiers: config
                    .notifications
                    .notifiers
                    .iter()
                    .map(|n| SanitizedNotifierConfig {
                        name: n.name.clone(),
                        kind: n.kind,
                        url_configured: !n.url.is_empty(),
                    })
                    .collect(),
                timeout_secs: config.notifications.timeout_secs,
            },
            logging: config.logging.clone(),
            metrics: config.metrics.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[qbit]
url = "http://qbittorrent:8080"
"#;

    #[test]
    fn test_deserialize_minimal_config_uses_defaults() {
        let config: Config = toml::from_str(MINIMAL).unwrap();
        assert_eq!(config.qbit.url, "http://qbittorrent:8080");
        assert_eq!(config.qbit.timeout_secs, 30);
        assert_eq!(config.database.path.to_str().unwrap(), "bookwarden.db");
        assert_eq!(config.book_search.timeout_secs, 15);
        assert_eq!(config.importers.imported_tag, "imported");
        assert_eq!(config.importers.manual_intervention_tag, "manual-intervention");
        assert_eq!(
            config.importers.author_subscription_category,
            "author-subscriptions"
        );
        assert!(!config.importers.verify_checksums);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.metrics.textfile_path.is_none());
    }

    #[test]
    fn test_deserialize_missing_qbit_fails() {
        let toml = r#"
[database]
path = "x.db"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_importers_and_notifiers() {
        let toml = r#"
[qbit]
url = "http://qbittorrent:8080"

[[importers.ebook.libraries]]
name = "books"
path = "/library/books"

[[importers.ebook.import_types]]
category = "books"
library = "books"
notifier = "discord-books"

[[importers.audiobook.import_types]]
category = "audiobooks"
library = "audio"

[[notifications.notifiers]]
name = "discord-books"
type = "discord"
url = "https://discord.com/api/webhooks/1/abc"

[logging]
level = "none"
format = "json"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let ebook = &config.importers.ebook;
        assert_eq!(ebook.libraries[0].path, PathBuf::from("/library/books"));
        assert_eq!(ebook.import_types[0].notifier.as_deref(), Some("discord-books"));
        assert!(config.importers.audiobook.import_types[0].notifier.is_none());
        assert_eq!(config.notifications.notifiers[0].kind, NotifierKind::Discord);
        assert_eq!(config.logging.level.as_filter(), "off");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_notifier_type_fails() {
        let toml = r#"
[qbit]
url = "http://qbittorrent:8080"

[[notifications.notifiers]]
name = "mail"
type = "smtp"
url = "smtp://x"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let toml = r#"
[qbit]
url = "http://qbittorrent:8080"
username = "admin"
password = "hunter2"

[book_search]
api_key = "tracker-key"
https_proxy = "proxy:3128"

[[notifications.notifiers]]
name = "discord-books"
type = "discord"
url = "https://discord.com/api/webhooks/1/secret-token"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);

        assert!(sanitized.qbit.password_configured);
        assert!(sanitized.book_search.api_key_configured);
        assert_eq!(sanitized.book_search.https_proxy.as_deref(), Some("proxy:3128"));
        assert!(sanitized.notifications.notifiers[0].url_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(!json.contains("tracker-key"));
        assert!(!json.contains("secret-token"));
    }
}
