//! qBittorrent Web API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::QbitConfig;
use crate::metrics::EXTERNAL_REQUESTS;

use super::{AddTorrentOptions, TorrentClient, TorrentClientError, TorrentFile, TorrentInfo};

/// qBittorrent client implementation.
pub struct QBittorrentClient {
    client: Client,
    config: QbitConfig,
    /// Set once logged in; the session cookie itself lives in the cookie jar.
    session: Arc<RwLock<Option<String>>>,
}

impl QBittorrentClient {
    pub fn new(config: QbitConfig) -> Result<Self, TorrentClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .cookie_store(true)
            .build()
            .map_err(|e| TorrentClientError::Internal(e.to_string()))?;

        Ok(Self {
            client,
            config,
            session: Arc::new(RwLock::new(None)),
        })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    async fn login(&self) -> Result<(), TorrentClientError> {
        let url = format!("{}/api/v2/auth/login", self.base_url());

        let params = [
            ("username", self.config.username.as_str()),
            ("password", self.config.password.as_str()),
        ];

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if body.contains("Ok.") {
            debug!("qBittorrent login successful");
            let mut session = self.session.write().await;
            *session = Some("authenticated".to_string());
            Ok(())
        } else if body.contains("Fails.") || status == StatusCode::FORBIDDEN {
            Err(TorrentClientError::AuthenticationFailed(
                "Invalid credentials".to_string(),
            ))
        } else {
            Err(TorrentClientError::AuthenticationFailed(format!(
                "Unexpected response: {}",
                body.chars().take(100).collect::<String>()
            )))
        }
    }

    async fn ensure_authenticated(&self) -> Result<(), TorrentClientError> {
        let session = self.session.read().await;
        if session.is_some() {
            return Ok(());
        }
        drop(session);
        self.login().await
    }

    /// Send an authenticated request built by `build`, logging in again once on 403.
    async fn send<F>(&self, operation: &str, build: F) -> Result<String, TorrentClientError>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        let result = self.send_inner(&build).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        EXTERNAL_REQUESTS
            .with_label_values(&["qbittorrent", operation, status])
            .inc();
        result
    }

    async fn send_inner<F>(&self, build: &F) -> Result<String, TorrentClientError>
    where
        F: Fn(&Client, &str) -> RequestBuilder,
    {
        self.ensure_authenticated().await?;

        let base = self.base_url();
        let mut response = build(&self.client, base)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        if response.status() == StatusCode::FORBIDDEN {
            warn!("qBittorrent session expired, re-authenticating");
            {
                let mut session = self.session.write().await;
                *session = None;
            }
            self.login().await?;

            response = build(&self.client, base)
                .send()
                .await
                .map_err(map_reqwest_error)?;
        }

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(TorrentClientError::TorrentNotFound(
                response.url().path().to_string(),
            ));
        }
        if !status.is_success() {
            return Err(TorrentClientError::ApiError(format!("HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| TorrentClientError::ApiError(e.to_string()))
    }
}

fn map_reqwest_error(e: reqwest::Error) -> TorrentClientError {
    if e.is_timeout() {
        TorrentClientError::Timeout
    } else if e.is_connect() {
        TorrentClientError::ConnectionFailed(e.to_string())
    } else {
        TorrentClientError::ApiError(e.to_string())
    }
}

/// Entry of `/api/v2/torrents/info`.
#[derive(Debug, Deserialize)]
struct QBTorrentInfo {
    hash: String,
    name: String,
    #[serde(default)]
    tags: String,
    #[serde(default)]
    save_path: String,
    #[serde(default)]
    category: String,
}

impl QBTorrentInfo {
    fn into_torrent_info(self) -> TorrentInfo {
        TorrentInfo {
            hash: self.hash.to_lowercase(),
            name: self.name,
            tags: self.tags,
            save_path: self.save_path,
            category: self.category,
        }
    }
}

/// Entry of `/api/v2/torrents/files`.
#[derive(Debug, Deserialize)]
struct QBTorrentFile {
    name: String,
}

#[async_trait]
impl TorrentClient for QBittorrentClient {
    fn name(&self) -> &str {
        "qbittorrent"
    }

    async fn list_by_category(
        &self,
        category: &str,
    ) -> Result<Vec<TorrentInfo>, TorrentClientError> {
        let endpoint = format!(
            "/api/v2/torrents/info?category={}",
            urlencoding::encode(category)
        );
        let body = self
            .send("list", |client, base| client.get(format!("{}{}", base, endpoint)))
            .await?;

        let torrents: Vec<QBTorrentInfo> = serde_json::from_str(&body).map_err(|e| {
            TorrentClientError::ApiError(format!("Failed to parse response: {}", e))
        })?;

        Ok(torrents
            .into_iter()
            .map(QBTorrentInfo::into_torrent_info)
            .collect())
    }

    async fn add_from_url(
        &self,
        url: &str,
        options: &AddTorrentOptions,
    ) -> Result<(), TorrentClientError> {
        let params = options.to_params();
        let body = self
            .send("add", |client, base| {
                let mut form = multipart::Form::new().text("urls", url.to_string());
                for (key, value) in &params {
                    form = form.text(*key, value.clone());
                }
                client
                    .post(format!("{}/api/v2/torrents/add", base))
                    .multipart(form)
            })
            .await?;

        if body.contains("Fails.") {
            return Err(TorrentClientError::Rejected(url.to_string()));
        }

        debug!(url = %url, category = ?options.category, "Torrent handed to qBittorrent");
        Ok(())
    }

    async fn add_tags(&self, hashes: &[String], tag: &str) -> Result<(), TorrentClientError> {
        let joined = hashes.join("|");
        self.send("add_tags", |client, base| {
            client
                .post(format!("{}/api/v2/torrents/addTags", base))
                .form(&[("hashes", joined.as_str()), ("tags", tag)])
        })
        .await?;
        Ok(())
    }

    async fn list_files(&self, hash: &str) -> Result<Vec<TorrentFile>, TorrentClientError> {
        let endpoint = format!("/api/v2/torrents/files?hash={}", urlencoding::encode(hash));
        let body = self
            .send("files", |client, base| client.get(format!("{}{}", base, endpoint)))
            .await?;

        let files: Vec<QBTorrentFile> = serde_json::from_str(&body).map_err(|e| {
            TorrentClientError::ApiError(format!("Failed to parse response: {}", e))
        })?;

        Ok(files
            .into_iter()
            .map(|f| TorrentFile { name: f.name })
            .collect())
    }

    async fn version(&self) -> Result<String, TorrentClientError> {
        let body = self
            .send("version", |client, base| {
                client.get(format!("{}/api/v2/app/version", base))
            })
            .await?;
        Ok(body.trim().to_string())
    }
}
