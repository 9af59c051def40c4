//! HTTP access to the tracker, optionally through forward proxies.

use std::time::Duration;

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::{Client, Proxy};
use tracing::debug;

use crate::config::BookSearchConfig;
use crate::metrics::EXTERNAL_REQUESTS;

use super::{FeedError, FeedSource, RawFeedItem, TorrentFetcher};

const USER_AGENT: &str = concat!("bookwarden/", env!("CARGO_PKG_VERSION"));

/// Tracker HTTP client for RSS feeds and `.torrent` downloads.
pub struct TrackerClient {
    client: Client,
}

impl TrackerClient {
    pub fn new(config: &BookSearchConfig) -> Result<Self, FeedError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .user_agent(USER_AGENT);

        if let Some(proxy) = config.http_proxy.as_deref().filter(|p| !p.is_empty()) {
            builder = builder.proxy(
                Proxy::http(proxy_url(proxy)).map_err(|e| FeedError::Client(e.to_string()))?,
            );
        }
        if let Some(proxy) = config.https_proxy.as_deref().filter(|p| !p.is_empty()) {
            builder = builder.proxy(
                Proxy::https(proxy_url(proxy)).map_err(|e| FeedError::Client(e.to_string()))?,
            );
        }

        let client = builder
            .build()
            .map_err(|e| FeedError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    async fn get_bytes(&self, operation: &str, url: &str) -> Result<Vec<u8>, FeedError> {
        let result = self.get_bytes_inner(url).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        EXTERNAL_REQUESTS
            .with_label_values(&["tracker", operation, status])
            .inc();
        result
    }

    async fn get_bytes_inner(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        let response = self.client.get(url).send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(map_reqwest_error)?;
        debug!(url = url, bytes = bytes.len(), "Fetched");
        Ok(bytes.to_vec())
    }
}

/// Proxies are commonly configured as bare `host:port`.
fn proxy_url(proxy: &str) -> String {
    if proxy.contains("://") {
        proxy.to_string()
    } else {
        format!("http://{}", proxy)
    }
}

fn map_reqwest_error(e: reqwest::Error) -> FeedError {
    if e.is_timeout() {
        FeedError::Timeout
    } else {
        FeedError::Http(e.to_string())
    }
}

/// Parse an RSS or Atom document into raw items, keeping feed order.
pub fn parse_feed(bytes: &[u8]) -> Result<Vec<RawFeedItem>, FeedError> {
    let feed = parser::parse(bytes).map_err(|e| FeedError::Parse(e.to_string()))?;

    Ok(feed
        .entries
        .into_iter()
        .map(|entry| RawFeedItem {
            guid: entry.id,
            link: entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_default(),
            title: entry.title.map(|t| t.content).unwrap_or_default(),
            published_at: entry.published,
            description: entry.summary.map(|s| s.content).unwrap_or_default(),
        })
        .collect())
}

#[async_trait]
impl FeedSource for TrackerClient {
    async fn fetch_feed(&self, url: &str) -> Result<Vec<RawFeedItem>, FeedError> {
        let bytes = self.get_bytes("fetch_feed", url).await?;
        parse_feed(&bytes)
    }
}

#[async_trait]
impl TorrentFetcher for TrackerClient {
    async fn fetch_torrent(&self, url: &str) -> Result<Vec<u8>, FeedError> {
        self.get_bytes("fetch_torrent", url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use httpmock::prelude::*;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Tracker</title>
    <link>https://tracker</link>
    <description>New uploads</description>
    <item>
      <title>The Way of Kings</title>
      <link>https://tracker/dl/1006.torrent</link>
      <guid>https://tracker/t/1006</guid>
      <pubDate>Fri, 01 Mar 2024 12:00:00 GMT</pubDate>
      <description>Author(s): Brandon Sanderson&lt;br/&gt;Category: Audiobooks - Fantasy</description>
    </item>
    <item>
      <title>Second</title>
      <link>https://tracker/dl/1007.torrent</link>
      <guid>https://tracker/t/1007</guid>
      <description>Author(s): Someone Else</description>
    </item>
  </channel>
</rss>"#;

    fn config() -> BookSearchConfig {
        BookSearchConfig {
            timeout_secs: 5,
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_feed_items() {
        let items = parse_feed(RSS.as_bytes()).unwrap();
        assert_eq!(items.len(), 2);

        let first = &items[0];
        assert_eq!(first.guid, "https://tracker/t/1006");
        assert_eq!(first.link, "https://tracker/dl/1006.torrent");
        assert_eq!(first.title, "The Way of Kings");
        assert_eq!(
            first.published_at,
            Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
        );
        assert_eq!(
            first.description,
            "Author(s): Brandon Sanderson<br/>Category: Audiobooks - Fantasy"
        );

        assert_eq!(items[1].guid, "https://tracker/t/1007");
        assert!(items[1].published_at.is_none());
    }

    #[test]
    fn test_parse_feed_rejects_garbage() {
        assert!(matches!(
            parse_feed(b"definitely not xml"),
            Err(FeedError::Parse(_))
        ));
    }

    #[test]
    fn test_proxy_url_adds_scheme() {
        assert_eq!(proxy_url("proxy:3128"), "http://proxy:3128");
        assert_eq!(proxy_url("socks5://proxy:1080"), "socks5://proxy:1080");
    }

    #[test]
    fn test_new_with_proxies() {
        let config = BookSearchConfig {
            http_proxy: Some("proxy:3128".to_string()),
            https_proxy: Some("proxy:3129".to_string()),
            ..Default::default()
        };
        assert!(TrackerClient::new(&config).is_ok());
    }

    #[tokio::test]
    async fn test_fetch_feed() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/rss");
                then.status(200)
                    .header("content-type", "application/rss+xml")
                    .body(RSS);
            })
            .await;

        let client = TrackerClient::new(&config()).unwrap();
        let items = client.fetch_feed(&server.url("/rss")).await.unwrap();

        mock.assert_async().await;
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_torrent_non_success_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/dl/1.torrent");
                then.status(403).body("forbidden");
            })
            .await;

        let client = TrackerClient::new(&config()).unwrap();
        let result = client.fetch_torrent(&server.url("/dl/1.torrent")).await;

        assert!(matches!(result, Err(FeedError::Status { status: 403, .. })));
    }

    #[tokio::test]
    async fn test_fetch_torrent_bytes() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/dl/2.torrent");
                then.status(200).body("d4:infod4:name1:xee");
            })
            .await;

        let client = TrackerClient::new(&config()).unwrap();
        let bytes = client
            .fetch_torrent(&server.url("/dl/2.torrent"))
            .await
            .unwrap();

        assert_eq!(bytes, b"d4:infod4:name1:xee");
    }
}
