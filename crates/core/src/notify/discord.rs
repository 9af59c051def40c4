//! Discord webhook delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::metrics::EXTERNAL_REQUESTS;

use super::{Notifier, NotifierKind, NotifierTarget, NotifyError, WebhookMessage};

pub struct DiscordNotifier {
    client: Client,
}

impl DiscordNotifier {
    pub fn new(timeout: Duration) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Http(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(
        &self,
        target: &NotifierTarget,
        message: &WebhookMessage,
    ) -> Result<(), NotifyError> {
        match target.kind {
            NotifierKind::Discord => {}
        }

        let result = self
            .client
            .post(&target.url)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifyError::Timeout
                } else {
                    NotifyError::Http(e.to_string())
                }
            });

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                EXTERNAL_REQUESTS
                    .with_label_values(&["discord", "send", "error"])
                    .inc();
                return Err(e);
            }
        };

        let status = response.status();
        if !status.is_success() {
            EXTERNAL_REQUESTS
                .with_label_values(&["discord", "send", "error"])
                .inc();
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        EXTERNAL_REQUESTS
            .with_label_values(&["discord", "send", "ok"])
            .inc();
        debug!(notifier = %target.name, status = %status, "Webhook accepted");
        Ok(())
    }
}
