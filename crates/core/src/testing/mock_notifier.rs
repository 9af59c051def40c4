//! Mock notifier recording every delivered message.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::notify::{Notifier, NotifierTarget, NotifyError, WebhookMessage};

/// A message handed to the notifier.
#[derive(Debug, Clone)]
pub struct SentNotification {
    pub target: NotifierTarget,
    pub message: WebhookMessage,
}

impl SentNotification {
    /// Title of the first embed, or an empty string.
    pub fn title(&self) -> &str {
        self.message
            .embeds
            .first()
            .map(|e| e.title.as_str())
            .unwrap_or_default()
    }
}

/// Mock implementation of the Notifier trait.
///
/// Failed deliveries are not recorded.
#[derive(Debug)]
pub struct MockNotifier {
    sent: Arc<RwLock<Vec<SentNotification>>>,
    /// If set, every delivery fails with HTTP 500.
    failing: Arc<RwLock<bool>>,
}

impl Default for MockNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MockNotifier {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(RwLock::new(Vec::new())),
            failing: Arc::new(RwLock::new(false)),
        }
    }

    /// Get all delivered notifications.
    pub async fn sent(&self) -> Vec<SentNotification> {
        self.sent.read().await.clone()
    }

    /// Notifications delivered to the target called `name`.
    pub async fn sent_to(&self, name: &str) -> Vec<SentNotification> {
        self.sent
            .read()
            .await
            .iter()
            .filter(|n| n.target.name == name)
            .cloned()
            .collect()
    }

    /// Make every following delivery fail.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }
}

#[async_trait]
impl Notifier for MockNotifier {
    async fn send(
        &self,
        target: &NotifierTarget,
        message: &WebhookMessage,
    ) -> Result<(), NotifyError> {
        if *self.failing.read().await {
            return Err(NotifyError::Status {
                status: 500,
                body: "mock failure".to_string(),
            });
        }

        self.sent.write().await.push(SentNotification {
            target: target.clone(),
            message: message.clone(),
        });
        Ok(())
    }
}
