//! Chat notifications.
//!
//! A [`Notifier`] delivers a [`WebhookMessage`] to a named [`NotifierTarget`].
//! Callers go through [`dispatch`], which treats an unset target as a no-op
//! and never lets a delivery failure escape.

mod directory;
mod discord;
mod types;

pub use directory::NotifierDirectory;
pub use discord::DiscordNotifier;
pub use types::*;

use tracing::{debug, warn};

use crate::context::RunContext;
use crate::metrics::NOTIFICATIONS;

/// Send `message` to `target` if one is set. Failures are logged and swallowed.
pub async fn dispatch(
    ctx: &RunContext,
    notifier: &dyn Notifier,
    target: Option<&NotifierTarget>,
    message: &WebhookMessage,
) {
    let Some(target) = target else {
        debug!("No notifier configured, skipping notification");
        NOTIFICATIONS.with_label_values(&["skipped"]).inc();
        return;
    };

    match ctx.guard(notifier.send(target, message)).await {
        Ok(()) => {
            debug!(notifier = %target.name, "Notification sent");
            NOTIFICATIONS.with_label_values(&["sent"]).inc();
        }
        Err(e) => {
            warn!(notifier = %target.name, error = %e, "Failed to send notification");
            NOTIFICATIONS.with_label_values(&["failed"]).inc();
        }
    }
}
