//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Feed watcher (items seen, torrents dispatched)
//! - Importers (imports by outcome, files copied)
//! - Notifications and external services (qBittorrent, tracker, Discord)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts};

// =============================================================================
// Feed watcher
// =============================================================================

/// Feed items by outcome.
pub static FEED_ITEMS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookwarden_feed_items_total", "Total feed items processed"),
        &["result"], // "dispatched", "duplicate", "unmatched", "failed"
    )
    .unwrap()
});

/// Torrents handed to the torrent client.
pub static TORRENTS_DISPATCHED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookwarden_torrents_dispatched_total",
            "Total torrents added to the torrent client",
        ),
        &["media_type"],
    )
    .unwrap()
});

// =============================================================================
// Importers
// =============================================================================

/// `media_type` label for torrents with no subscription record.
pub const UNKNOWN_MEDIA_TYPE: &str = "unknown";

/// Torrent imports by outcome.
pub static IMPORTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookwarden_imports_total", "Total torrent imports"),
        &["media_type", "result"], // result: "imported", "manual_intervention"
    )
    .unwrap()
});

/// Book files copied into libraries.
pub static FILES_COPIED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookwarden_files_copied_total",
            "Total book files copied into libraries",
        ),
        &["media_type"],
    )
    .unwrap()
});

// =============================================================================
// Notifications and external services
// =============================================================================

/// Notification attempts by status.
pub static NOTIFICATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("bookwarden_notifications_total", "Total notification attempts"),
        &["status"], // "sent", "failed", "skipped"
    )
    .unwrap()
});

/// Requests to external services.
pub static EXTERNAL_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "bookwarden_external_requests_total",
            "Total requests to external services",
        ),
        &["service", "operation", "status"], // status: "ok", "error"
    )
    .unwrap()
});

/// Wall time of one pipeline stage.
pub static RUN_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "bookwarden_run_duration_seconds",
            "Duration of a pipeline run",
        )
        .buckets(vec![0.5, 1.0, 5.0, 15.0, 30.0, 60.0, 300.0, 900.0]),
        &["stage"], // "feedwatch", "import_ebooks", ...
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(FEED_ITEMS.clone()),
        Box::new(TORRENTS_DISPATCHED.clone()),
        Box::new(IMPORTS.clone()),
        Box::new(FILES_COPIED.clone()),
        Box::new(NOTIFICATIONS.clone()),
        Box::new(EXTERNAL_REQUESTS.clone()),
        Box::new(RUN_DURATION.clone()),
    ]
}
