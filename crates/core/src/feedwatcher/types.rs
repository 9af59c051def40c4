use serde::Serialize;

use crate::error::RunErrors;

/// What happened to a single feed item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Handed to the torrent client.
    Dispatched,
    /// Already dispatched by this or an earlier run.
    Duplicate,
    /// No subscription for any of the item's authors.
    Unmatched,
}

impl ItemOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemOutcome::Dispatched => "dispatched",
            ItemOutcome::Duplicate => "duplicate",
            ItemOutcome::Unmatched => "unmatched",
        }
    }
}

/// Summary of one feed watcher run.
#[derive(Debug, Default)]
pub struct FeedRunReport {
    pub feeds_processed: usize,
    pub feeds_skipped: usize,
    pub items_seen: usize,
    pub dispatched: usize,
    pub duplicates: usize,
    pub unmatched: usize,
    pub errors: RunErrors,
}

impl FeedRunReport {
    pub(crate) fn record(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Dispatched => self.dispatched += 1,
            ItemOutcome::Duplicate => self.duplicates += 1,
            ItemOutcome::Unmatched => self.unmatched += 1,
        }
    }

    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Split off the aggregated errors, failing if there were any.
    pub fn into_result(self) -> Result<Self, RunErrors> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(self.errors)
        }
    }
}
