//! Name-based lookup of notification targets.

use std::collections::HashMap;

use tracing::warn;

use crate::config::NotifierConfig;
use crate::store::{CatalogStore, StoreError};

use super::NotifierTarget;

/// Notifiers addressable by name, from configuration and the store.
#[derive(Debug, Clone, Default)]
pub struct NotifierDirectory {
    targets: HashMap<String, NotifierTarget>,
}

impl NotifierDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(notifiers: &[NotifierConfig]) -> Self {
        let mut directory = Self::new();
        for notifier in notifiers {
            directory.insert(NotifierTarget {
                name: notifier.name.clone(),
                kind: notifier.kind,
                url: notifier.url.clone(),
            });
        }
        directory
    }

    /// Add the store's notifier rows. Configured notifiers take precedence.
    pub fn extend_from_store<S>(&mut self, store: &S) -> Result<(), StoreError>
    where
        S: CatalogStore + ?Sized,
    {
        for target in store.list_notifier_targets()? {
            self.targets.entry(target.name.clone()).or_insert(target);
        }
        Ok(())
    }

    pub fn insert(&mut self, target: NotifierTarget) {
        self.targets.insert(target.name.clone(), target);
    }

    pub fn get(&self, name: &str) -> Option<&NotifierTarget> {
        self.targets.get(name)
    }

    /// Resolve an optional notifier name. Unknown names are logged and treated as unset.
    pub fn resolve(&self, name: Option<&str>) -> Option<NotifierTarget> {
        let name = name.map(str::trim).filter(|n| !n.is_empty())?;
        match self.targets.get(name) {
            Some(target) => Some(target.clone()),
            None => {
                warn!(notifier = %name, "Unknown notifier, notifications disabled for this import type");
                None
            }
        }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}
