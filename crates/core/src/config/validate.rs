use std::collections::HashSet;

use super::{types::Config, ConfigError, ImporterConfig};

/// Validate configuration
/// Currently validates:
/// - qbit.url is set
/// - importer tags are set and distinct
/// - library and notifier names are unique
/// - import types reference a library of their own media type
/// - notifiers have a URL
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.qbit.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "qbit.url cannot be empty".to_string(),
        ));
    }

    let importers = &config.importers;
    if importers.imported_tag.trim().is_empty()
        || importers.manual_intervention_tag.trim().is_empty()
    {
        return Err(ConfigError::ValidationError(
            "importers.imported_tag and importers.manual_intervention_tag cannot be empty"
                .to_string(),
        ));
    }
    if importers.imported_tag == importers.manual_intervention_tag {
        return Err(ConfigError::ValidationError(format!(
            "importers.imported_tag and importers.manual_intervention_tag must differ (both '{}')",
            importers.imported_tag
        )));
    }

    validate_importer("ebook", &importers.ebook)?;
    validate_importer("audiobook", &importers.audiobook)?;

    let mut names = HashSet::new();
    for notifier in &config.notifications.notifiers {
        if !names.insert(notifier.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate notifier name '{}'",
                notifier.name
            )));
        }
        if notifier.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "notifier '{}' has no url",
                notifier.name
            )));
        }
    }

    Ok(())
}

fn validate_importer(media: &str, importer: &ImporterConfig) -> Result<(), ConfigError> {
    let mut libraries = HashSet::new();
    for library in &importer.libraries {
        if !libraries.insert(library.name.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "duplicate {} library name '{}'",
                media, library.name
            )));
        }
    }

    for import_type in &importer.import_types {
        if !libraries.contains(import_type.library.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "{} import type '{}' references unknown library '{}'",
                media, import_type.category, import_type.library
            )));
        }
    }

    Ok(())
}
