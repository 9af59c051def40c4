//! Importer configuration and outcome types.

use std::path::{Path, PathBuf};

use crate::config::{ImporterConfig, ImportersConfig};
use crate::error::RunErrors;
use crate::store::{Library, MediaType};
use crate::torrent_client::TorrentInfo;

const EBOOK_EXTENSIONS: [&str; 3] = ["epub", "mobi", "azw3"];
const AUDIOBOOK_EXTENSIONS: [&str; 3] = ["m4b", "m4a", "mp3"];

/// File extensions (without the dot) accepted for a media type.
pub fn book_extensions(media_type: MediaType) -> &'static [&'static str] {
    match media_type {
        MediaType::Ebook => &EBOOK_EXTENSIONS,
        MediaType::Audiobook => &AUDIOBOOK_EXTENSIONS,
    }
}

/// Whether `name` ends in one of the media type's extensions, ignoring ASCII case.
pub fn is_book_file(media_type: MediaType, name: &str) -> bool {
    let Some(ext) = Path::new(name).extension().and_then(|e| e.to_str()) else {
        return false;
    };
    book_extensions(media_type)
        .iter()
        .any(|accepted| ext.eq_ignore_ascii_case(accepted))
}

/// A library directory books are copied into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryTarget {
    pub name: String,
    pub path: PathBuf,
}

impl LibraryTarget {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }
}

impl From<&Library> for LibraryTarget {
    fn from(library: &Library) -> Self {
        Self::new(library.name.clone(), library.path.clone())
    }
}

/// A torrent category routed to a library, with an optional notifier name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportType {
    pub category: String,
    pub library: String,
    pub notifier: Option<String>,
}

impl ImportType {
    pub fn new(category: impl Into<String>, library: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            library: library.into(),
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: impl Into<String>) -> Self {
        self.notifier = Some(notifier.into());
        self
    }
}

/// Libraries and import types of one importer, as configured.
pub(crate) fn from_importer_config(config: &ImporterConfig) -> (Vec<LibraryTarget>, Vec<ImportType>) {
    let libraries = config
        .libraries
        .iter()
        .map(|l| LibraryTarget::new(l.name.clone(), l.path.clone()))
        .collect();
    let import_types = config
        .import_types
        .iter()
        .map(|t| ImportType {
            category: t.category.clone(),
            library: t.library.clone(),
            notifier: t.notifier.clone(),
        })
        .collect();
    (libraries, import_types)
}

/// The two sentinel tags recording import progress on the torrent client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTags {
    pub imported: String,
    pub manual_intervention: String,
}

impl Default for ImportTags {
    fn default() -> Self {
        Self {
            imported: "imported".to_string(),
            manual_intervention: "manual-intervention".to_string(),
        }
    }
}

impl ImportTags {
    pub fn from_config(config: &ImportersConfig) -> Self {
        Self {
            imported: config.imported_tag.clone(),
            manual_intervention: config.manual_intervention_tag.clone(),
        }
    }

    /// A torrent is pending when it carries neither sentinel tag.
    pub fn is_pending(&self, torrent: &TorrentInfo) -> bool {
        let tags = torrent.tag_set();
        !tags.contains(&self.imported) && !tags.contains(&self.manual_intervention)
    }
}

/// What happened to one torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Files copied and the torrent tagged imported.
    Imported { files: Vec<String> },
    /// Torrent tagged for manual intervention.
    ManualIntervention { reason: String },
}

/// Summary of one importer run.
#[derive(Debug, Default)]
pub struct ImportRunReport {
    pub torrents_seen: usize,
    pub imported: usize,
    pub manual_intervention: usize,
    pub errors: RunErrors,
}

impl ImportRunReport {
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }

    /// Fold another report into this one.
    pub fn merge(&mut self, other: ImportRunReport) {
        self.torrents_seen += other.torrents_seen;
        self.imported += other.imported;
        self.manual_intervention += other.manual_intervention;
        self.errors.extend(other.errors);
    }

    pub fn into_result(self) -> Result<Self, RunErrors> {
        if self.errors.is_empty() {
            Ok(self)
        } else {
            Err(self.errors)
        }
    }
}
