//! Import of completed torrents into book libraries.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::ImporterConfig;
use crate::context::RunContext;
use crate::error::PipelineError;
use crate::metrics::{FILES_COPIED, IMPORTS, UNKNOWN_MEDIA_TYPE};
use crate::notify::{dispatch, Notifier, NotifierDirectory, NotifierTarget};
use crate::paths::PathMapper;
use crate::store::MediaType;
use crate::torrent_client::{TorrentClient, TorrentInfo};

use super::copier::FileCopier;
use super::notification::{imported_notification, manual_intervention_notification};
use super::types::{
    from_importer_config, is_book_file, ImportOutcome, ImportRunReport, ImportTags, ImportType,
    LibraryTarget,
};

const NO_BOOK_FILES: &str = "no book files found";

/// Imports one media type: every configured category is scanned, book files
/// are copied flat into the category's library, and the torrent is tagged.
pub struct BookImporter {
    media_type: MediaType,
    client: Arc<dyn TorrentClient>,
    notifier: Arc<dyn Notifier>,
    paths: PathMapper,
    tags: ImportTags,
    copier: FileCopier,
    libraries: Vec<LibraryTarget>,
    import_types: Vec<ImportType>,
    directory: NotifierDirectory,
}

impl BookImporter {
    pub fn new(
        media_type: MediaType,
        client: Arc<dyn TorrentClient>,
        notifier: Arc<dyn Notifier>,
        paths: PathMapper,
    ) -> Self {
        Self {
            media_type,
            client,
            notifier,
            paths,
            tags: ImportTags::default(),
            copier: FileCopier::new(),
            libraries: Vec::new(),
            import_types: Vec::new(),
            directory: NotifierDirectory::new(),
        }
    }

    /// Take libraries and import types from configuration.
    pub fn configure(mut self, config: &ImporterConfig) -> Self {
        let (libraries, import_types) = from_importer_config(config);
        self.libraries = libraries;
        self.import_types = import_types;
        self
    }

    pub fn with_tags(mut self, tags: ImportTags) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_copier(mut self, copier: FileCopier) -> Self {
        self.copier = copier;
        self
    }

    pub fn with_library(mut self, library: LibraryTarget) -> Self {
        self.libraries.push(library);
        self
    }

    pub fn with_import_type(mut self, import_type: ImportType) -> Self {
        self.import_types.push(import_type);
        self
    }

    /// Notifiers that import types refer to by name.
    pub fn with_directory(mut self, directory: NotifierDirectory) -> Self {
        self.directory = directory;
        self
    }

    pub fn media_type(&self) -> MediaType {
        self.media_type
    }

    pub fn tags(&self) -> &ImportTags {
        &self.tags
    }

    fn library(&self, name: &str) -> Option<&LibraryTarget> {
        self.libraries.iter().find(|l| l.name == name)
    }

    /// Import every pending torrent of every configured import type once.
    pub async fn run(&self, ctx: &RunContext) -> ImportRunReport {
        info!(
            media_type = %self.media_type,
            import_types = self.import_types.len(),
            "Starting importer"
        );
        let mut report = ImportRunReport::default();

        for import_type in &self.import_types {
            let Some(library) = self.library(&import_type.library) else {
                error!(
                    category = %import_type.category,
                    library = %import_type.library,
                    "Import type refers to unknown library"
                );
                report.errors.push(
                    format!("import type '{}'", import_type.category),
                    PipelineError::ImportFailure(format!(
                        "unknown library '{}'",
                        import_type.library
                    )),
                );
                continue;
            };
            let target = self.directory.resolve(import_type.notifier.as_deref());

            let torrents = match ctx
                .guard(self.client.list_by_category(&import_type.category))
                .await
            {
                Ok(torrents) => torrents,
                Err(e) => {
                    warn!(category = %import_type.category, error = %e, "Failed to list torrents");
                    let cancelled = e.is_cancelled();
                    report
                        .errors
                        .push(format!("category '{}'", import_type.category), e);
                    if cancelled {
                        break;
                    }
                    continue;
                }
            };

            let pending: Vec<&TorrentInfo> =
                torrents.iter().filter(|t| self.tags.is_pending(t)).collect();
            debug!(
                category = %import_type.category,
                total = torrents.len(),
                pending = pending.len(),
                "Listed torrents"
            );

            let mut cancelled = false;
            for torrent in pending {
                report.torrents_seen += 1;
                let result = self
                    .import_one(ctx, torrent, library, target.as_ref())
                    .await;
                if record_result(&mut report, torrent, result) {
                    cancelled = true;
                    break;
                }
            }
            if cancelled {
                warn!(media_type = %self.media_type, "Importer cancelled");
                break;
            }
        }

        info!(
            media_type = %self.media_type,
            seen = report.torrents_seen,
            imported = report.imported,
            manual_intervention = report.manual_intervention,
            errors = report.errors.len(),
            "Importer finished"
        );
        report
    }

    /// Import one torrent into `library`.
    ///
    /// Any failure to list, map or copy files tags the torrent for manual
    /// intervention and notifies `target`; that is reported as
    /// [`ImportOutcome::ManualIntervention`]. `Err` is left for cancellation
    /// and for failures to tag.
    pub async fn import_one(
        &self,
        ctx: &RunContext,
        torrent: &TorrentInfo,
        library: &LibraryTarget,
        target: Option<&NotifierTarget>,
    ) -> Result<ImportOutcome, PipelineError> {
        info!(
            hash = %torrent.hash,
            name = %torrent.name,
            library = %library.name,
            "Importing torrent"
        );

        let files = match self.copy_books(ctx, torrent, library).await {
            Ok(files) => files,
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => {
                let reason = match e {
                    PipelineError::ImportFailure(reason) => reason,
                    other => other.to_string(),
                };
                self.mark_manual(ctx, torrent, &reason, target).await?;
                return Ok(ImportOutcome::ManualIntervention { reason });
            }
        };

        ctx.guard(
            self.client
                .add_tags(&[torrent.hash.clone()], &self.tags.imported),
        )
        .await
        .inspect_err(|e| {
            error!(hash = %torrent.hash, error = %e, "Failed to tag torrent as imported");
        })?;

        IMPORTS
            .with_label_values(&[self.media_type.as_str(), "imported"])
            .inc();
        FILES_COPIED
            .with_label_values(&[self.media_type.as_str()])
            .inc_by(files.len() as u64);
        info!(
            hash = %torrent.hash,
            files = files.len(),
            destination = %library.path.display(),
            "Imported torrent"
        );

        let message = imported_notification(self.media_type, torrent, &files, &library.path);
        dispatch(ctx, self.notifier.as_ref(), target, &message).await;

        Ok(ImportOutcome::Imported { files })
    }

    /// Copy every book file of the torrent, returning the copied base names.
    async fn copy_books(
        &self,
        ctx: &RunContext,
        torrent: &TorrentInfo,
        library: &LibraryTarget,
    ) -> Result<Vec<String>, PipelineError> {
        let files = ctx.guard(self.client.list_files(&torrent.hash)).await?;

        let mut sources = Vec::new();
        for file in files.iter().filter(|f| is_book_file(self.media_type, &f.name)) {
            sources.push(self.paths.to_local(&torrent.save_path, &file.name)?);
        }
        if sources.is_empty() {
            debug!(hash = %torrent.hash, files = files.len(), "No book files in torrent");
            return Err(PipelineError::ImportFailure(NO_BOOK_FILES.to_string()));
        }

        let mut copied = Vec::with_capacity(sources.len());
        for source in &sources {
            let destination = ctx
                .guard(self.copier.copy_into(source, &library.path))
                .await?;
            let name = destination
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            copied.push(name);
        }
        Ok(copied)
    }

    /// Tag the torrent for manual intervention and notify `target`.
    pub(crate) async fn mark_manual(
        &self,
        ctx: &RunContext,
        torrent: &TorrentInfo,
        reason: &str,
        target: Option<&NotifierTarget>,
    ) -> Result<(), PipelineError> {
        self.flag_manual(ctx, torrent, reason, target, self.media_type.as_str())
            .await
    }

    /// Tag a torrent whose media type could not be determined. Nobody is notified.
    pub(crate) async fn mark_unrouted(
        &self,
        ctx: &RunContext,
        torrent: &TorrentInfo,
        reason: &str,
    ) -> Result<(), PipelineError> {
        self.flag_manual(ctx, torrent, reason, None, UNKNOWN_MEDIA_TYPE)
            .await
    }

    async fn flag_manual(
        &self,
        ctx: &RunContext,
        torrent: &TorrentInfo,
        reason: &str,
        target: Option<&NotifierTarget>,
        media_label: &str,
    ) -> Result<(), PipelineError> {
        warn!(
            hash = %torrent.hash,
            name = %torrent.name,
            reason = %reason,
            "Torrent needs manual intervention"
        );

        ctx.guard(
            self.client
                .add_tags(&[torrent.hash.clone()], &self.tags.manual_intervention),
        )
        .await
        .inspect_err(|e| {
            error!(
                hash = %torrent.hash,
                error = %e,
                "Failed to tag torrent for manual intervention"
            );
        })?;
        IMPORTS
            .with_label_values(&[media_label, "manual_intervention"])
            .inc();

        let message = manual_intervention_notification(self.media_type, torrent, reason);
        dispatch(ctx, self.notifier.as_ref(), target, &message).await;
        Ok(())
    }
}

/// Fold one torrent's result into the report. Returns true when the run was cancelled.
pub(crate) fn record_result(
    report: &mut ImportRunReport,
    torrent: &TorrentInfo,
    result: Result<ImportOutcome, PipelineError>,
) -> bool {
    let context = format!("torrent {} ({})", torrent.hash, torrent.name);
    match result {
        Ok(ImportOutcome::Imported { .. }) => {
            report.imported += 1;
            false
        }
        Ok(ImportOutcome::ManualIntervention { reason }) => {
            report.manual_intervention += 1;
            report
                .errors
                .push(context, PipelineError::ImportFailure(reason));
            false
        }
        Err(e) => {
            let cancelled = e.is_cancelled();
            report.errors.push(context, e);
            cancelled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::NotifierKind;
    use crate::testing::{fixtures, MockNotifier, MockTorrentClient};
    use crate::torrent_client::{TorrentClientError, TorrentFile};
    use tempfile::TempDir;

    struct Harness {
        temp: TempDir,
        client: Arc<MockTorrentClient>,
        notifier: Arc<MockNotifier>,
        importer: BookImporter,
    }

    fn harness(media_type: MediaType) -> Harness {
        let temp = TempDir::new().unwrap();
        let client = Arc::new(MockTorrentClient::new());
        let notifier = Arc::new(MockNotifier::new());
        let mut directory = NotifierDirectory::new();
        directory.insert(NotifierTarget {
            name: "books".to_string(),
            kind: NotifierKind::Discord,
            url: "https://hook/books".to_string(),
        });

        let importer = BookImporter::new(
            media_type,
            client.clone(),
            notifier.clone(),
            PathMapper::new("/downloads", temp.path().join("downloads")),
        )
        .with_library(LibraryTarget::new("main", temp.path().join("library")))
        .with_import_type(ImportType::new("books", "main").with_notifier("books"))
        .with_directory(directory);

        Harness {
            temp,
            client,
            notifier,
            importer,
        }
    }

    fn write_download(temp: &TempDir, relative: &str) {
        let path = temp.path().join("downloads").join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, relative.as_bytes()).unwrap();
    }

    #[tokio::test]
    async fn test_imports_book_files_only() {
        let h = harness(MediaType::Ebook);
        write_download(&h.temp, "Book/book.epub");
        write_download(&h.temp, "Book/cover.jpg");
        h.client
            .add_torrent(fixtures::torrent_info("abc", "books", "/downloads/Book"))
            .await;
        h.client
            .set_files(
                "abc",
                vec![TorrentFile::new("book.epub"), TorrentFile::new("cover.jpg")],
            )
            .await;

        let report = h.importer.run(&RunContext::detached()).await;

        assert!(report.is_success(), "{}", report.errors);
        assert_eq!(report.imported, 1);
        assert!(h.temp.path().join("library/book.epub").exists());
        assert!(!h.temp.path().join("library/cover.jpg").exists());
        assert!(h.client.torrent("abc").await.unwrap().has_tag("imported"));

        let sent = h.notifier.sent_to("books").await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].title(), "New Book(s) Imported");
    }

    #[tokio::test]
    async fn test_no_book_files_goes_to_manual_intervention() {
        let h = harness(MediaType::Audiobook);
        h.client
            .add_torrent(fixtures::torrent_info("abc", "books", "/downloads/Book"))
            .await;
        h.client
            .set_files("abc", vec![TorrentFile::new("book.epub")])
            .await;

        let report = h.importer.run(&RunContext::detached()).await;

        assert_eq!(report.manual_intervention, 1);
        assert_eq!(report.errors.len(), 1);
        let torrent = h.client.torrent("abc").await.unwrap();
        assert!(torrent.has_tag("manual-intervention"));
        assert!(!torrent.has_tag("imported"));

        let sent = h.notifier.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(
            sent[0].message.embeds[0].field_value("Reason"),
            Some("no book files found")
        );
    }

    #[tokio::test]
    async fn test_tagged_torrents_are_skipped() {
        let h = harness(MediaType::Ebook);
        let mut imported = fixtures::torrent_info("a", "books", "/downloads/A");
        imported.tags = "imported".to_string();
        let mut manual = fixtures::torrent_info("b", "books", "/downloads/B");
        manual.tags = "seeding,manual-intervention".to_string();
        h.client.add_torrent(imported).await;
        h.client.add_torrent(manual).await;

        let report = h.importer.run(&RunContext::detached()).await;

        assert_eq!(report.torrents_seen, 0);
        assert!(h.client.taggings().await.is_empty());
        assert!(h.notifier.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_path_escape_goes_to_manual_intervention() {
        let h = harness(MediaType::Ebook);
        h.client
            .add_torrent(fixtures::torrent_info("abc", "books", "/downloads/Book"))
            .await;
        h.client
            .set_files("abc", vec![TorrentFile::new("../../etc/evil.epub")])
            .await;

        let report = h.importer.run(&RunContext::detached()).await;

        assert_eq!(report.manual_intervention, 1);
        assert!(h
            .client
            .torrent("abc")
            .await
            .unwrap()
            .has_tag("manual-intervention"));
    }

    #[tokio::test]
    async fn test_missing_source_file_goes_to_manual_intervention() {
        let h = harness(MediaType::Ebook);
        h.client
            .add_torrent(fixtures::torrent_info("abc", "books", "/downloads/Book"))
            .await;
        h.client
            .set_files("abc", vec![TorrentFile::new("gone.epub")])
            .await;

        let report = h.importer.run(&RunContext::detached()).await;

        assert_eq!(report.manual_intervention, 1);
        assert_eq!(report.imported, 0);
    }

    #[tokio::test]
    async fn test_unknown_library_does_not_stop_other_types() {
        let h = harness(MediaType::Ebook);
        let importer = h
            .importer
            .with_import_type(ImportType::new("other", "nowhere"));

        let report = importer.run(&RunContext::detached()).await;

        assert_eq!(report.errors.len(), 1);
        assert!(report.errors.failures()[0].context.contains("other"));
    }

    #[tokio::test]
    async fn test_list_failure_is_reported() {
        let h = harness(MediaType::Ebook);
        h.client
            .set_next_error(TorrentClientError::ConnectionFailed("refused".into()))
            .await;

        let report = h.importer.run(&RunContext::detached()).await;

        assert_eq!(report.errors.len(), 1);
        assert!(matches!(
            report.errors.failures()[0].error,
            PipelineError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn test_notifier_failure_does_not_fail_import() {
        let h = harness(MediaType::Ebook);
        write_download(&h.temp, "Book/book.epub");
        h.client
            .add_torrent(fixtures::torrent_info("abc", "books", "/downloads/Book"))
            .await;
        h.client
            .set_files("abc", vec![TorrentFile::new("book.epub")])
            .await;
        h.notifier.set_failing(true).await;

        let report = h.importer.run(&RunContext::detached()).await;

        assert!(report.is_success());
        assert_eq!(report.imported, 1);
    }
}
