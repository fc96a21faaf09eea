use crate::embedder::{Embedder, EmbedderError};
use crate::indexer::loader::{LoaderKind, select_loader};
use crate::indexer::splitter::TextSplitter;
use crate::store::models::{NewChunk, SourceIndex};
use crate::store::{StoreError, VectorStore};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("documents directory not found: {0}")]
    MissingDocsDir(String),

    #[error("invalid glob pattern {pattern}: {message}")]
    Pattern { pattern: String, message: String },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Embedding(#[from] EmbedderError),
}

/// A file the add phase could not load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFailure {
    pub path: String,
    pub reason: String,
}

/// What one synchronization pass did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub first_run: bool,
    pub added_files: usize,
    pub added_chunks: usize,
    pub empty_files: Vec<String>,
    pub skipped_files: Vec<String>,
    pub failed_files: Vec<FileFailure>,
    pub removed_sources: usize,
    pub removed_chunks: usize,
}

impl SyncReport {
    /// Whether the pass inserted or deleted anything.
    pub fn changed(&self) -> bool {
        self.added_chunks > 0 || self.removed_chunks > 0
    }

    pub fn log_summary(&self) {
        info!(
            "Sync complete: {} files added ({} chunks), {} sources removed ({} chunks), {} empty, {} skipped, {} failed",
            self.added_files,
            self.added_chunks,
            self.removed_sources,
            self.removed_chunks,
            self.empty_files.len(),
            self.skipped_files.len(),
            self.failed_files.len()
        );
        for failure in &self.failed_files {
            warn!("  failed: {} ({})", failure.path, failure.reason);
        }
    }
}

/// A supported document found in the documents directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    /// Path the loader opens.
    pub path: PathBuf,
    /// Key recorded as the chunks' `source`.
    pub source: String,
}

impl DocumentFile {
    pub fn new(path: PathBuf) -> Self {
        let source = source_key(&path);
        Self { path, source }
    }
}

/// Differences between the documents directory and the store.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SyncPlan {
    /// On disk, not in the store. Listing order.
    pub to_add: Vec<DocumentFile>,
    /// In the store, not on disk. Sorted.
    pub to_delete: Vec<String>,
}

impl SyncPlan {
    pub fn new(current_files: &[DocumentFile], index: &SourceIndex) -> Self {
        let on_disk: HashSet<&str> = current_files.iter().map(|f| f.source.as_str()).collect();

        let to_add = current_files
            .iter()
            .filter(|file| !index.contains(&file.source))
            .cloned()
            .collect();
        let to_delete = index
            .sources()
            .filter(|source| !on_disk.contains(source))
            .map(str::to_string)
            .collect();

        Self { to_add, to_delete }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_delete.is_empty()
    }
}

/// The string recorded as a chunk's `source` for a file path.
///
/// On Windows, separators are normalized to `/` so the same file maps to
/// the same key whichever separator the listing produced. Elsewhere a
/// backslash is an ordinary file-name character and is kept.
pub fn source_key(path: &Path) -> String {
    let key = path.to_string_lossy();
    if cfg!(windows) {
        key.replace('\\', "/")
    } else {
        key.into_owned()
    }
}

/// List supported documents directly inside `dir` (not recursive), matching
/// extensions case-insensitively. Sorted by path.
pub fn list_document_files(dir: &Path) -> Result<Vec<DocumentFile>, SyncError> {
    if !dir.is_dir() {
        return Err(SyncError::MissingDocsDir(dir.display().to_string()));
    }

    let dir_str = dir.to_string_lossy();
    let trimmed = dir_str.trim_end_matches(['/', '\\']);
    let base = if trimmed.is_empty() { &dir_str[..1] } else { trimmed };
    let escaped = glob::Pattern::escape(base);
    let options = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: true,
        require_literal_leading_dot: false,
    };

    let mut files = Vec::new();
    for ext in LoaderKind::SUPPORTED_EXTENSIONS {
        let pattern = format!("{}/*.{ext}", escaped.trim_end_matches('/'));
        let entries = glob::glob_with(&pattern, options).map_err(|e| SyncError::Pattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => files.push(DocumentFile::new(path)),
                Ok(_) => {}
                Err(e) => warn!("Cannot read directory entry: {e}"),
            }
        }
    }

    files.sort_by(|a, b| a.source.cmp(&b.source));
    files.dedup_by(|a, b| a.source == b.source);
    Ok(files)
}

/// Reconciles a documents directory with a vector store.
pub struct Synchronizer<'a, E: Embedder + ?Sized> {
    pub store: &'a mut VectorStore,
    pub embedder: &'a E,
    pub splitter: TextSplitter,
    show_progress: bool,
}

impl<'a, E: Embedder + ?Sized> Synchronizer<'a, E> {
    pub fn new(store: &'a mut VectorStore, embedder: &'a E, splitter: TextSplitter) -> Self {
        Self {
            store,
            embedder,
            splitter,
            show_progress: false,
        }
    }

    /// Draw a progress bar on stderr during the add phase.
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Run one synchronization pass over `docs_dir`.
    pub fn run(&mut self, docs_dir: &Path) -> Result<SyncReport, SyncError> {
        let current_files = list_document_files(docs_dir)?;
        info!(
            "Found {} supported documents in {}",
            current_files.len(),
            docs_dir.display()
        );

        let index = self.store.source_index()?;
        if index.is_empty() {
            info!("Store is empty");
        } else {
            info!(
                "Store holds {} chunks from {} sources",
                index.chunk_count(),
                index.len()
            );
        }

        let plan = SyncPlan::new(&current_files, &index);
        let mut report = SyncReport {
            first_run: self.store.is_new(),
            ..SyncReport::default()
        };

        if plan.is_empty() {
            info!("Store is up to date");
            return Ok(report);
        }

        self.add_phase(&plan.to_add, &mut report)?;
        self.delete_phase(&plan.to_delete, &index, &mut report)?;

        Ok(report)
    }

    fn add_phase(&mut self, files: &[DocumentFile], report: &mut SyncReport) -> Result<(), SyncError> {
        if files.is_empty() {
            info!("No new documents to add");
            return Ok(());
        }
        info!("Adding {} new documents", files.len());

        let pb = if self.show_progress {
            let pb = ProgressBar::new(files.len() as u64);
            if let Ok(style) =
                ProgressStyle::default_bar().template("  {bar:40.cyan/blue} {pos}/{len} {wide_msg}")
            {
                pb.set_style(style.progress_chars("█▓░"));
            }
            pb
        } else {
            ProgressBar::hidden()
        };

        for file in files {
            pb.set_message(file.source.clone());
            self.add_file(file, report)?;
            pb.inc(1);
        }
        pb.finish_and_clear();

        Ok(())
    }

    /// Load, split, embed and insert one file. Load failures are recorded in
    /// the report; embedding and store failures abort the pass.
    fn add_file(&mut self, file: &DocumentFile, report: &mut SyncReport) -> Result<(), SyncError> {
        let path = file.source.as_str();
        let Some(loader) = select_loader(&file.path) else {
            report.skipped_files.push(path.to_string());
            return Ok(());
        };

        let documents = match loader.load() {
            Ok(docs) => docs,
            Err(e) => {
                error!("Error processing {path}: {e}");
                report.failed_files.push(FileFailure {
                    path: path.to_string(),
                    reason: e.to_string(),
                });
                return Ok(());
            }
        };

        let chunks = self.splitter.split_documents(&documents);
        if chunks.is_empty() {
            warn!("{path} produced no text, nothing stored");
            report.empty_files.push(path.to_string());
            return Ok(());
        }

        let texts: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        let vectors = self.embedder.embed_batch(&texts)?;

        let new_chunks: Vec<NewChunk<'_>> = chunks
            .iter()
            .enumerate()
            .map(|(position, c)| NewChunk {
                source: path,
                page: c.page,
                position,
                content: c.content.as_str(),
            })
            .collect();
        self.store.add_chunks(&new_chunks, &vectors)?;

        info!("{path}: split into {} chunks and stored", chunks.len());
        report.added_files += 1;
        report.added_chunks += chunks.len();
        Ok(())
    }

    fn delete_phase(
        &mut self,
        sources: &[String],
        index: &SourceIndex,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        if sources.is_empty() {
            info!("No documents to remove");
            return Ok(());
        }
        info!("Removing {} documents no longer on disk", sources.len());

        let mut ids = Vec::new();
        for source in sources {
            let source_ids = index.ids_for(source);
            info!("Deleting {} chunks for {source}", source_ids.len());
            ids.extend_from_slice(source_ids);
        }

        report.removed_sources = sources.len();
        report.removed_chunks = self.store.delete(&ids)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::mock::MockEmbedder;
    use crate::store::models::ChunkMetadata;
    use std::fs;
    use tempfile::tempdir;

    fn index_of(sources: &[(&str, usize)]) -> SourceIndex {
        let mut next_id = 0;
        let mut rows = Vec::new();
        for (source, n) in sources {
            for _ in 0..*n {
                next_id += 1;
                rows.push((
                    next_id,
                    ChunkMetadata {
                        source: source.to_string(),
                        page: None,
                    },
                ));
            }
        }
        SourceIndex::from_metadata(rows)
    }

    #[test]
    fn test_plan_set_difference() {
        let index = index_of(&[("docs/a.txt", 2), ("docs/b.pdf", 1)]);
        let files = vec![
            DocumentFile::new(PathBuf::from("docs/b.pdf")),
            DocumentFile::new(PathBuf::from("docs/c.docx")),
        ];

        let plan = SyncPlan::new(&files, &index);
        assert_eq!(plan.to_add, vec![DocumentFile::new(PathBuf::from("docs/c.docx"))]);
        assert_eq!(plan.to_delete, vec!["docs/a.txt"]);
    }

    #[test]
    fn test_plan_empty_when_in_sync() {
        let index = index_of(&[("docs/a.txt", 3)]);
        let plan = SyncPlan::new(&[DocumentFile::new(PathBuf::from("docs/a.txt"))], &index);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_list_document_files_filters_and_sorts() {
        let temp = tempdir().unwrap();
        let dir = temp.path();
        for name in ["b.TXT", "a.pdf", "c.Docx", "notes.md", "d.doc"] {
            fs::write(dir.join(name), "x").unwrap();
        }
        fs::create_dir(dir.join("nested.txt")).unwrap();
        fs::create_dir(dir.join("sub")).unwrap();
        fs::write(dir.join("sub").join("deep.txt"), "x").unwrap();

        let files = list_document_files(dir).unwrap();
        let names: Vec<&str> = files
            .iter()
            .map(|f| f.path.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.pdf", "b.TXT", "c.Docx"]);
        assert!(files.iter().all(|f| f.source.starts_with(&source_key(dir))));
    }

    #[test]
    fn test_list_document_files_missing_dir() {
        let temp = tempdir().unwrap();
        let result = list_document_files(&temp.path().join("missing"));
        assert!(matches!(result, Err(SyncError::MissingDocsDir(_))));
    }

    #[test]
    fn test_synchronizer_add_then_noop() {
        let temp = tempdir().unwrap();
        let docs = temp.path().join("docs");
        fs::create_dir(&docs).unwrap();
        fs::write(docs.join("one.txt"), "Content one").unwrap();
        fs::write(docs.join("two.txt"), "Content two").unwrap();

        let mut store = VectorStore::open_in_memory(16).unwrap();
        let embedder = MockEmbedder::new(16);

        let first = Synchronizer::new(&mut store, &embedder, TextSplitter::default())
            .run(&docs)
            .unwrap();
        assert!(first.first_run);
        assert_eq!(first.added_files, 2);
        assert_eq!(first.added_chunks, 2);
        assert_eq!(first.removed_chunks, 0);

        let calls_after_first = embedder.calls();
        let second = Synchronizer::new(&mut store, &embedder, TextSplitter::default())
            .run(&docs)
            .unwrap();
        assert!(!second.changed());
        assert_eq!(embedder.calls(), calls_after_first);
    }

    #[test]
    fn test_empty_file_recorded() {
        let temp = tempdir().unwrap();
        let docs = temp.path();
        fs::write(docs.join("blank.txt"), "   \n").unwrap();

        let mut store = VectorStore::open_in_memory(8).unwrap();
        let embedder = MockEmbedder::new(8);
        let report = Synchronizer::new(&mut store, &embedder, TextSplitter::default())
            .run(docs)
            .unwrap();

        assert_eq!(report.added_files, 0);
        assert_eq!(report.empty_files.len(), 1);
        assert_eq!(embedder.calls(), 0);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_backslash_in_file_name_is_indexed() {
        let temp = tempdir().unwrap();
        let docs = temp.path();
        fs::write(docs.join("we\\ird.txt"), "valid text").unwrap();

        let files = list_document_files(docs).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, docs.join("we\\ird.txt"));
        assert!(files[0].source.ends_with("we\\ird.txt"));

        let mut store = VectorStore::open_in_memory(8).unwrap();
        let embedder = MockEmbedder::new(8);
        let report = Synchronizer::new(&mut store, &embedder, TextSplitter::default())
            .run(docs)
            .unwrap();
        assert!(report.failed_files.is_empty(), "{:?}", report.failed_files);
        assert_eq!(report.added_files, 1);

        // The key found on disk matches the stored key, so nothing is re-added
        let again = Synchronizer::new(&mut store, &embedder, TextSplitter::default())
            .run(docs)
            .unwrap();
        assert!(!again.changed());
    }
}
