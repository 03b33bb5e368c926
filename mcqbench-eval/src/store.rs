//! Persistent results store.
//!
//! Owns the [`ResultsDocument`] for one run and the file it lives in. Every
//! append rewrites the whole document through a temporary sibling file and a
//! rename, so a crash leaves either the previous or the new document on disk.

use crate::results::{now_iso, EvalMode, Metadata, Record, ResultsDocument};
use serde::Serialize;
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;

/// Errors from reading or writing a results file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize results: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Question {0} is already recorded")]
    DuplicateRecord(u64),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// `<path><suffix>`, keeping the original extension.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_owned();
    name.push(suffix);
    PathBuf::from(name)
}

/// Move an unreadable file aside to `<path>.corrupt`, or `<path>.corrupt.N`
/// when earlier copies exist. Returns the new path.
pub(crate) async fn quarantine(path: &Path) -> Result<PathBuf, StoreError> {
    let mut target = sibling(path, ".corrupt");
    let mut n = 1u32;
    while fs::try_exists(&target)
        .await
        .map_err(|e| StoreError::io(&target, e))?
    {
        target = sibling(path, &format!(".corrupt.{}", n));
        n += 1;
    }

    fs::rename(path, &target)
        .await
        .map_err(|e| StoreError::io(path, e))?;
    Ok(target)
}

/// Serialize `value` as pretty JSON and replace `path` atomically.
pub(crate) async fn write_json_atomic<T: Serialize>(
    path: &Path,
    value: &T,
) -> Result<(), StoreError> {
    let json = serde_json::to_vec_pretty(value)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StoreError::io(parent, e))?;
    }

    let tmp = sibling(path, ".tmp");
    let mut file = fs::File::create(&tmp)
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    file.write_all(&json)
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    // The data must be on disk before the rename makes it visible.
    file.sync_all()
        .await
        .map_err(|e| StoreError::io(&tmp, e))?;
    drop(file);

    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StoreError::io(path, e));
    }
    Ok(())
}

/// Results document bound to its file.
#[derive(Debug)]
pub struct ResultsStore {
    path: PathBuf,
    mode: EvalMode,
    document: ResultsDocument,
    /// Ids already in the document, computed once at load
    processed: HashSet<u64>,
    /// The in-memory document differs from the file
    dirty: bool,
}

impl ResultsStore {
    /// Load the document at `path`, or start a fresh one.
    ///
    /// A missing file gives a fresh document, which is written immediately.
    /// A file that exists but does not parse is moved aside by
    /// [`quarantine`] and replaced by a fresh document. A loaded document whose
    /// `total_questions` is 0 is backfilled on its next write.
    ///
    /// The model name in a loaded document is not checked here.
    pub async fn load_or_init(
        path: &Path,
        model: &str,
        total_questions: usize,
        mode: EvalMode,
    ) -> Result<Self, StoreError> {
        let existing = match fs::read(path).await {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(StoreError::io(path, e)),
        };

        if let Some(bytes) = existing {
            match serde_json::from_slice::<ResultsDocument>(&bytes) {
                Ok(document) => return Ok(Self::resume(path, mode, document, total_questions)),
                Err(e) => {
                    let moved_to = quarantine(path).await?;
                    log::warn!(
                        "Results file {} is unreadable ({}); moved it to {} and starting fresh",
                        path.display(),
                        e,
                        moved_to.display()
                    );
                }
            }
        }

        let mut store = Self {
            path: path.to_path_buf(),
            mode,
            document: ResultsDocument::new(model, total_questions, mode),
            processed: HashSet::new(),
            dirty: true,
        };
        store.persist().await?;
        log::info!("Started new results file {}", path.display());
        Ok(store)
    }

    fn resume(
        path: &Path,
        mode: EvalMode,
        mut document: ResultsDocument,
        total_questions: usize,
    ) -> Self {
        let mut processed = HashSet::with_capacity(document.processed_questions.len());
        // Keep the first record for an id if the file was hand-edited.
        let before = document.processed_questions.len();
        document.processed_questions.retain(|r| processed.insert(r.id()));
        if document.processed_questions.len() != before {
            log::warn!(
                "Dropped {} duplicate record(s) from {}",
                before - document.processed_questions.len(),
                path.display()
            );
        }

        let mut dirty = document.processed_questions.len() != before;
        if document.metadata.total_questions == 0 && total_questions > 0 {
            document.metadata.total_questions = total_questions;
            dirty = true;
        }
        if !document.is_consistent() {
            document.refresh_aggregates(mode);
            dirty = true;
        }

        log::info!(
            "Resuming {}: {} question(s) already processed",
            path.display(),
            processed.len()
        );

        Self {
            path: path.to_path_buf(),
            mode,
            document,
            processed,
            dirty,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &ResultsDocument {
        &self.document
    }

    pub fn metadata(&self) -> &Metadata {
        &self.document.metadata
    }

    pub fn records(&self) -> &[Record] {
        &self.document.processed_questions
    }

    /// Ids already recorded.
    pub fn replay_set(&self) -> &HashSet<u64> {
        &self.processed
    }

    pub fn has_processed(&self, id: u64) -> bool {
        self.processed.contains(&id)
    }

    /// Append `record`, recompute the aggregates and write the document.
    ///
    /// On a write failure the record is removed again, so the in-memory
    /// document keeps matching the file.
    pub async fn append_and_persist(&mut self, record: Record) -> Result<&Metadata, StoreError> {
        let id = record.id();
        if self.processed.contains(&id) {
            return Err(StoreError::DuplicateRecord(id));
        }

        let previous = self.document.metadata.clone();
        self.document.processed_questions.push(record);
        self.processed.insert(id);
        self.document.refresh_aggregates(self.mode);
        self.document.metadata.last_updated = now_iso();
        self.dirty = true;

        if let Err(e) = self.persist().await {
            self.document.processed_questions.pop();
            self.processed.remove(&id);
            self.document.metadata = previous;
            return Err(e);
        }

        Ok(&self.document.metadata)
    }

    /// Write pending changes from load (backfill, repaired aggregates).
    ///
    /// Does nothing when the file is already current.
    pub async fn flush(&mut self) -> Result<(), StoreError> {
        if self.dirty {
            self.persist().await?;
        }
        Ok(())
    }

    async fn persist(&mut self) -> Result<(), StoreError> {
        write_json_atomic(&self.path, &self.document).await?;
        self.dirty = false;
        Ok(())
    }
}
