//! Full-text response transcripts.
//!
//! Optional companion to the results file. It keeps the accepted response
//! text per question id, so a run can be audited after the fact.

use crate::results::now_iso;
use crate::store::{quarantine, write_json_atomic, StoreError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMetadata {
    pub model: String,
    pub created_at: String,
    pub last_updated: String,
}

/// Responses accepted for one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub timestamp: String,
    /// First-pass response
    pub analysis: String,
    /// Verifier response, verified runs only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptDocument {
    pub metadata: TranscriptMetadata,
    /// Keyed by question id as a string
    #[serde(default)]
    pub responses: BTreeMap<String, TranscriptEntry>,
}

/// Transcript document bound to its file.
#[derive(Debug)]
pub struct TranscriptStore {
    path: PathBuf,
    document: TranscriptDocument,
}

impl TranscriptStore {
    /// Load the transcript at `path`, or start an empty one.
    ///
    /// A missing file starts empty. A file that does not parse is moved aside
    /// the same way as a corrupt results file, then an empty one is started.
    ///
    /// # Errors
    ///
    /// Any other read failure, or a failure to move the bad file aside.
    pub async fn load_or_init(path: &Path, model: &str) -> Result<Self, StoreError> {
        let loaded = match tokio::fs::read(path).await {
            Ok(bytes) => match serde_json::from_slice::<TranscriptDocument>(&bytes) {
                Ok(doc) => Some(doc),
                Err(e) => {
                    let moved_to = quarantine(path).await?;
                    log::warn!(
                        "Transcript file {} is unreadable ({}); moved it to {} and starting a new one",
                        path.display(),
                        e,
                        moved_to.display()
                    );
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(StoreError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        let document = loaded.unwrap_or_else(|| {
            let now = now_iso();
            TranscriptDocument {
                metadata: TranscriptMetadata {
                    model: model.to_string(),
                    created_at: now.clone(),
                    last_updated: now,
                },
                responses: BTreeMap::new(),
            }
        });

        Ok(Self {
            path: path.to_path_buf(),
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &TranscriptDocument {
        &self.document
    }

    /// Store the responses for question `id` and rewrite the file.
    pub async fn record(
        &mut self,
        id: u64,
        analysis: &str,
        verification: Option<&str>,
    ) -> Result<(), StoreError> {
        let now = now_iso();
        self.document.responses.insert(
            id.to_string(),
            TranscriptEntry {
                timestamp: now.clone(),
                analysis: analysis.to_string(),
                verification: verification.map(str::to_string),
            },
        );
        self.document.metadata.last_updated = now;
        write_json_atomic(&self.path, &self.document).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_record_and_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("responses.json");

        let mut store = TranscriptStore::load_or_init(&path, "gemini").await.unwrap();
        store.record(4, "long analysis", None).await.unwrap();
        store
            .record(5, "first", Some("VERIFIED: A"))
            .await
            .unwrap();

        let reloaded = TranscriptStore::load_or_init(&path, "ignored").await.unwrap();
        let doc = reloaded.document();
        assert_eq!(doc.metadata.model, "gemini");
        assert_eq!(doc.responses["4"].analysis, "long analysis");
        assert_eq!(doc.responses["4"].verification, None);
        assert_eq!(
            doc.responses["5"].verification.as_deref(),
            Some("VERIFIED: A")
        );
    }

    #[tokio::test]
    async fn test_unreadable_file_moved_aside() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("responses.json");
        std::fs::write(&path, r#"{"important":"user data"}"#).unwrap();

        let mut store = TranscriptStore::load_or_init(&path, "m").await.unwrap();
        assert!(store.document().responses.is_empty());
        assert_eq!(store.document().metadata.model, "m");

        store.record(1, "text", None).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("responses.json.corrupt")).unwrap(),
            r#"{"important":"user data"}"#
        );
    }

    #[tokio::test]
    async fn test_read_error_is_reported() {
        let dir = tempdir().unwrap();
        // A directory cannot be read as a file.
        let err = TranscriptStore::load_or_init(dir.path(), "m")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }

    #[tokio::test]
    async fn test_single_pass_entry_omits_verification() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("responses.json");
        let mut store = TranscriptStore::load_or_init(&path, "m").await.unwrap();
        store.record(1, "text", None).await.unwrap();

        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert!(json["responses"]["1"].get("verification").is_none());
        assert_eq!(json["responses"]["1"]["analysis"], "text");
    }
}
