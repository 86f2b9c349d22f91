//! Server-side document storage.
//!
//! The document lives in a single file inside the data directory:
//! ```text
//! <DATA_DIR>/
//!   exchange.json    {"version": 3, "updatedAt": "...", "document": {...}}
//! ```
//!
//! Writes go through one async lock and are atomic (temp file + rename), so
//! conditional writes are checked and applied without interleaving.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

use crate::models::ExchangeDocument;
use crate::store::{DocumentStore, Snapshot, StoreError, Version};

const FILENAME: &str = "exchange.json";

/// On-disk envelope around the document.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredDocument {
    version: u64,
    updated_at: DateTime<Utc>,
    document: ExchangeDocument,
}

/// File-backed document store with version tokens.
#[derive(Debug)]
pub struct FileDocumentStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileDocumentStore {
    /// Creates a store rooted at `data_dir`. Nothing is touched on disk
    /// until the first write.
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(FILENAME),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the path of the document file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the envelope; a missing file is an empty document at version 0.
    fn load(&self) -> Result<(ExchangeDocument, u64), StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => {
                let stored: StoredDocument = serde_json::from_slice(&bytes).map_err(|e| {
                    StoreError::Malformed(format!("{}: {}", self.path.display(), e))
                })?;
                Ok((stored.document, stored.version))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok((ExchangeDocument::default(), 0)),
            Err(e) => Err(io_error(&self.path, e)),
        }
    }

    fn save(&self, document: &ExchangeDocument, version: u64) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let stored = StoredDocument {
            version,
            updated_at: Utc::now(),
            document: document.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&stored)?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&temp_path).map_err(|e| io_error(&temp_path, e))?;
        file.write_all(&bytes).map_err(|e| io_error(&temp_path, e))?;
        file.sync_all().map_err(|e| io_error(&temp_path, e))?;

        fs::rename(&temp_path, &self.path).map_err(|e| io_error(&self.path, e))?;
        Ok(())
    }
}

fn io_error(path: &Path, e: io::Error) -> StoreError {
    StoreError::Io(format!("{}: {}", path.display(), e))
}

impl DocumentStore for FileDocumentStore {
    async fn fetch(&self) -> Result<Snapshot, StoreError> {
        let _guard = self.write_lock.lock().await;
        let (document, version) = self.load()?;
        Ok(Snapshot {
            document,
            version: Some(Version::new(version.to_string())),
        })
    }

    async fn replace(
        &self,
        document: &ExchangeDocument,
        expected: Option<&Version>,
    ) -> Result<Snapshot, StoreError> {
        let _guard = self.write_lock.lock().await;
        let (_, current) = self.load()?;

        if let Some(expected) = expected {
            if expected.as_str() != current.to_string() {
                tracing::info!(
                    "Rejected write against version {} (current {})",
                    expected,
                    current
                );
                return Err(StoreError::Conflict {
                    expected: expected.to_string(),
                });
            }
        }

        let next = current + 1;
        self.save(document, next)?;
        tracing::info!("Stored document version {}", next);

        Ok(Snapshot {
            document: document.clone(),
            version: Some(Version::new(next.to_string())),
        })
    }
}
