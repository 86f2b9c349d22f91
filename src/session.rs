//! Remembered login between CLI invocations.
//!
//! ```text
//! <data_dir>/session.json    {"participant": "Alice", "passwordDigest": "sha256$..."}
//! ```
//!
//! Only the stored digest is kept, never the password itself.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const FILENAME: &str = "session.json";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to access session file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Session file {} is corrupt: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Who is logged in on this machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub participant: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_digest: Option<String>,
}

impl Session {
    pub fn new(participant: impl Into<String>, password_digest: Option<String>) -> Self {
        Self {
            participant: participant.into(),
            password_digest,
        }
    }
}

/// Reads and writes the session file in a data directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        Self {
            path: data_dir.as_ref().join(FILENAME),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the saved session, or `None` if nobody is logged in.
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SessionError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| SessionError::Corrupt {
                path: self.path.clone(),
                source,
            })
    }

    /// Saves `session` atomically, replacing any previous one.
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SessionError::Io { path, source }
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err(parent))?;
        }

        let bytes = serde_json::to_vec_pretty(session).map_err(|source| SessionError::Corrupt {
            path: self.path.clone(),
            source,
        })?;

        let temp_path = self.path.with_extension("json.tmp");
        let mut file = File::create(&temp_path).map_err(io_err(&temp_path))?;
        file.write_all(&bytes).map_err(io_err(&temp_path))?;
        file.sync_all().map_err(io_err(&temp_path))?;
        fs::rename(&temp_path, &self.path).map_err(io_err(&self.path))?;

        tracing::debug!("Saved session for {}", session.participant);
        Ok(())
    }

    /// Forgets the saved session. Clearing when nothing is saved is fine.
    pub fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(SessionError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_without_session() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_save_load_clear() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path().join("giftswap"));
        let session = Session::new("Alice", Some("sha256$00$ff".into()));

        store.save(&session).unwrap();
        assert_eq!(store.load().unwrap(), Some(session));

        let json = fs::read_to_string(store.path()).unwrap();
        assert!(json.contains("passwordDigest"));

        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }

    #[test]
    fn test_session_without_password() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());

        store.save(&Session::new("Bob", None)).unwrap();
        let json = fs::read_to_string(store.path()).unwrap();
        assert!(!json.contains("passwordDigest"));
        assert_eq!(store.load().unwrap().unwrap().password_digest, None);
    }

    #[test]
    fn test_corrupt_session() {
        let temp_dir = TempDir::new().unwrap();
        let store = SessionStore::new(temp_dir.path());
        fs::write(store.path(), "{not json").unwrap();

        assert!(matches!(store.load(), Err(SessionError::Corrupt { .. })));
    }
}
