//! Document store error types.

use thiserror::Error;

/// Errors that can occur while reading or writing the shared document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Network failure or timeout
    #[error("HTTP error: {0}")]
    Http(String),
    /// Server answered with a non-success status
    #[error("Store returned status {status}: {body}")]
    Status { status: u16, body: String },
    /// Body was not a valid exchange document
    #[error("Malformed document: {0}")]
    Malformed(String),
    /// The document changed since it was read
    #[error("Document was modified concurrently (expected version {expected})")]
    Conflict { expected: String },
    /// Local persistence failure
    #[error("Storage error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(e: reqwest::Error) -> Self {
        StoreError::Http(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Malformed(e.to_string())
    }
}
