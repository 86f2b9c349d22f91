//! Access to the shared exchange document.
//!
//! The backing stores only offer whole-document reads and writes, so every
//! change is a read-modify-write cycle. When a store hands out a version
//! token with each read, writes are made conditional on it and a concurrent
//! change surfaces as [`StoreError::Conflict`] instead of being silently
//! overwritten. [`mutate`] re-reads and re-applies the change in that case.
//!
//! # Usage
//!
//! ```no_run
//! use giftswap::store::{mutate, MemoryDocumentStore, StoreError};
//!
//! # async fn demo() -> Result<(), StoreError> {
//! let store = MemoryDocumentStore::default();
//! let (doc, ()) = mutate(&store, |doc| {
//!     doc.taken.insert("Bob".into(), "Alice".into());
//!     Ok::<_, StoreError>(())
//! })
//! .await?;
//! assert!(doc.is_taken("Bob"));
//! # Ok(())
//! # }
//! ```

mod error;
mod http;
mod memory;

pub use error::StoreError;
pub use http::{HttpDocumentStore, DEFAULT_TIMEOUT};
pub use memory::MemoryDocumentStore;

use std::fmt;
use std::future::Future;

use crate::models::ExchangeDocument;

/// How many times a conflicting write is re-read and re-applied.
pub const MAX_CONFLICT_ATTEMPTS: usize = 3;

/// Opaque version token handed out by stores that support conditional writes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(String);

impl Version {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Formats the token as a strong HTTP entity tag.
    pub fn to_etag(&self) -> String {
        format!("\"{}\"", self.0)
    }

    /// Parses an entity tag, accepting weak tags and missing quotes.
    pub fn from_etag(etag: &str) -> Option<Self> {
        let tag = etag.trim();
        let tag = tag.strip_prefix("W/").unwrap_or(tag);
        let tag = tag.trim_matches('"');
        if tag.is_empty() {
            None
        } else {
            Some(Self(tag.to_string()))
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A document as read from a store.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub document: ExchangeDocument,
    /// `None` when the store does not version its document.
    pub version: Option<Version>,
}

/// Whole-document store.
pub trait DocumentStore: Send + Sync {
    /// Reads the current document.
    fn fetch(&self) -> impl Future<Output = Result<Snapshot, StoreError>> + Send;

    /// Overwrites the document.
    ///
    /// With `expected` set, the write only succeeds if the stored version
    /// still matches; otherwise [`StoreError::Conflict`] is returned and
    /// nothing is written.
    fn replace(
        &self,
        document: &ExchangeDocument,
        expected: Option<&Version>,
    ) -> impl Future<Output = Result<Snapshot, StoreError>> + Send;
}

/// Runs one read-modify-write cycle against `store`.
///
/// `apply` sees a freshly read document. If it returns an error the cycle
/// stops and nothing is written. On a version conflict the document is read
/// again and `apply` runs again, up to [`MAX_CONFLICT_ATTEMPTS`] times. Any
/// other store failure is returned as is.
pub async fn mutate<S, T, E, F>(store: &S, mut apply: F) -> Result<(ExchangeDocument, T), E>
where
    S: DocumentStore + ?Sized,
    E: From<StoreError>,
    F: FnMut(&mut ExchangeDocument) -> Result<T, E>,
{
    let mut attempt = 1;
    loop {
        let Snapshot {
            mut document,
            version,
        } = store.fetch().await?;

        let output = apply(&mut document)?;

        match store.replace(&document, version.as_ref()).await {
            Ok(saved) => return Ok((saved.document, output)),
            Err(StoreError::Conflict { expected }) if attempt < MAX_CONFLICT_ATTEMPTS => {
                tracing::warn!(
                    "Document changed since version {} was read, retrying ({}/{})",
                    expected,
                    attempt,
                    MAX_CONFLICT_ATTEMPTS
                );
                attempt += 1;
            }
            Err(e) => return Err(e.into()),
        }
    }
}
