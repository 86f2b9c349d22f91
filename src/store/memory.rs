//! In-process document store.

use tokio::sync::Mutex;

use super::{DocumentStore, Snapshot, StoreError, Version};
use crate::models::ExchangeDocument;

/// Keeps the document in memory with a monotonically increasing version.
///
/// Used by tests and as the reference behaviour for conditional writes.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    state: Mutex<(ExchangeDocument, u64)>,
}

impl MemoryDocumentStore {
    pub fn new(document: ExchangeDocument) -> Self {
        Self {
            state: Mutex::new((document, 0)),
        }
    }
}

impl DocumentStore for MemoryDocumentStore {
    async fn fetch(&self) -> Result<Snapshot, StoreError> {
        let state = self.state.lock().await;
        Ok(Snapshot {
            document: state.0.clone(),
            version: Some(Version::new(state.1.to_string())),
        })
    }

    async fn replace(
        &self,
        document: &ExchangeDocument,
        expected: Option<&Version>,
    ) -> Result<Snapshot, StoreError> {
        let mut state = self.state.lock().await;
        let current = state.1.to_string();

        if let Some(expected) = expected {
            if expected.as_str() != current {
                return Err(StoreError::Conflict {
                    expected: expected.to_string(),
                });
            }
        }

        state.0 = document.clone();
        state.1 += 1;

        Ok(Snapshot {
            document: state.0.clone(),
            version: Some(Version::new(state.1.to_string())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_versions_increase_on_write() {
        let store = MemoryDocumentStore::default();
        let first = store.fetch().await.unwrap();
        assert_eq!(first.version, Some(Version::new("0")));

        let saved = store
            .replace(&first.document, first.version.as_ref())
            .await
            .unwrap();
        assert_eq!(saved.version, Some(Version::new("1")));
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let store = MemoryDocumentStore::default();
        let stale = store.fetch().await.unwrap();

        let mut doc = stale.document.clone();
        doc.taken.insert("Bob".into(), "Alice".into());
        store.replace(&doc, stale.version.as_ref()).await.unwrap();

        let mut other = stale.document.clone();
        other.taken.insert("Bob".into(), "Carol".into());
        let result = store.replace(&other, stale.version.as_ref()).await;

        assert!(matches!(result, Err(StoreError::Conflict { .. })));
        let current = store.fetch().await.unwrap().document;
        assert_eq!(current.taken.get("Bob").map(String::as_str), Some("Alice"));
    }

    #[tokio::test]
    async fn test_unconditional_write_always_wins() {
        let store = MemoryDocumentStore::default();
        let mut doc = ExchangeDocument::default();
        doc.gifts.insert("Alice".into(), "socks".into());

        store.replace(&doc, None).await.unwrap();
        store.replace(&doc, None).await.unwrap();

        let snapshot = store.fetch().await.unwrap();
        assert_eq!(snapshot.document, doc);
        assert_eq!(snapshot.version, Some(Version::new("2")));
    }
}
