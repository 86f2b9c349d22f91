use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::models::UrlMetadata;

#[derive(Debug, Clone)]
struct CachedMetadata {
    metadata: UrlMetadata,
    created_at: Instant,
}

/// Fetched metadata by URL, with a time-to-live and an entry cap.
#[derive(Debug)]
pub struct MetadataCache {
    ttl: Duration,
    max_entries: usize,
    entries: HashMap<String, CachedMetadata>,
}

impl MetadataCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, url: &str) -> Option<UrlMetadata> {
        self.evict_expired();
        self.entries.get(url).map(|e| e.metadata.clone())
    }

    /// Stores `metadata`, dropping the oldest entry when full.
    pub fn insert(&mut self, url: String, metadata: UrlMetadata) {
        if self.max_entries == 0 {
            return;
        }
        self.evict_expired();
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&url) {
            if let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, e)| e.created_at)
                .map(|(k, _)| k.clone())
            {
                self.entries.remove(&oldest);
            }
        }
        self.entries.insert(
            url,
            CachedMetadata {
                metadata,
                created_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_expired(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, e| e.created_at.elapsed() <= ttl);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titled(title: &str) -> UrlMetadata {
        UrlMetadata {
            title: Some(title.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_get_returns_inserted() {
        let mut cache = MetadataCache::new(Duration::from_secs(60), 10);
        cache.insert("https://a.example".into(), titled("A"));

        assert_eq!(cache.get("https://a.example"), Some(titled("A")));
        assert_eq!(cache.get("https://b.example"), None);
    }

    #[test]
    fn test_expired_entries_are_dropped() {
        let mut cache = MetadataCache::new(Duration::from_millis(1), 10);
        cache.insert("https://a.example".into(), titled("A"));
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(cache.get("https://a.example"), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_oldest_entry_evicted_when_full() {
        let mut cache = MetadataCache::new(Duration::from_secs(60), 2);
        cache.insert("https://a.example".into(), titled("A"));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("https://b.example".into(), titled("B"));
        std::thread::sleep(Duration::from_millis(2));
        cache.insert("https://c.example".into(), titled("C"));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("https://a.example"), None);
        assert!(cache.get("https://b.example").is_some());
        assert!(cache.get("https://c.example").is_some());
    }
}
