//! In-memory cache of rendered documents.
//!
//! Entries expire after a TTL and are only valid for the exact source
//! snapshot they were rendered from, see [`Fingerprint`]. The cache does no
//! I/O and no locking of its own, the coordinator owns it behind a mutex.

use crate::document::DocumentKey;
use crate::render::RenderedMarkup;
use docview_config::PipelineConfig;
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::Instant;

/// Share of the entries evicted at once when the cache is full.
const EVICTION_RATIO: f64 = 0.2;

/// Identifies the source snapshot a rendering was produced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fingerprint {
    /// Modification time of the persisted source.
    Modified(SystemTime),
    /// Hash of an in-memory edit buffer.
    Content(u64),
}

impl Fingerprint {
    pub fn of_content(content: &str) -> Self {
        let mut hasher = DefaultHasher::new();
        content.hash(&mut hasher);
        Self::Content(hasher.finish())
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: DocumentKey,
    pub payload: Arc<RenderedMarkup>,
    pub created_at: Instant,
    pub fingerprint: Fingerprint,
}

#[derive(Debug)]
pub struct RenderCache {
    entries: HashMap<DocumentKey, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl RenderCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.ttl(), config.max_cache_entries)
    }

    fn is_expired(&self, entry: &CacheEntry) -> bool {
        entry.created_at.elapsed() > self.ttl
    }

    /// Returns the entry of `key` unless it has expired.
    ///
    /// An expired entry is removed.
    pub fn get(&mut self, key: &DocumentKey) -> Option<CacheEntry> {
        let entry = self.entries.get(key)?;
        if self.is_expired(entry) {
            tracing::debug!(%key, "Cache entry expired");
            self.entries.remove(key);
            return None;
        }
        Some(entry.clone())
    }

    /// Inserts or replaces the rendering of `key`.
    ///
    /// Inserting a new key into a full cache first evicts the oldest 20% of
    /// the entries.
    pub fn put(&mut self, key: DocumentKey, payload: Arc<RenderedMarkup>, fingerprint: Fingerprint) {
        if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
            self.evict_oldest();
        }

        let entry = CacheEntry {
            key: key.clone(),
            payload,
            created_at: Instant::now(),
            fingerprint,
        };
        self.entries.insert(key, entry);
    }

    fn evict_oldest(&mut self) {
        let count = ((self.entries.len() as f64 * EVICTION_RATIO).ceil() as usize).max(1);

        let mut by_age: Vec<(Instant, DocumentKey)> = self
            .entries
            .values()
            .map(|entry| (entry.created_at, entry.key.clone()))
            .collect();
        by_age.sort_unstable_by_key(|(created_at, _)| *created_at);

        for (_, key) in by_age.into_iter().take(count) {
            self.entries.remove(&key);
        }

        tracing::debug!(evicted = count, remaining = self.entries.len(), "Evicted cache entries");
    }

    /// Returns `true` if an entry was removed.
    pub fn invalidate(&mut self, key: &DocumentKey) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Removes the entry of `key` if it has expired or was rendered from a
    /// snapshot other than `current`.
    ///
    /// Returns `true` when a stale entry was removed.
    pub fn invalidate_if_stale(&mut self, key: &DocumentKey, current: &Fingerprint) -> bool {
        let stale = self
            .entries
            .get(key)
            .is_some_and(|entry| entry.fingerprint != *current || self.is_expired(entry));
        if stale {
            self.entries.remove(key);
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markup(html: &str) -> Arc<RenderedMarkup> {
        Arc::new(RenderedMarkup {
            html_content: html.to_string(),
            special_blocks: Vec::new(),
        })
    }

    #[test]
    fn test_content_fingerprint() {
        assert_eq!(Fingerprint::of_content("a"), Fingerprint::of_content("a"));
        assert_ne!(Fingerprint::of_content("a"), Fingerprint::of_content("b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_expiry() {
        let mut cache = RenderCache::new(Duration::from_secs(300), 50);
        let key = DocumentKey::from("/docs/a.md");
        cache.put(key.clone(), markup("<p>a</p>"), Fingerprint::of_content("a"));

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(cache.get(&key).is_some());

        tokio::time::advance(Duration::from_secs(2)).await;
        assert!(cache.get(&key).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_removes_oldest_fifth() {
        let mut cache = RenderCache::new(Duration::from_secs(300), 50);
        for i in 0..50 {
            cache.put(
                DocumentKey::new(format!("/docs/{i}.md")),
                markup(""),
                Fingerprint::Content(i),
            );
            tokio::time::advance(Duration::from_millis(10)).await;
        }
        assert_eq!(cache.len(), 50);

        cache.put(DocumentKey::from("/docs/new.md"), markup(""), Fingerprint::Content(99));
        assert_eq!(cache.len(), 41);
        for i in 0..10 {
            assert!(cache.get(&DocumentKey::new(format!("/docs/{i}.md"))).is_none());
        }
        for i in 10..50 {
            assert!(cache.get(&DocumentKey::new(format!("/docs/{i}.md"))).is_some());
        }
        assert!(cache.get(&DocumentKey::from("/docs/new.md")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacing_a_key_does_not_evict() {
        let mut cache = RenderCache::new(Duration::from_secs(300), 2);
        let a = DocumentKey::from("/a.md");
        let b = DocumentKey::from("/b.md");
        cache.put(a.clone(), markup("1"), Fingerprint::Content(1));
        cache.put(b.clone(), markup("1"), Fingerprint::Content(1));
        cache.put(a.clone(), markup("2"), Fingerprint::Content(2));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&a).unwrap().payload.html_content, "2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_if_stale() {
        let mut cache = RenderCache::default();
        let key = DocumentKey::from("/a.md");
        let snapshot = Fingerprint::of_content("v1");
        cache.put(key.clone(), markup("v1"), snapshot);

        assert!(!cache.invalidate_if_stale(&key, &snapshot));
        assert!(cache.get(&key).is_some());

        assert!(cache.invalidate_if_stale(&key, &Fingerprint::of_content("v2")));
        assert!(cache.get(&key).is_none());
        assert!(!cache.invalidate_if_stale(&key, &snapshot));
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalidate_and_clear() {
        let mut cache = RenderCache::default();
        let key = DocumentKey::from("/a.md");
        cache.put(key.clone(), markup(""), Fingerprint::Content(0));
        assert!(cache.invalidate(&key));
        assert!(!cache.invalidate(&key));

        cache.put(key, markup(""), Fingerprint::Content(0));
        cache.clear();
        assert!(cache.is_empty());
    }
}
