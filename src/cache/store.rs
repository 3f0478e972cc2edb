//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with FIFO tracking and TTL expiration.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats, InsertionOrder, MAX_KEY_LENGTH};
use crate::error::{ClassifiedError, Result};

// == Cache Store ==
/// Bounded cache storage with FIFO eviction and TTL support.
///
/// Not synchronized; see [`MemoryCache`](crate::cache::MemoryCache) for the
/// shared handle.
#[derive(Debug)]
pub struct CacheStore<T> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<T>>,
    /// Insertion order tracker
    order: InsertionOrder,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
    /// TTL for entries stored without an explicit one
    default_ttl: Duration,
}

impl<T: Clone> CacheStore<T> {
    // == Constructor ==
    /// Creates a new CacheStore with specified capacity and default TTL.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold (at least 1)
    /// * `default_ttl` - TTL for entries stored without an explicit one (non-zero)
    pub fn new(max_entries: usize, default_ttl: Duration) -> Result<Self> {
        if max_entries == 0 {
            return Err(ClassifiedError::configuration(
                "cache max size must be at least 1",
            ));
        }
        if default_ttl.is_zero() {
            return Err(ClassifiedError::configuration(
                "cache default TTL must be positive",
            ));
        }

        Ok(Self::from_parts(max_entries, default_ttl))
    }

    /// Builds a store from parameters already known to be valid.
    pub(crate) fn from_parts(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            stats: CacheStats::new(),
            max_entries,
            default_ttl,
        }
    }

    // == Set ==
    /// Stores a value with optional TTL.
    ///
    /// If the key already exists, the value is replaced and its age restarts.
    /// At capacity, expired entries are swept first; if the cache is still
    /// full, the oldest inserted entry is evicted.
    ///
    /// # Arguments
    /// * `key` - The key to store
    /// * `value` - The value to store
    /// * `ttl` - Optional TTL (uses the default TTL if None)
    pub fn set(&mut self, key: String, value: T, ttl: Option<Duration>) -> Result<()> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(ClassifiedError::cache(format!(
                "key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }

        let is_overwrite = self.entries.contains_key(&key);

        if !is_overwrite && self.entries.len() >= self.max_entries {
            self.cleanup_expired();
        }

        if !is_overwrite && self.entries.len() >= self.max_entries {
            match self.order.pop_oldest() {
                Some(evicted) => {
                    self.entries.remove(&evicted);
                    self.stats.record_eviction();
                    debug!(key = %evicted, "evicted oldest cache entry");
                }
                None => {
                    return Err(ClassifiedError::cache(
                        "cache is full and eviction failed",
                    ));
                }
            }
        }

        let entry = CacheEntry::new(value, ttl.unwrap_or(self.default_ttl));
        self.entries.insert(key.clone(), entry);
        self.order.push(&key);
        self.stats.set_total_entries(self.entries.len());

        Ok(())
    }

    // == Get ==
    /// Retrieves a live value by key.
    ///
    /// Expired entries are removed and counted as misses.
    pub fn get(&mut self, key: &str) -> Option<T> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => {
                self.stats.record_hit();
                return Some(entry.data.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
        }
        self.stats.record_miss();
        None
    }

    // == Peek ==
    /// Like [`get`](Self::get) but leaves the hit/miss counters alone.
    pub fn peek(&mut self, key: &str) -> Option<T> {
        if self.has(key) {
            self.entries.get(key).map(|entry| entry.data.clone())
        } else {
            None
        }
    }

    // == Has ==
    /// Whether a live entry exists for `key`. Does not touch the counters.
    pub fn has(&mut self, key: &str) -> bool {
        let expired = match self.entries.get(key) {
            Some(entry) => entry.is_expired(),
            None => return false,
        };

        if expired {
            self.remove_entry(key);
            self.stats.record_expirations(1);
        }
        !expired
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether an entry was present.
    pub fn delete(&mut self, key: &str) -> bool {
        self.remove_entry(key)
    }

    // == Clear ==
    /// Removes every entry. Counters are kept.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.stats.set_total_entries(0);
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();

        for key in expired_keys {
            self.entries.remove(&key);
            self.order.remove(&key);
        }

        self.stats.record_expirations(count);
        self.stats.set_total_entries(self.entries.len());
        count
    }

    /// Keys currently stored, oldest insertion first. May include expired entries.
    pub fn keys(&self) -> Vec<String> {
        self.order.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn remove_entry(&mut self, key: &str) -> bool {
        if self.entries.remove(key).is_some() {
            self.order.remove(key);
            self.stats.set_total_entries(self.entries.len());
            true
        } else {
            false
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const TTL: Duration = Duration::from_secs(300);

    fn store(max_entries: usize) -> CacheStore<String> {
        CacheStore::new(max_entries, TTL).unwrap()
    }

    #[test]
    fn test_store_new() {
        let store = store(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.max_entries(), 100);
        assert_eq!(store.default_ttl(), TTL);
    }

    #[test]
    fn test_store_rejects_invalid_construction() {
        let err = CacheStore::<String>::new(0, TTL).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Configuration(_)));

        let err = CacheStore::<String>::new(10, Duration::ZERO).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Configuration(_)));
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = store(100);

        store.set("key1".to_string(), "value1".to_string(), None).unwrap();

        assert_eq!(store.get("key1"), Some("value1".to_string()));
        assert!(store.has("key1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = store(100);
        assert_eq!(store.get("nonexistent"), None);
        assert!(!store.has("nonexistent"));
    }

    #[test]
    fn test_store_delete() {
        let mut store = store(100);

        store.set("key1".to_string(), "value1".to_string(), None).unwrap();

        assert!(store.delete("key1"));
        assert!(!store.delete("key1"));
        assert!(store.is_empty());
        assert_eq!(store.get("key1"), None);
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = store(100);

        store.set("key1".to_string(), "value1".to_string(), None).unwrap();
        store.set("key1".to_string(), "value2".to_string(), None).unwrap();

        assert_eq!(store.get("key1"), Some("value2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_ttl_expiration() {
        let mut store = store(100);

        store
            .set("key1".to_string(), "value1".to_string(), Some(Duration::from_secs(1)))
            .unwrap();
        assert!(store.get("key1").is_some());

        tokio::time::advance(Duration::from_millis(1000)).await;

        assert_eq!(store.get("key1"), None);
        assert!(!store.has("key1"));
        assert!(store.is_empty(), "expired entry is removed on read");
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_fifo_eviction() {
        let mut store = store(3);

        store.set("key1".to_string(), "value1".to_string(), None).unwrap();
        store.set("key2".to_string(), "value2".to_string(), None).unwrap();
        store.set("key3".to_string(), "value3".to_string(), None).unwrap();

        // Reads do not protect an entry from eviction
        store.get("key1").unwrap();

        store.set("key4".to_string(), "value4".to_string(), None).unwrap();

        assert_eq!(store.len(), 3);
        assert_eq!(store.get("key1"), None);
        assert!(store.get("key2").is_some());
        assert!(store.get("key4").is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_full_prefers_expired_over_eviction() {
        let mut store = store(2);

        store.set("old".to_string(), "v".to_string(), None).unwrap();
        store
            .set("short".to_string(), "v".to_string(), Some(Duration::from_secs(1)))
            .unwrap();

        tokio::time::advance(Duration::from_secs(2)).await;
        store.set("new".to_string(), "v".to_string(), None).unwrap();

        assert!(store.has("old"), "live oldest entry survives");
        assert!(store.has("new"));
        assert_eq!(store.stats().evictions, 0);
        assert_eq!(store.stats().expirations, 1);
    }

    #[test]
    fn test_store_stats() {
        let mut store = store(100);

        store.set("key1".to_string(), "value1".to_string(), None).unwrap();
        store.get("key1").unwrap(); // hit
        let _ = store.get("nonexistent"); // miss
        let _ = store.has("key1"); // not counted
        let _ = store.peek("key1"); // not counted

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_store_clear_keeps_counters() {
        let mut store = store(100);

        store.set("a".to_string(), "1".to_string(), None).unwrap();
        store.set("b".to_string(), "2".to_string(), None).unwrap();
        store.get("a").unwrap();
        store.clear();

        assert!(store.is_empty());
        assert!(store.keys().is_empty());
        assert_eq!(store.stats().hits, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_cleanup_expired() {
        let mut store = store(100);

        store
            .set("key1".to_string(), "value1".to_string(), Some(Duration::from_secs(1)))
            .unwrap();
        store
            .set("key2".to_string(), "value2".to_string(), Some(Duration::from_secs(10)))
            .unwrap();

        tokio::time::advance(Duration::from_millis(1100)).await;

        let removed = store.cleanup_expired();
        assert_eq!(removed, 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.keys(), vec!["key2".to_string()]);
    }

    #[test]
    fn test_store_key_too_long() {
        let mut store = store(100);
        let long_key = "x".repeat(MAX_KEY_LENGTH + 1);

        let err = store.set(long_key, "value".to_string(), None).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Cache(_)));
        assert!(store.is_empty());
    }
}
