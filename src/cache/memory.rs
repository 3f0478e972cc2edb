//! Memory Cache Module
//!
//! Shared, async-safe handle over a [`CacheStore`].

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::cache::{CacheStats, CacheStore};
use crate::config::Config;
use crate::error::Result;

// == Memory Cache ==
/// TTL cache shared between tasks.
///
/// Cloning the handle shares the underlying store.
#[derive(Debug)]
pub struct MemoryCache<T> {
    store: Arc<Mutex<CacheStore<T>>>,
}

impl<T> Clone for MemoryCache<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<T: Clone> MemoryCache<T> {
    /// Creates an independent cache.
    ///
    /// # Arguments
    /// * `max_entries` - Maximum number of entries the cache can hold
    /// * `default_ttl` - TTL for entries stored without an explicit one
    pub fn new(max_entries: usize, default_ttl: Duration) -> Result<Self> {
        Ok(Self {
            store: Arc::new(Mutex::new(CacheStore::new(max_entries, default_ttl)?)),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.cache_max_size, config.cache_ttl())
    }

    pub async fn set(&self, key: impl Into<String>, value: T, ttl: Option<Duration>) -> Result<()> {
        self.store.lock().await.set(key.into(), value, ttl)
    }

    pub async fn get(&self, key: &str) -> Option<T> {
        self.store.lock().await.get(key)
    }

    /// Reads a live value without counting a hit or miss.
    pub async fn peek(&self, key: &str) -> Option<T> {
        self.store.lock().await.peek(key)
    }

    pub async fn has(&self, key: &str) -> bool {
        self.store.lock().await.has(key)
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.store.lock().await.delete(key)
    }

    pub async fn clear(&self) {
        self.store.lock().await.clear();
    }

    /// Sweeps expired entries, returning how many were removed.
    pub async fn cleanup(&self) -> usize {
        self.store.lock().await.cleanup_expired()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.lock().await.stats()
    }

    pub async fn len(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.store.lock().await.is_empty()
    }
}

static SHARED: OnceLock<MemoryCache<Value>> = OnceLock::new();

impl MemoryCache<Value> {
    // == Shared Instance ==
    /// Process-wide response cache built from [`Config::default`].
    pub fn shared() -> MemoryCache<Value> {
        SHARED
            .get_or_init(|| {
                let defaults = Config::default();
                MemoryCache {
                    store: Arc::new(Mutex::new(CacheStore::from_parts(
                        defaults.cache_max_size,
                        defaults.cache_ttl(),
                    ))),
                }
            })
            .clone()
    }
}
