//! # In-Memory Cache Store
//!
//! Bounded local cache tier with LRU eviction, per-entry TTL and periodic
//! cleanup of expired entries. Every operation is synchronous under the hood
//! (sharded `DashMap` locks), so it never suspends the calling task.

use super::{CacheEntry, CacheStore, CacheStoreStats};
use crate::caching::CacheResult;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::debug;

/// Entry bound applied when the configured maximum is zero
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// In-memory cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryCacheConfig {
    /// Maximum number of entries
    ///
    /// The bound is soft: eviction and insertion are separate steps, so
    /// concurrent inserts of distinct keys can overshoot it briefly until
    /// the next insert evicts again.
    pub max_entries: usize,

    /// TTL applied when a caller passes a zero TTL
    #[serde(with = "humantime_serde")]
    pub default_ttl: Duration,

    /// Cleanup interval for expired entries
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for InMemoryCacheConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            default_ttl: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expired_cleanups: AtomicU64,
}

/// In-memory cache implementation
pub struct InMemoryCache {
    config: InMemoryCacheConfig,

    entries: Arc<DashMap<String, CacheEntry>>,

    /// Monotonic recency clock for LRU ordering
    clock: AtomicU64,

    counters: Arc<Counters>,

    cleanup_task: Option<JoinHandle<()>>,
}

impl InMemoryCache {
    /// Create a new in-memory cache.
    ///
    /// The expired-entry reaper only runs when the cache is created inside a
    /// Tokio runtime; expired entries are still hidden from reads without it.
    pub fn new(mut config: InMemoryCacheConfig) -> Self {
        if config.max_entries == 0 {
            config.max_entries = DEFAULT_MAX_ENTRIES;
        }

        let entries = Arc::new(DashMap::new());
        let counters = Arc::new(Counters::default());

        let cleanup_task = match tokio::runtime::Handle::try_current() {
            Ok(handle) if !config.cleanup_interval.is_zero() => {
                let entries = entries.clone();
                let counters = counters.clone();
                let cleanup_interval = config.cleanup_interval;

                Some(handle.spawn(async move {
                    let mut interval = interval(cleanup_interval);
                    loop {
                        interval.tick().await;
                        Self::cleanup_expired_entries(&entries, &counters);
                    }
                }))
            }
            _ => None,
        };

        Self {
            config,
            entries,
            clock: AtomicU64::new(0),
            counters,
            cleanup_task,
        }
    }

    /// Effective configuration
    pub fn config(&self) -> &InMemoryCacheConfig {
        &self.config
    }

    /// Number of entries currently stored, expired or not
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Remove expired entries
    fn cleanup_expired_entries(entries: &DashMap<String, CacheEntry>, counters: &Counters) -> usize {
        let now = Instant::now();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired_at(now));
        let cleaned = before.saturating_sub(entries.len());

        if cleaned > 0 {
            counters
                .expired_cleanups
                .fetch_add(cleaned as u64, Ordering::Relaxed);
            debug!(cleaned, "Cleaned up expired cache entries");
        }
        cleaned
    }

    /// Make room for one new key, dropping expired entries first and then the
    /// least recently used ones
    fn evict_if_needed(&self) {
        if self.entries.len() < self.config.max_entries {
            return;
        }

        Self::cleanup_expired_entries(&self.entries, &self.counters);

        while self.entries.len() >= self.config.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|entry| entry.value().last_accessed)
                .map(|entry| entry.key().clone());

            match oldest {
                Some(key) => {
                    if self.entries.remove(&key).is_some() {
                        self.counters.evictions.fetch_add(1, Ordering::Relaxed);
                        debug!(key = %key, "Evicted least recently used cache entry");
                    }
                }
                None => break,
            }
        }
    }
}

impl Drop for InMemoryCache {
    fn drop(&mut self) {
        if let Some(task) = self.cleanup_task.take() {
            task.abort();
        }
    }
}

#[async_trait]
impl CacheStore for InMemoryCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let stamp = self.tick();
        let mut expired = false;

        if let Some(mut entry) = self.entries.get_mut(key) {
            if entry.is_expired() {
                expired = true;
            } else {
                entry.mark_accessed(stamp);
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                return Some(entry.value.clone());
            }
        }

        if expired && self.entries.remove_if(key, |_, entry| entry.is_expired()).is_some() {
            self.counters.expired_cleanups.fetch_add(1, Ordering::Relaxed);
        }

        self.counters.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) {
        let ttl = if ttl.is_zero() { self.config.default_ttl } else { ttl };

        if !self.entries.contains_key(key) {
            self.evict_if_needed();
        }

        let entry = CacheEntry::new(value.to_vec(), ttl, self.tick());
        self.entries.insert(key.to_string(), entry);
    }

    async fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    async fn flush(&self) -> CacheResult<()> {
        let entry_count = self.entries.len();
        self.entries.clear();
        debug!(entries = entry_count, "Flushed in-memory cache");
        Ok(())
    }

    async fn stats(&self) -> CacheStoreStats {
        CacheStoreStats {
            entries: self.entries.len(),
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            evictions: self.counters.evictions.load(Ordering::Relaxed),
            expired_cleanups: self.counters.expired_cleanups.load(Ordering::Relaxed),
            errors: 0,
        }
    }

    async fn health_check(&self) -> bool {
        let test_key = "__health_check__";
        let test_value = b"health_check_value";

        self.set(test_key, test_value, Duration::from_secs(1)).await;
        let retrieved = self.get(test_key).await;
        self.delete(test_key).await;

        retrieved.as_deref() == Some(&test_value[..])
    }
}
