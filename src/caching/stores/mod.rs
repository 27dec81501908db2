//! # Cache Stores Module
//!
//! The [`CacheStore`] contract shared by every tier, plus the in-memory and
//! Redis implementations.

pub mod memory;
pub mod redis_store;

pub use memory::{InMemoryCache, InMemoryCacheConfig};
pub use redis_store::{RedisCache, RedisCacheConfig};

use super::CacheResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Cache entry with metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached value
    pub value: Vec<u8>,

    /// When the entry was created
    pub created_at: Instant,

    /// When the entry expires; `None` never expires
    pub expires_at: Option<Instant>,

    /// Number of times this entry has been read
    pub access_count: u64,

    /// Recency stamp of the last read or write, used for LRU ordering
    pub last_accessed: u64,
}

impl CacheEntry {
    /// Create a new cache entry; a zero `ttl` never expires
    pub fn new(value: Vec<u8>, ttl: Duration, stamp: u64) -> Self {
        let now = Instant::now();
        Self {
            value,
            created_at: now,
            expires_at: if ttl.is_zero() { None } else { Some(now + ttl) },
            access_count: 0,
            last_accessed: stamp,
        }
    }

    /// Check if the entry is expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Check expiry against a given instant
    pub fn is_expired_at(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |expires_at| now >= expires_at)
    }

    /// Mark the entry as accessed
    pub fn mark_accessed(&mut self, stamp: u64) {
        self.access_count += 1;
        self.last_accessed = stamp;
    }

    /// Get the age of the entry
    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Time until expiration, `None` for entries without expiry
    pub fn ttl(&self) -> Option<Duration> {
        self.expires_at
            .map(|expires_at| expires_at.saturating_duration_since(Instant::now()))
    }
}

/// Key to opaque-bytes cache contract shared by every tier.
///
/// Read and write paths never fail: a tier that cannot serve a request
/// behaves like a miss (or a no-op) and logs the problem. Only [`flush`],
/// an explicit administrative operation, reports failure.
///
/// A `ttl` of [`Duration::ZERO`] means "use the tier's default".
///
/// [`flush`]: CacheStore::flush
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Get a value; expired entries are reported as absent
    async fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Set a value with TTL
    async fn set(&self, key: &str, value: &[u8], ttl: Duration);

    /// Delete a value
    async fn delete(&self, key: &str);

    /// Remove every entry owned by this store
    async fn flush(&self) -> CacheResult<()>;

    /// Get cache statistics
    async fn stats(&self) -> CacheStoreStats;

    /// Perform health check
    async fn health_check(&self) -> bool;
}

/// Cache store statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStoreStats {
    /// Number of entries, when the store can count them cheaply
    pub entries: usize,

    /// Number of hits
    pub hits: u64,

    /// Number of misses
    pub misses: u64,

    /// Number of capacity evictions
    pub evictions: u64,

    /// Number of expired entries cleaned up
    pub expired_cleanups: u64,

    /// Number of backend errors swallowed by the read/write path
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_without_ttl_never_expires() {
        let entry = CacheEntry::new(b"v".to_vec(), Duration::ZERO, 0);
        assert!(entry.ttl().is_none());
        assert!(!entry.is_expired_at(Instant::now() + Duration::from_secs(3600)));
    }

    #[test]
    fn test_entry_expiry() {
        let entry = CacheEntry::new(b"v".to_vec(), Duration::from_secs(10), 0);
        assert!(!entry.is_expired());
        assert!(entry.ttl().unwrap() <= Duration::from_secs(10));
        assert!(entry.is_expired_at(Instant::now() + Duration::from_secs(11)));
    }

    #[test]
    fn test_mark_accessed_updates_recency() {
        let mut entry = CacheEntry::new(b"v".to_vec(), Duration::from_secs(10), 1);
        entry.mark_accessed(7);
        assert_eq!(entry.access_count, 1);
        assert_eq!(entry.last_accessed, 7);
    }
}
