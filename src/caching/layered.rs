//! # Layered Cache
//!
//! Coordinates the local tier (L1) and the optional distributed tier (L2)
//! behind the [`CacheStore`] contract.
//!
//! - **get**: L1 first; on an L1 miss, L2; an L2 hit is copied into L1 with the
//!   warm TTL (when positive) before it is returned
//! - **set**: L2 first with the caller's TTL, then L1 with the caller's TTL or,
//!   when that is zero, the warm TTL
//! - **delete**: both tiers, unconditionally
//! - **flush**: L1 best-effort, then L2; the L2 error is returned

use super::{CacheResult, CacheStore, CacheStoreStats};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Statistics across both tiers
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LayeredCacheStats {
    /// Reads served by the local tier
    pub local_hits: u64,

    /// Reads served by the distributed tier
    pub distributed_hits: u64,

    /// Reads that missed both tiers
    pub misses: u64,

    /// Hit ratio over all reads
    pub hit_ratio: f64,

    /// Local tier statistics
    pub local: CacheStoreStats,

    /// Distributed tier statistics, when the tier is configured
    pub distributed: Option<CacheStoreStats>,
}

/// Two-tier cache
pub struct LayeredCache {
    /// Local cache (L1)
    local: Arc<dyn CacheStore>,

    /// Distributed cache (L2)
    distributed: Option<Arc<dyn CacheStore>>,

    /// TTL used when backfilling L1 and when a caller passes a zero TTL
    warm_ttl: Duration,

    local_hits: AtomicU64,
    distributed_hits: AtomicU64,
    misses: AtomicU64,
}

impl LayeredCache {
    /// Wire the tiers together
    pub fn new(
        local: Arc<dyn CacheStore>,
        distributed: Option<Arc<dyn CacheStore>>,
        warm_ttl: Duration,
    ) -> Self {
        Self {
            local,
            distributed,
            warm_ttl,
            local_hits: AtomicU64::new(0),
            distributed_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Whether a distributed tier is configured
    pub fn has_distributed_tier(&self) -> bool {
        self.distributed.is_some()
    }

    /// Warm TTL used for local backfills
    pub fn warm_ttl(&self) -> Duration {
        self.warm_ttl
    }

    /// Statistics for both tiers
    pub async fn layered_stats(&self) -> LayeredCacheStats {
        let local_hits = self.local_hits.load(Ordering::Relaxed);
        let distributed_hits = self.distributed_hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let reads = local_hits + distributed_hits + misses;

        let distributed = match &self.distributed {
            Some(distributed) => Some(distributed.stats().await),
            None => None,
        };

        LayeredCacheStats {
            local_hits,
            distributed_hits,
            misses,
            hit_ratio: if reads > 0 {
                (local_hits + distributed_hits) as f64 / reads as f64
            } else {
                0.0
            },
            local: self.local.stats().await,
            distributed,
        }
    }
}

#[async_trait]
impl CacheStore for LayeredCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        if let Some(value) = self.local.get(key).await {
            self.local_hits.fetch_add(1, Ordering::Relaxed);
            debug!(key, "Cache hit in local tier");
            return Some(value);
        }

        if let Some(distributed) = &self.distributed {
            if let Some(value) = distributed.get(key).await {
                self.distributed_hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Cache hit in distributed tier");

                if !self.warm_ttl.is_zero() {
                    self.local.set(key, &value, self.warm_ttl).await;
                }
                return Some(value);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(key, "Cache miss in all tiers");
        None
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) {
        if let Some(distributed) = &self.distributed {
            distributed.set(key, value, ttl).await;
        }

        let local_ttl = if ttl.is_zero() { self.warm_ttl } else { ttl };
        self.local.set(key, value, local_ttl).await;
    }

    async fn delete(&self, key: &str) {
        self.local.delete(key).await;
        if let Some(distributed) = &self.distributed {
            distributed.delete(key).await;
        }
    }

    async fn flush(&self) -> CacheResult<()> {
        if let Err(e) = self.local.flush().await {
            warn!(error = %e, "Local cache flush failed");
        }

        if let Some(distributed) = &self.distributed {
            distributed.flush().await?;
        }

        info!("All cache tiers flushed");
        Ok(())
    }

    async fn stats(&self) -> CacheStoreStats {
        let local = self.local.stats().await;

        CacheStoreStats {
            entries: local.entries,
            hits: self.local_hits.load(Ordering::Relaxed)
                + self.distributed_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: local.evictions,
            expired_cleanups: local.expired_cleanups,
            errors: match &self.distributed {
                Some(distributed) => distributed.stats().await.errors,
                None => 0,
            },
        }
    }

    async fn health_check(&self) -> bool {
        let mut healthy = self.local.health_check().await;

        if let Some(distributed) = &self.distributed {
            if !distributed.health_check().await {
                // The service keeps working without L2, only report it
                warn!("Distributed cache health check failed");
                healthy = false;
            }
        }

        healthy
    }
}
