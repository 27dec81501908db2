//! # Redis Cache Store
//!
//! Distributed cache tier shared by every service instance.
//!
//! The connection is established lazily on first use, so a Redis outage at
//! startup never prevents the service from running. Reads, writes and deletes
//! degrade to a miss or a no-op on any backend problem (logged, counted);
//! only [`CacheStore::flush`] returns the error.

use super::{CacheStore, CacheStoreStats};
use crate::caching::{CacheError, CacheResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use redis::{aio::ConnectionManager, AsyncCommands, Client, RedisResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::observability::redact_url;

/// Redis cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedisCacheConfig {
    /// Redis connection URL
    pub url: String,

    /// Key prefix for all cache entries; flush only removes keys under it
    pub key_prefix: String,

    /// Timeout for establishing the connection
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Timeout for a single cache operation
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Duration,

    /// Minimum delay between connection attempts after a failed one
    #[serde(with = "humantime_serde")]
    pub reconnect_backoff: Duration,
}

impl Default for RedisCacheConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            key_prefix: "search:".to_string(),
            connect_timeout: Duration::from_secs(2),
            operation_timeout: Duration::from_millis(250),
            reconnect_backoff: Duration::from_secs(5),
        }
    }
}

/// Redis cache implementation
pub struct RedisCache {
    config: RedisCacheConfig,

    client: Client,

    connection: Mutex<Option<ConnectionManager>>,

    /// Held by the one task currently dialing Redis
    dialing: tokio::sync::Mutex<()>,

    /// When the last connection attempt failed
    last_connect_failure: Mutex<Option<Instant>>,

    hits: AtomicU64,
    misses: AtomicU64,
    errors: AtomicU64,
}

impl RedisCache {
    /// Create a new Redis cache. Only the URL is checked here; no connection
    /// is made until the first operation.
    pub fn new(config: RedisCacheConfig) -> CacheResult<Self> {
        let client = Client::open(config.url.as_str())?;

        Ok(Self {
            config,
            client,
            connection: Mutex::new(None),
            dialing: tokio::sync::Mutex::new(()),
            last_connect_failure: Mutex::new(None),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        })
    }

    /// Get the full cache key with prefix
    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.config.key_prefix, key)
    }

    /// Get the shared connection, connecting on first use
    ///
    /// Callers arriving while another task is dialing get
    /// [`CacheError::Unavailable`] straight away instead of queueing behind
    /// the connect timeout.
    async fn connection(&self) -> CacheResult<ConnectionManager> {
        if let Some(conn) = self.cached_connection() {
            return Ok(conn);
        }

        let _dialing = self
            .dialing
            .try_lock()
            .map_err(|_| CacheError::Unavailable)?;

        // Another task may have connected while we checked
        if let Some(conn) = self.cached_connection() {
            return Ok(conn);
        }

        let last_failure = *self.last_connect_failure.lock();
        let backing_off = last_failure
            .map_or(false, |failed_at| failed_at.elapsed() < self.config.reconnect_backoff);
        if backing_off {
            return Err(CacheError::Unavailable);
        }

        let connected = match timeout(
            self.config.connect_timeout,
            ConnectionManager::new(self.client.clone()),
        )
        .await
        {
            Ok(Ok(conn)) => Ok(conn),
            Ok(Err(e)) => Err(CacheError::Redis(e)),
            Err(_) => Err(CacheError::Timeout),
        };

        match connected {
            Ok(conn) => {
                info!(url = %redact_url(&self.config.url), "Redis cache connected");
                *self.last_connect_failure.lock() = None;
                *self.connection.lock() = Some(conn.clone());
                Ok(conn)
            }
            Err(e) => {
                *self.last_connect_failure.lock() = Some(Instant::now());
                Err(e)
            }
        }
    }

    fn cached_connection(&self) -> Option<ConnectionManager> {
        self.connection.lock().clone()
    }

    /// Run one operation against Redis with the configured timeout
    async fn execute<T, F, Fut>(&self, operation: F) -> CacheResult<T>
    where
        F: FnOnce(ConnectionManager) -> Fut,
        Fut: Future<Output = RedisResult<T>>,
    {
        let conn = self.connection().await?;
        match timeout(self.config.operation_timeout, operation(conn)).await {
            Ok(result) => result.map_err(CacheError::Redis),
            Err(_) => Err(CacheError::Timeout),
        }
    }

    fn record_error(&self, operation: &str, key: &str, error: &CacheError) {
        self.errors.fetch_add(1, Ordering::Relaxed);
        warn!(operation, key, error = %error, "Redis cache operation failed");
    }
}

/// `PX` argument for a TTL: `None` for no expiry, otherwise at least 1 ms
fn expiry_millis(ttl: Duration) -> Option<u64> {
    if ttl.is_zero() {
        return None;
    }
    Some(u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1))
}

#[async_trait]
impl CacheStore for RedisCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        let full_key = self.full_key(key);

        let result = self
            .execute(|mut conn| async move { conn.get::<_, Option<Vec<u8>>>(&full_key).await })
            .await;

        match result {
            Ok(Some(value)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Redis cache hit");
                Some(value)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(key, "Redis cache miss");
                None
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                self.record_error("get", key, &e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) {
        let full_key = self.full_key(key);
        let value = value.to_vec();
        let millis = expiry_millis(ttl);

        let result = self
            .execute(|mut conn| async move {
                let mut cmd = redis::cmd("SET");
                cmd.arg(&full_key).arg(value);
                if let Some(millis) = millis {
                    cmd.arg("PX").arg(millis);
                }
                cmd.query_async::<_, ()>(&mut conn).await
            })
            .await;

        if let Err(e) = result {
            self.record_error("set", key, &e);
        }
    }

    async fn delete(&self, key: &str) {
        let full_key = self.full_key(key);

        let result = self
            .execute(|mut conn| async move { conn.del::<_, i64>(&full_key).await })
            .await;

        if let Err(e) = result {
            self.record_error("delete", key, &e);
        }
    }

    async fn flush(&self) -> CacheResult<()> {
        // SCAN for every key under our prefix and delete batch by batch
        let pattern = format!("{}*", self.config.key_prefix);
        let mut conn = self.connection().await?;
        let mut cursor: u64 = 0;
        let mut deleted: i64 = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = timeout(
                self.config.operation_timeout,
                redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(&pattern)
                    .arg("COUNT")
                    .arg(1000)
                    .query_async(&mut conn),
            )
            .await
            .map_err(|_| CacheError::Timeout)??;

            if !keys.is_empty() {
                deleted += timeout(self.config.operation_timeout, conn.del::<_, i64>(&keys))
                    .await
                    .map_err(|_| CacheError::Timeout)??;
            }

            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }

        info!(deleted, prefix = %self.config.key_prefix, "Flushed Redis cache");
        Ok(())
    }

    async fn stats(&self) -> CacheStoreStats {
        CacheStoreStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            ..Default::default()
        }
    }

    async fn health_check(&self) -> bool {
        let result = self
            .execute(|mut conn| async move {
                redis::cmd("PING").query_async::<_, String>(&mut conn).await
            })
            .await;

        matches!(result, Ok(response) if response == "PONG")
    }
}
