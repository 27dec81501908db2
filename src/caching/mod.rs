//! # Caching System Module
//!
//! Two-tier caching for serialized search results.
//!
//! ## Architecture
//! 1. **Local tier** ([`InMemoryCache`]): bounded in-process cache with per-entry
//!    TTL and LRU eviction
//! 2. **Distributed tier** ([`RedisCache`]): optional cache shared by every
//!    instance; unavailability degrades to a miss, never to an error
//! 3. **Layered cache** ([`LayeredCache`]): composes both tiers behind the same
//!    [`CacheStore`] contract, reading local first and warming the local tier
//!    on a distributed hit
//!
//! Values are opaque bytes; callers serialize and deserialize them.
//!
//! ## Usage Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use product_search::caching::{CacheStore, InMemoryCache, InMemoryCacheConfig, LayeredCache};
//!
//! # async fn example() -> Result<(), product_search::caching::CacheError> {
//! let local = Arc::new(InMemoryCache::new(InMemoryCacheConfig::default()));
//! let cache = LayeredCache::new(local, None, Duration::from_secs(60));
//!
//! cache.set("search:abc", b"{\"items\":[]}", Duration::from_secs(60)).await;
//! if let Some(bytes) = cache.get("search:abc").await {
//!     // deserialize and use
//! #   let _ = bytes;
//! }
//! cache.flush().await?;
//! # Ok(())
//! # }
//! ```

pub mod layered;
pub mod stores;

pub use layered::{LayeredCache, LayeredCacheStats};
pub use stores::{
    CacheEntry, CacheStore, CacheStoreStats, InMemoryCache, InMemoryCacheConfig, RedisCache,
    RedisCacheConfig,
};

use crate::core::error::SearchError;

/// Cache operation result
pub type CacheResult<T> = Result<T, CacheError>;

/// Cache-specific error types
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache store error: {message}")]
    Store { message: String },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Cache configuration error: {message}")]
    Configuration { message: String },

    #[error("Cache operation timeout")]
    Timeout,

    #[error("Cache not available")]
    Unavailable,
}

impl From<CacheError> for SearchError {
    fn from(err: CacheError) -> Self {
        SearchError::cache(err.to_string())
    }
}
