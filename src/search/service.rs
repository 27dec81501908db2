//! Search service: cache-aside reads and invalidate-on-write.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{SearchFilters, SearchPage};
use crate::caching::{CacheStore, CacheStoreStats};
use crate::core::error::{SearchError, SearchResult};
use crate::core::types::ProductDocument;
use crate::index::IndexRepository;

/// Coordinates the index backend and the result cache
pub struct SearchService {
    index: Arc<dyn IndexRepository>,
    cache: Arc<dyn CacheStore>,
    cache_ttl: Duration,
}

impl SearchService {
    pub fn new(
        index: Arc<dyn IndexRepository>,
        cache: Arc<dyn CacheStore>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            index,
            cache,
            cache_ttl,
        }
    }

    /// Search products, serving repeated queries from the cache
    pub async fn search_products(&self, filters: SearchFilters) -> SearchResult<SearchPage> {
        let filters = filters.prepare()?;
        let key = filters.cache_key();

        if let Some(bytes) = self.cache.get(&key).await {
            match serde_json::from_slice::<SearchPage>(&bytes) {
                Ok(page) => {
                    debug!(key = %key, "Search served from cache");
                    return Ok(page);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Discarding undecodable cached search result");
                    self.cache.delete(&key).await;
                }
            }
        }

        let started = Instant::now();
        let page = self.index.search(&filters).await?;
        debug!(
            key = %key,
            total = page.total,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Search served from index"
        );

        match serde_json::to_vec(&page) {
            Ok(bytes) => self.cache.set(&key, &bytes, self.cache_ttl).await,
            Err(e) => warn!(key = %key, error = %e, "Could not serialize search result for caching"),
        }

        Ok(page)
    }

    /// Index or update a product, then invalidate cached results
    pub async fn index_product(&self, product: &ProductDocument) -> SearchResult<()> {
        if product.id.trim().is_empty() {
            return Err(SearchError::validation("product id is required"));
        }

        self.index.index_product(product).await?;
        info!(product_id = %product.id, "Product indexed");
        self.invalidate_caches().await;
        Ok(())
    }

    /// Remove a product from the index, then invalidate cached results
    pub async fn delete_product(&self, id: &str) -> SearchResult<()> {
        if id.trim().is_empty() {
            return Err(SearchError::validation("product id is required"));
        }

        self.index.delete_product(id).await?;
        info!(product_id = %id, "Product removed from index");
        self.invalidate_caches().await;
        Ok(())
    }

    /// Administrative flush of every cache tier; failures are returned
    pub async fn flush_caches(&self) -> SearchResult<()> {
        self.cache.flush().await?;
        info!("Search caches flushed");
        Ok(())
    }

    /// Cache statistics for the admin surface
    pub async fn cache_stats(&self) -> CacheStoreStats {
        self.cache.stats().await
    }

    // Any mutation can change any query's result set, so drop everything
    async fn invalidate_caches(&self) {
        if let Err(e) = self.cache.flush().await {
            warn!(error = %e, "Cache invalidation after index write failed");
        }
    }
}
