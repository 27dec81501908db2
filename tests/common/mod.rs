//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use product_search::broker::InboundDelivery;
use product_search::caching::{CacheError, CacheResult, CacheStore, CacheStoreStats};
use product_search::catalog::ProductCatalog;
use product_search::index::IndexRepository;
use product_search::{ProductDocument, SearchError, SearchFilters, SearchPage, SearchResult};

/// Index backend returning one fixed document and counting every call
#[derive(Default)]
pub struct CountingIndex {
    pub searches: AtomicUsize,
    pub indexed: AtomicUsize,
    pub deleted: AtomicUsize,
    pub last_filters: Mutex<Option<SearchFilters>>,
}

impl CountingIndex {
    pub fn searches(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deleted.load(Ordering::SeqCst)
    }

    pub fn indexes(&self) -> usize {
        self.indexed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexRepository for CountingIndex {
    async fn search(&self, filters: &SearchFilters) -> SearchResult<SearchPage> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        *self.last_filters.lock() = Some(filters.clone());

        Ok(SearchPage {
            items: vec![ProductDocument::new("665f1c", "Floral Bloom")],
            page: filters.page,
            size: filters.size,
            total: 1,
        })
    }

    async fn index_product(&self, _product: &ProductDocument) -> SearchResult<()> {
        self.indexed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete_product(&self, _id: &str) -> SearchResult<()> {
        self.deleted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Map-backed cache tier without expiry, optionally failing flushes
#[derive(Default)]
pub struct MapCache {
    pub values: Mutex<HashMap<String, Vec<u8>>>,
    pub gets: AtomicUsize,
    pub fail_flush: bool,
}

impl MapCache {
    pub fn failing_flush() -> Self {
        Self {
            fail_flush: true,
            ..Default::default()
        }
    }
}

#[async_trait]
impl CacheStore for MapCache {
    async fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.values.lock().get(key).cloned()
    }

    async fn set(&self, key: &str, value: &[u8], _ttl: Duration) {
        self.values.lock().insert(key.to_string(), value.to_vec());
    }

    async fn delete(&self, key: &str) {
        self.values.lock().remove(key);
    }

    async fn flush(&self) -> CacheResult<()> {
        if self.fail_flush {
            return Err(CacheError::Unavailable);
        }
        self.values.lock().clear();
        Ok(())
    }

    async fn stats(&self) -> CacheStoreStats {
        CacheStoreStats {
            entries: self.values.lock().len(),
            ..Default::default()
        }
    }

    async fn health_check(&self) -> bool {
        !self.fail_flush
    }
}

/// Catalog that knows a fixed set of product ids
#[derive(Default)]
pub struct StubCatalog {
    pub known: Vec<String>,
    pub lookups: AtomicUsize,
}

impl StubCatalog {
    pub fn with(ids: &[&str]) -> Self {
        Self {
            known: ids.iter().map(|id| id.to_string()).collect(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ProductCatalog for StubCatalog {
    async fn get_product_by_id(&self, id: &str) -> SearchResult<ProductDocument> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.known.iter().any(|known| known == id) {
            Ok(ProductDocument::new(id, "Catalog product"))
        } else {
            Err(SearchError::not_found("product", id))
        }
    }
}

/// Acks and requeues recorded by [`FakeDelivery`]
#[derive(Default)]
pub struct Settlements {
    pub acks: AtomicUsize,
    pub requeues: AtomicUsize,
}

impl Settlements {
    pub fn acks(&self) -> usize {
        self.acks.load(Ordering::SeqCst)
    }

    pub fn requeues(&self) -> usize {
        self.requeues.load(Ordering::SeqCst)
    }
}

pub struct FakeDelivery {
    pub routing_key: String,
    pub body: Vec<u8>,
    pub settlements: Arc<Settlements>,
}

impl FakeDelivery {
    pub fn new(routing_key: &str, body: &str, settlements: &Arc<Settlements>) -> Self {
        Self {
            routing_key: routing_key.to_string(),
            body: body.as_bytes().to_vec(),
            settlements: settlements.clone(),
        }
    }
}

#[async_trait]
impl InboundDelivery for FakeDelivery {
    fn routing_key(&self) -> &str {
        &self.routing_key
    }

    fn body(&self) -> &[u8] {
        &self.body
    }

    async fn ack(&self) -> SearchResult<()> {
        self.settlements.acks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn nack_requeue(&self) -> SearchResult<()> {
        self.settlements.requeues.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
