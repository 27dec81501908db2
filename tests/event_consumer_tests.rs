//! # Event Consumption Integration Tests
//!
//! Drives the delivery loop with in-memory deliveries through the event
//! processor and the search service down to a counting index.

mod common;

use common::{CountingIndex, FakeDelivery, Settlements, StubCatalog};
use futures::stream;
use product_search::broker::{consume_deliveries, AckPolicy, ConsumerState};
use product_search::caching::{InMemoryCache, InMemoryCacheConfig};
use async_trait::async_trait;
use product_search::events::{EventHandler, EventProcessor, ProductEvent};
use product_search::{SearchError, SearchFilters, SearchResult, SearchService};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

struct Pipeline {
    index: Arc<CountingIndex>,
    catalog: Arc<StubCatalog>,
    search: Arc<SearchService>,
    processor: EventProcessor,
}

fn pipeline(known_products: &[&str]) -> Pipeline {
    let index = Arc::new(CountingIndex::default());
    let catalog = Arc::new(StubCatalog::with(known_products));
    let cache = Arc::new(InMemoryCache::new(InMemoryCacheConfig::default()));
    let search = Arc::new(SearchService::new(
        index.clone(),
        cache,
        Duration::from_secs(60),
    ));
    let processor = EventProcessor::new(search.clone(), catalog.clone());

    Pipeline {
        index,
        catalog,
        search,
        processor,
    }
}

async fn consume(
    pipeline: &Pipeline,
    deliveries: Vec<FakeDelivery>,
    policy: AckPolicy,
) -> SearchResult<()> {
    let cancel = CancellationToken::new();
    let deliveries = stream::iter(deliveries.into_iter().map(Ok));
    consume_deliveries(deliveries, &pipeline.processor, policy, &cancel).await
}

#[tokio::test]
async fn test_duplicate_delete_events_are_not_deduplicated() {
    let pipeline = pipeline(&[]);
    let settlements = Arc::new(Settlements::default());

    let result = consume(
        &pipeline,
        vec![
            FakeDelivery::new("product.deleted", r#"{"id":"665f1c"}"#, &settlements),
            FakeDelivery::new("product.deleted", r#"{"id":"665f1c"}"#, &settlements),
        ],
        AckPolicy::AtMostOnce,
    )
    .await;

    // The stream ran dry, which a real channel only does when it breaks
    assert_eq!(ConsumerState::after(&result), ConsumerState::Failed);
    assert_eq!(pipeline.index.deletes(), 2);
    assert_eq!(settlements.acks(), 2);
    assert_eq!(pipeline.catalog.lookups.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_malformed_deliveries_never_reach_the_processor() {
    let pipeline = pipeline(&["1"]);
    let settlements = Arc::new(Settlements::default());

    let _ = consume(
        &pipeline,
        vec![
            FakeDelivery::new("product.created", "{\"id\":", &settlements),
            FakeDelivery::new("product.updated", r#"{"id":""}"#, &settlements),
            FakeDelivery::new("orders.created", r#"{"id":"1"}"#, &settlements),
        ],
        AckPolicy::RequeueOnHandlerError,
    )
    .await;

    assert_eq!(settlements.acks(), 3);
    assert_eq!(settlements.requeues(), 0);
    assert_eq!(pipeline.catalog.lookups.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.index.indexes(), 0);
}

#[tokio::test]
async fn test_created_and_updated_events_reindex_from_catalog() {
    let pipeline = pipeline(&["1", "2"]);
    let settlements = Arc::new(Settlements::default());

    let _ = consume(
        &pipeline,
        vec![
            FakeDelivery::new("product.created", r#"{"id":"1","name":"stale name"}"#, &settlements),
            FakeDelivery::new("product.updated", r#"{"id":"2"}"#, &settlements),
        ],
        AckPolicy::AtMostOnce,
    )
    .await;

    assert_eq!(pipeline.catalog.lookups.load(Ordering::SeqCst), 2);
    assert_eq!(pipeline.index.indexes(), 2);
    assert_eq!(settlements.acks(), 2);
}

#[tokio::test]
async fn test_update_for_deleted_product_is_a_no_op() {
    let pipeline = pipeline(&[]);
    let settlements = Arc::new(Settlements::default());

    let _ = consume(
        &pipeline,
        vec![FakeDelivery::new("product.updated", r#"{"id":"gone"}"#, &settlements)],
        AckPolicy::RequeueOnHandlerError,
    )
    .await;

    assert_eq!(pipeline.index.indexes(), 0);
    assert_eq!(settlements.acks(), 1);
    assert_eq!(settlements.requeues(), 0);
}

#[tokio::test]
async fn test_events_invalidate_cached_searches() {
    let pipeline = pipeline(&["1"]);
    let settlements = Arc::new(Settlements::default());

    pipeline
        .search
        .search_products(SearchFilters::query("floral"))
        .await
        .unwrap();
    pipeline
        .search
        .search_products(SearchFilters::query("floral"))
        .await
        .unwrap();
    assert_eq!(pipeline.index.searches(), 1);

    let _ = consume(
        &pipeline,
        vec![FakeDelivery::new("product.updated", r#"{"id":"1"}"#, &settlements)],
        AckPolicy::AtMostOnce,
    )
    .await;

    pipeline
        .search
        .search_products(SearchFilters::query("floral"))
        .await
        .unwrap();
    assert_eq!(pipeline.index.searches(), 2);
}

#[tokio::test]
async fn test_cancellation_before_next_delivery() {
    let pipeline = pipeline(&[]);
    let settlements = Arc::new(Settlements::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let deliveries = stream::iter(vec![Ok::<_, SearchError>(FakeDelivery::new(
        "product.deleted",
        r#"{"id":"1"}"#,
        &settlements,
    ))]);

    let result =
        consume_deliveries(deliveries, &pipeline.processor, AckPolicy::AtMostOnce, &cancel).await;

    assert!(result.is_ok());
    assert_eq!(ConsumerState::after(&result), ConsumerState::Stopped);
    assert_eq!(pipeline.index.deletes(), 0);
    assert_eq!(settlements.acks(), 0);
}

/// Handler that blocks each event until released
#[derive(Default)]
struct GatedHandler {
    started: Notify,
    release: Notify,
    handled: AtomicUsize,
}

#[async_trait]
impl EventHandler for GatedHandler {
    async fn handle(&self, _event: &ProductEvent) -> SearchResult<()> {
        self.started.notify_one();
        self.release.notified().await;
        self.handled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_cancellation_lets_in_flight_delivery_finish() {
    let handler = GatedHandler::default();
    let settlements = Arc::new(Settlements::default());
    let cancel = CancellationToken::new();

    let deliveries = stream::iter(vec![
        Ok::<_, SearchError>(FakeDelivery::new(
            "product.deleted",
            r#"{"id":"1"}"#,
            &settlements,
        )),
        Ok(FakeDelivery::new(
            "product.deleted",
            r#"{"id":"2"}"#,
            &settlements,
        )),
    ]);

    let cancel_mid_delivery = async {
        handler.started.notified().await;
        cancel.cancel();
        handler.release.notify_one();
    };

    let (result, ()) = tokio::join!(
        consume_deliveries(deliveries, &handler, AckPolicy::AtMostOnce, &cancel),
        cancel_mid_delivery,
    );

    assert!(result.is_ok());
    assert_eq!(ConsumerState::after(&result), ConsumerState::Stopped);
    assert_eq!(handler.handled.load(Ordering::SeqCst), 1);
    assert_eq!(settlements.acks(), 1);
    assert_eq!(settlements.requeues(), 0);
}
