//! Event router: maps each product event to a search service operation.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

use super::{EventDecodeError, EventHandler, EventType, ProductEvent};
use crate::catalog::ProductCatalog;
use crate::core::error::{SearchError, SearchResult};
use crate::search::SearchService;

/// Routes product events into the index.
///
/// Created and updated events re-read the product from the catalog of record
/// and index that state; a product that no longer exists is skipped. Deleted
/// events remove the document using only the event's id.
pub struct EventProcessor {
    search: Arc<SearchService>,
    catalog: Arc<dyn ProductCatalog>,
}

impl EventProcessor {
    pub fn new(search: Arc<SearchService>, catalog: Arc<dyn ProductCatalog>) -> Self {
        Self { search, catalog }
    }

    async fn upsert(&self, event: &ProductEvent) -> SearchResult<()> {
        let product = match self.catalog.get_product_by_id(&event.product_id).await {
            Ok(product) => product,
            Err(e) if e.is_not_found() => {
                // Deleted before this notification was processed
                info!(
                    product_id = %event.product_id,
                    event_type = %event.event_type,
                    "Product no longer in catalog, skipping"
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.search.index_product(&product).await
    }
}

#[async_trait]
impl EventHandler for EventProcessor {
    async fn handle(&self, event: &ProductEvent) -> SearchResult<()> {
        debug!(
            product_id = %event.product_id,
            event_type = %event.event_type,
            "Processing product event"
        );

        match event.event_type {
            EventType::Created | EventType::Updated => self.upsert(event).await,
            EventType::Deleted => self.search.delete_product(&event.product_id).await,
        }
    }
}

impl From<EventDecodeError> for SearchError {
    fn from(err: EventDecodeError) -> Self {
        match err {
            EventDecodeError::UnknownRoutingKey(key) => SearchError::unsupported_event(key),
            other => SearchError::validation(other.to_string()),
        }
    }
}
