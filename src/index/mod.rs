//! # Index Module
//!
//! Contract with the inverted-index backend and its Solr implementation.

pub mod solr;

pub use solr::{escape_term, FieldValue, SolrClient, SolrConfig};

use async_trait::async_trait;

use crate::core::error::SearchResult;
use crate::core::types::ProductDocument;
use crate::search::{SearchFilters, SearchPage};

/// Search and mutation operations of the index backend.
///
/// Search failures are reported as [`SearchError::Backend`]; write failures
/// as [`SearchError::Index`].
///
/// [`SearchError::Backend`]: crate::core::error::SearchError::Backend
/// [`SearchError::Index`]: crate::core::error::SearchError::Index
#[async_trait]
pub trait IndexRepository: Send + Sync {
    /// Run a query with already normalized filters
    async fn search(&self, filters: &SearchFilters) -> SearchResult<SearchPage>;

    /// Add a document, replacing any document with the same id
    async fn index_product(&self, product: &ProductDocument) -> SearchResult<()>;

    /// Remove a document by id; removing an unknown id succeeds
    async fn delete_product(&self, id: &str) -> SearchResult<()>;
}
