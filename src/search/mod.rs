//! # Search Module
//!
//! Cache-aside product search with invalidate-on-write.
//!
//! [`SearchService`] normalizes and validates [`SearchFilters`], looks the
//! normalized tuple up in the layered cache, and on a miss queries the
//! [`IndexRepository`](crate::index::IndexRepository), caching the serialized
//! page before returning it. Any successful index mutation flushes every
//! cached result.

pub mod filters;
pub mod service;

pub use filters::SearchFilters;
pub use service::SearchService;

use serde::{Deserialize, Serialize};

use crate::core::types::ProductDocument;

/// One page of search results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub items: Vec<ProductDocument>,
    pub page: i64,
    pub size: i64,
    /// Number of documents matching the filters across all pages
    pub total: i64,
}
