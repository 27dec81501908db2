//! # Product Search Library
//!
//! Keeps a Solr product index eventually consistent with the catalog of
//! record and serves product searches through a two-tier cache.
//!
//! ## Data flow
//! - **Indexing**: catalog mutation → broker publish → [`broker::AmqpConsumer`]
//!   decodes the delivery → [`events::EventProcessor`] re-reads the product →
//!   [`search::SearchService`] updates the index → caches are flushed
//! - **Searching**: filters → [`search::SearchService`] → layered cache lookup
//!   → on a miss, [`index::SolrClient`] → result cached → response
//!
//! The HTTP surface is not part of this crate; it consumes
//! [`SearchService::search_products`] and [`SearchService::flush_caches`].

/// Error taxonomy, configuration and the product document type
pub mod core;

/// Local, distributed and layered cache tiers
pub mod caching;

/// Filters, cache keys and the cache-aside search service
pub mod search;

/// Index backend contract and the Solr adapter
pub mod index;

/// Client for the catalog of record
pub mod catalog;

/// Product change events and their routing into the index
pub mod events;

/// AMQP consumer turning broker deliveries into events
pub mod broker;

/// Structured logging
pub mod observability;

/// Main error type used throughout the crate
pub use core::error::{SearchError, SearchResult};

/// Service configuration
pub use core::config::ServiceConfig;

pub use core::types::ProductDocument;
pub use search::{SearchFilters, SearchPage, SearchService};
