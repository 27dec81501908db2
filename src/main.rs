//! # Search Indexer - Main Entry Point
//!
//! Consumes product change events and keeps the search index in sync.
//!
//! Startup sequence:
//! 1. Load and validate configuration (`SEARCH_CONFIG_PATH`, `SEARCH_*` overrides)
//! 2. Initialise structured logging
//! 3. Build the cache tiers, the Solr adapter, the search service, the catalog
//!    client and the event processor
//! 4. Connect to the broker and consume until SIGINT/SIGTERM
//!
//! A fatal consumer error ends the process with a non-zero exit code so the
//! supervisor restarts it.

use anyhow::Context;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use product_search::broker::AmqpConsumer;
use product_search::caching::{CacheStore, InMemoryCache, LayeredCache, RedisCache};
use product_search::catalog::HttpCatalogClient;
use product_search::events::EventProcessor;
use product_search::index::SolrClient;
use product_search::observability::{init_logging, redact_url};
use product_search::{SearchService, ServiceConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServiceConfig::load()
        .await
        .context("failed to load configuration")?;

    init_logging(&config.logging).context("failed to initialise logging")?;

    info!("Starting search indexer");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let cache = build_cache(&config)?;
    let index = Arc::new(SolrClient::new(&config.index).context("failed to build Solr client")?);
    let search = Arc::new(SearchService::new(index, cache, config.cache.ttl));
    let catalog =
        Arc::new(HttpCatalogClient::new(&config.catalog).context("failed to build catalog client")?);
    let processor = EventProcessor::new(search, catalog);

    info!(
        solr = %config.index.url,
        core = %config.index.core,
        catalog = %config.catalog.url,
        cache_ttl = %humantime::format_duration(config.cache.ttl),
        "Components initialised"
    );

    let consumer = AmqpConsumer::connect(&config.broker)
        .await
        .context("failed to set up broker consumer")?;

    let cancel = CancellationToken::new();
    let signal_task = tokio::spawn(shutdown_signal(cancel.clone()));

    let result = consumer.run(&processor, cancel.clone()).await;

    signal_task.abort();
    if let Err(e) = consumer.close().await {
        warn!(error = %e, "Failed to close broker connection cleanly");
    }

    match result {
        Ok(()) => {
            info!("Search indexer shutdown complete");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Consumer stopped unexpectedly");
            Err(anyhow::Error::new(e).context("event consumer failed"))
        }
    }
}

/// Local tier, plus the distributed tier when Redis is configured
fn build_cache(config: &ServiceConfig) -> anyhow::Result<Arc<dyn CacheStore>> {
    let local: Arc<dyn CacheStore> = Arc::new(InMemoryCache::new(config.cache.memory.clone()));

    let distributed: Option<Arc<dyn CacheStore>> = match &config.cache.redis {
        Some(redis) => {
            info!(url = %redact_url(&redis.url), "Distributed cache tier enabled");
            Some(Arc::new(
                RedisCache::new(redis.clone()).context("invalid Redis configuration")?,
            ))
        }
        None => {
            info!("Distributed cache tier disabled");
            None
        }
    };

    Ok(Arc::new(LayeredCache::new(local, distributed, config.cache.ttl)))
}

/// Cancel `cancel` on SIGINT or SIGTERM
async fn shutdown_signal(cancel: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }

    cancel.cancel();
}
