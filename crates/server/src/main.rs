//! contributors-mcp server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use contributors_core::{
    AppConfig, Cache, CacheBackend, CacheDb, ContributorService, MemoryCache, ServiceConfig, StoreDb,
};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

/// How long shutdown waits for in-flight cache jobs.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;

    tracing::info!(
        store_path = %config.store_path.display(),
        cache_backend = ?config.cache_backend,
        cache_ttl_secs = config.cache_ttl_secs,
        "Starting contributors server on stdio transport"
    );

    let store = StoreDb::open(&config.store_path).await?;
    let cache: Arc<dyn Cache> = match config.cache_backend {
        CacheBackend::Memory => Arc::new(MemoryCache::new()),
        CacheBackend::Sqlite => Arc::new(CacheDb::open(&config.cache_path).await?),
    };
    let service = ContributorService::new(Arc::new(store), cache, ServiceConfig::from(&config));

    let sweeper = tokio::spawn(sweep_periodically(service.clone(), config.sweep_interval()));

    let handler = handler::ContributorsServer::new(service.clone());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    tokio::select! {
        result = server.waiting() => {
            let reason = result?;
            tracing::info!(?reason, "client disconnected");
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            tracing::info!("interrupt received, shutting down");
        }
    }

    sweeper.abort();
    service.shutdown(SHUTDOWN_GRACE).await;

    Ok(())
}

/// Purge expired cache entries every `every`, bounded by the cache timeout.
async fn sweep_periodically(service: ContributorService, every: Duration) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match tokio::time::timeout(service.config().cache_timeout, service.sweep()).await {
            Ok(Ok(purged)) => tracing::debug!(purged, "periodic cache sweep"),
            Ok(Err(e)) => tracing::warn!(error = %e, "periodic cache sweep failed"),
            Err(_) => tracing::warn!("periodic cache sweep timed out"),
        }
    }
}
