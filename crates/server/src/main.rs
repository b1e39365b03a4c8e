//! tidecache server entry point.
//!
//! Loads configuration, opens both stores, installs and activates the
//! engine, then serves MCP on stdio. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::{Context, Result};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tidecache_client::{FetchClient, FetchConfig};
use tidecache_core::{AppConfig, ContentCache, RecordStore};
use tidecache_engine::Engine;
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    tracing::info!(version = %config.version, origin = %config.origin, "starting tidecache server on stdio transport");

    let network = FetchClient::new(FetchConfig::from(&config))?;
    let cache = ContentCache::open(&config.content_db_path)
        .await
        .with_context(|| format!("opening content cache at {}", config.content_db_path.display()))?;
    let records = RecordStore::new(config.records_db_path.clone());

    let engine = Engine::new(config, cache, records, Arc::new(network))?;
    let installed = engine.install().await?;
    if !installed.failed.is_empty() {
        tracing::warn!(failed = ?installed.failed, "some core assets were not pre-cached");
    }
    engine.activate().await?;

    let engine = Arc::new(engine);
    let handler = handler::TidecacheServer::new(engine.clone());
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    engine.settle().await;
    engine.context().cache.clone().close().await?;
    tracing::info!("content cache closed");

    Ok(())
}
