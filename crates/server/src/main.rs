//! saveit-proxy server entry point.
//!
//! Boots the offline proxy and exposes it as an MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use saveit_client::{FetchClient, FetchConfig, LifecycleManager, Network, Router};
use saveit_core::{AppConfig, CacheDb, Generation};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        db_path = %config.db_path.display(),
        origin = %config.origin,
        generation = %config.generation,
        "Starting saveit-proxy on stdio transport"
    );

    let cache = CacheDb::open(&config.db_path).await?.with_max_entry_bytes(config.max_entry_bytes);
    let network: Arc<dyn Network> = Arc::new(FetchClient::new(FetchConfig::from(&config))?);

    let lifecycle = Arc::new(LifecycleManager::from_config(&config, cache.clone(), network.clone())?);
    lifecycle.restore().await?;

    let generation = Generation::new(config.generation.clone())?;
    match lifecycle.rollout(generation).await {
        Ok(report) => tracing::info!(deleted = report.deleted_stores.len(), "cache generation ready"),
        Err(e) => {
            tracing::warn!(error = %e, active = ?lifecycle.active(), "install failed; keeping previous generation")
        }
    }

    let router = Arc::new(Router::from_config(&config, cache.clone(), network.clone(), lifecycle.gate()));
    let handler = handler::ProxyServer::new(cache, network, lifecycle, router, config.timeout());
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
