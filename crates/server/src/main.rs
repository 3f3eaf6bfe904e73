//! cidian-worker entry point.
//!
//! Boots the offline worker and vocabulary stores, then serves MCP on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use anyhow::Result;
use cidian_core::AppConfig;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(scope = %config.scope, data_dir = %config.data_dir.display(), "Starting cidian-worker on stdio transport");

    let state = Arc::new(state::AppState::init(config).await?);
    state.warm_up().await;

    let handler = handler::CidianServer::new(state);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
