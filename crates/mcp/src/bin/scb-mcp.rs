// Standalone MCP server binary (stdio transport)

use anyhow::{Context, Result};
use scb_core::config::ProviderSettings;
use scb_mcp::server::McpServer;
use scb_mcp::tools::Dispatcher;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // Stdout carries the protocol, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scb_mcp=info,scb_sdk=info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("SCB MCP Server starting...");

    let settings = ProviderSettings::from_env();
    tracing::info!(
        base_url = %settings.base_url,
        database = %settings.database,
        "Using statistics provider"
    );

    let clients =
        scb_sdk::provider_clients(&settings).context("Failed to create provider clients")?;
    let dispatcher = Dispatcher::new(clients).with_call_timeout(settings.call_timeout());

    tracing::info!("Registered {} tools", dispatcher.tools().len());

    let server = Arc::new(McpServer::new(Arc::new(dispatcher)));
    server.start().await?;

    Ok(())
}
