use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

mod api;
mod config;

use api::Transport;
use config::{AppState, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "scb-server")]
#[command(about = "MCP server for Statistics Sweden (SCB) open data, over HTTP", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "SCB_CONFIG", default_value = "scb.toml")]
    config: PathBuf,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    port: u16,

    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Wire protocol to serve
    #[arg(short, long, value_enum, default_value_t = Transport::Http)]
    transport: Transport,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "scb_server=info,scb_mcp=info,tower_http=debug".into()),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .init();

    let args = Args::parse();

    tracing::info!("Starting SCB MCP Server");

    // Load configuration
    let config = ServerConfig::load(&args.config)?;
    tracing::info!(
        base_url = %config.provider.base_url,
        heartbeat_secs = config.sse.heartbeat_secs,
        "Configuration loaded"
    );

    let state = AppState::new(&config)?;

    // Start API server
    let addr = format!("{}:{}", args.host, args.port);
    tracing::info!("Starting {:?} transport on {}", args.transport, addr);

    api::serve(&addr, args.transport, state).await?;

    Ok(())
}
