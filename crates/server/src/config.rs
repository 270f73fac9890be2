use crate::api::sse::SessionRegistry;
use anyhow::{Context, Result};
use scb_core::config::ProviderSettings;
use scb_mcp::server::McpServer;
use scb_mcp::tools::Dispatcher;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub provider: ProviderSettings,

    #[serde(default)]
    pub sse: SseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SseConfig {
    /// Interval between keep-alive frames on event streams
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

fn default_heartbeat_secs() -> u64 {
    30
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}

impl SseConfig {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }
}

impl ServerConfig {
    /// Load the config file, falling back to defaults when it does not exist.
    ///
    /// `SCB_*` environment variables override the `[provider]` section.
    pub fn load(config_path: &Path) -> Result<Self> {
        let mut config: Self = if config_path.exists() {
            let content = std::fs::read_to_string(config_path)
                .context("Failed to read configuration file")?;
            toml::from_str(&content).context("Failed to parse configuration file")?
        } else {
            tracing::info!("Configuration file not found, using defaults");
            Self::default()
        };

        config.provider.apply_env();

        Ok(config)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub mcp: Arc<McpServer>,
    pub sessions: SessionRegistry,
    pub heartbeat: Duration,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let clients = scb_sdk::provider_clients(&config.provider)
            .context("Failed to create provider clients")?;
        let dispatcher =
            Arc::new(Dispatcher::new(clients).with_call_timeout(config.provider.call_timeout()));

        Ok(Self::from_dispatcher(dispatcher, config.sse.heartbeat()))
    }

    pub fn from_dispatcher(dispatcher: Arc<Dispatcher>, heartbeat: Duration) -> Self {
        Self {
            mcp: Arc::new(McpServer::new(dispatcher.clone())),
            dispatcher,
            sessions: SessionRegistry::default(),
            heartbeat,
        }
    }
}
