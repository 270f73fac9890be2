// Settings for reaching the statistics provider

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.scb.se/OV0104/v1/doris";
pub const DEFAULT_DATABASE: &str = "ssd";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// PxWeb API root, without language or database segment
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_database")]
    pub database: String,

    /// Timeout of a single outbound HTTP request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Deadline of a whole tool invocation (may span several requests)
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_call_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("scb-mcp/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            database: default_database(),
            request_timeout_secs: default_request_timeout_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ProviderSettings {
    /// Defaults overridden by `SCB_*` environment variables
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env();
        settings
    }

    /// Override fields from `SCB_API_URL`, `SCB_DATABASE`,
    /// `SCB_REQUEST_TIMEOUT_SECS`, `SCB_CALL_TIMEOUT_SECS` and `SCB_USER_AGENT`
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SCB_API_URL") {
            self.base_url = url;
        }
        if let Some(database) = lookup("SCB_DATABASE") {
            self.database = database;
        }
        if let Some(agent) = lookup("SCB_USER_AGENT") {
            self.user_agent = agent;
        }
        if let Some(secs) = lookup("SCB_REQUEST_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.request_timeout_secs = secs;
        }
        if let Some(secs) = lookup("SCB_CALL_TIMEOUT_SECS").and_then(|s| s.parse().ok()) {
            self.call_timeout_secs = secs;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }
}
