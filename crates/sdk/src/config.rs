//! Configuration types for the PxWeb client.

use crate::error::{PxWebError, PxWebResult};
use scb_core::config::{ProviderSettings, DEFAULT_DATABASE};
use scb_core::Language;
use std::time::Duration;
use url::Url;

/// Configuration for one language-qualified PxWeb client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `https://api.scb.se/OV0104/v1/doris`.
    pub base_url: Url,
    /// Database segment below the language, `ssd` for SCB.
    pub database: String,
    /// Language of every request made with this configuration.
    pub language: Language,
    /// Request timeout.
    pub timeout: Duration,
    /// User-Agent header value.
    pub user_agent: String,
}

impl ClientConfig {
    /// Create a new configuration with the given base URL and language.
    pub fn new(base_url: Url, language: Language) -> Self {
        Self {
            base_url,
            database: DEFAULT_DATABASE.to_string(),
            language,
            timeout: Duration::from_secs(30),
            user_agent: format!("scb-mcp/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Build a configuration from shared provider settings.
    pub fn from_settings(settings: &ProviderSettings, language: Language) -> PxWebResult<Self> {
        let base_url = Url::parse(&settings.base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(PxWebError::Config(format!(
                "base_url cannot carry a path: {}",
                settings.base_url
            )));
        }

        Ok(Self {
            base_url,
            database: settings.database.clone(),
            language,
            timeout: settings.request_timeout(),
            user_agent: settings.user_agent.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_defaults() {
        let url = Url::parse("https://example.com").unwrap();
        let config = ClientConfig::new(url.clone(), Language::En);

        assert_eq!(config.base_url, url);
        assert_eq!(config.database, "ssd");
        assert_eq!(config.language, Language::En);
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_from_settings() {
        let settings = ProviderSettings {
            request_timeout_secs: 5,
            ..Default::default()
        };
        let config = ClientConfig::from_settings(&settings, Language::Sv).unwrap();

        assert_eq!(config.base_url.as_str(), "https://api.scb.se/OV0104/v1/doris");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.user_agent, settings.user_agent);
    }

    #[test]
    fn test_from_settings_rejects_bad_url() {
        let settings = ProviderSettings {
            base_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ClientConfig::from_settings(&settings, Language::Sv),
            Err(PxWebError::InvalidUrl(_))
        ));

        let settings = ProviderSettings {
            base_url: "mailto:stats@example.com".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            ClientConfig::from_settings(&settings, Language::Sv),
            Err(PxWebError::Config(_))
        ));
    }
}
