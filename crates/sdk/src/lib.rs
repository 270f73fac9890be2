//! # SCB SDK
//!
//! Client for the PxWeb v1 API published by Statistics Sweden (SCB).
//!
//! One [`PxWebClient`] talks to one language of the API and implements the
//! [`scb_core::StatisticsProvider`] capability.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scb_core::{Language, StatisticsProvider};
//! use scb_sdk::PxWebClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PxWebClient::builder()
//!     .base_url("https://api.scb.se/OV0104/v1/doris")
//!     .language(Language::En)
//!     .build()?;
//!
//! for node in client.list_root().await? {
//!     println!("{} {}", node.id, node.label);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod transport;

pub use client::{PxWebClient, PxWebClientBuilder};
pub use config::ClientConfig;
pub use error::{PxWebError, PxWebResult};

use scb_core::config::ProviderSettings;
use scb_core::{Language, ProviderClients};
use std::sync::Arc;

/// Build the Swedish and English provider handles from shared settings.
pub fn provider_clients(settings: &ProviderSettings) -> PxWebResult<ProviderClients> {
    let sv = PxWebClient::from_settings(settings, Language::Sv)?;
    let en = PxWebClient::from_settings(settings, Language::En)?;
    Ok(ProviderClients::new(Arc::new(sv), Arc::new(en)))
}
