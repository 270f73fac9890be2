// Core types and functionality for the SCB statistics tool server

pub mod config;
pub mod error;
pub mod provider;
pub mod query;
pub mod types;

pub use error::{ProviderError, ProviderResult};
pub use provider::{ProviderClients, StatisticsProvider};
pub use query::{translate, DimensionDomains, NativeQuery, SelectionQuery, WILDCARD};
pub use types::*;
