// Capability interface of the statistics provider

use crate::error::ProviderResult;
use crate::query::{DimensionDomains, NativeQuery};
use crate::types::{CatalogNode, Language, TableHandle, TableMetadata};
use std::sync::Arc;

/// A language-qualified statistics provider client.
///
/// Implementations are shared across concurrent invocations and must be safe
/// to call from several tasks at once.
#[async_trait::async_trait]
pub trait StatisticsProvider: Send + Sync {
    /// Language every answer of this client is written in
    fn language(&self) -> Language;

    /// Top level of the catalog
    async fn list_root(&self) -> ProviderResult<Vec<CatalogNode>>;

    /// Children of the catalog node at `path` (e.g. `BE/BE0101`)
    async fn descend(&self, path: &str) -> ProviderResult<Vec<CatalogNode>>;

    /// Locate a table by id
    async fn resolve_table(&self, table_id: &str) -> ProviderResult<TableHandle>;

    /// Variable declarations of a table
    async fn table_metadata(&self, table: &TableHandle) -> ProviderResult<TableMetadata>;

    /// Full domain of every dimension of a table
    async fn dimensions(&self, table: &TableHandle) -> ProviderResult<DimensionDomains> {
        Ok(self.table_metadata(table).await?.dimension_domains())
    }

    /// Canonical URL of a table
    fn locator(&self, table: &TableHandle) -> String {
        table.locator.clone()
    }

    /// Run a native query against a table, returning the provider's answer as is
    async fn fetch_data(
        &self,
        table: &TableHandle,
        query: &NativeQuery,
    ) -> ProviderResult<serde_json::Value>;
}

/// The two long-lived provider handles, one per supported language
#[derive(Clone)]
pub struct ProviderClients {
    sv: Arc<dyn StatisticsProvider>,
    en: Arc<dyn StatisticsProvider>,
}

impl ProviderClients {
    pub fn new(sv: Arc<dyn StatisticsProvider>, en: Arc<dyn StatisticsProvider>) -> Self {
        Self { sv, en }
    }

    pub fn for_language(&self, language: Language) -> &Arc<dyn StatisticsProvider> {
        match language {
            Language::Sv => &self.sv,
            Language::En => &self.en,
        }
    }
}
