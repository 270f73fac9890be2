//! PxWeb client implementing the statistics provider capability.

use crate::config::ClientConfig;
use crate::error::{PxWebError, PxWebResult};
use crate::transport::HttpTransport;
use async_trait::async_trait;
use scb_core::config::ProviderSettings;
use scb_core::{
    CatalogNode, Language, NativeQuery, ProviderError, ProviderResult, StatisticsProvider,
    TableHandle, TableMetadata,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Client for one language of a PxWeb v1 API.
#[derive(Debug, Clone)]
pub struct PxWebClient {
    config: Arc<ClientConfig>,
    http: HttpTransport,
}

impl PxWebClient {
    /// Create a new client builder.
    pub fn builder() -> PxWebClientBuilder {
        PxWebClientBuilder::new()
    }

    /// Create a client from configuration.
    pub fn from_config(config: ClientConfig) -> PxWebResult<Self> {
        let config = Arc::new(config);
        let http = HttpTransport::new(config.clone())?;

        Ok(Self { config, http })
    }

    /// Create a client from shared provider settings.
    pub fn from_settings(settings: &ProviderSettings, language: Language) -> PxWebResult<Self> {
        Self::from_config(ClientConfig::from_settings(settings, language)?)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn list_level(&self, path: &str) -> PxWebResult<Vec<CatalogNode>> {
        let url = self.http.build_url(path, path.is_empty())?;
        self.http.get(url).await
    }

    /// Search the whole database for tables matching `table_id`.
    async fn search(&self, table_id: &str) -> PxWebResult<Vec<SearchHit>> {
        let url = self.http.build_url("", true)?;
        self.http
            .get_with_query(url, &[("query", table_id), ("filter", "*")])
            .await
    }

    fn table_url(&self, path: &str) -> PxWebResult<Url> {
        self.http.build_url(path, false)
    }

    /// Confirm a table answers at `path`; a missing one is `TableNotFound`.
    async fn check_table(&self, table_id: &str, path: &str) -> ProviderResult<Url> {
        let url = self.table_url(path)?;
        match self.http.get::<serde_json::Value>(url.clone()).await {
            Ok(_) => Ok(url),
            Err(PxWebError::NotFound(_)) => Err(ProviderError::TableNotFound(table_id.to_string())),
            Err(e) => Err(e.into()),
        }
    }
}

/// One hit of the PxWeb search endpoint
#[derive(Debug, Clone, Deserialize)]
struct SearchHit {
    id: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    title: String,
}

impl SearchHit {
    fn catalog_path(&self) -> String {
        format!("{}/{}", self.path.trim_matches('/'), self.id)
    }
}

/// Pick the search hit denoting `table_id`: exact id first, then a title
/// carrying the id as its parenthesized table code, e.g. `(BE0101N1)`
fn pick_hit<'a>(hits: &'a [SearchHit], table_id: &str) -> Option<&'a SearchHit> {
    let code = format!("({})", table_id.to_lowercase());
    hits.iter()
        .find(|hit| hit.id.eq_ignore_ascii_case(table_id))
        .or_else(|| {
            hits.iter()
                .find(|hit| hit.title.to_lowercase().contains(&code))
        })
}

/// Body of a PxWeb data request
#[derive(Debug, Serialize)]
struct DataRequest<'a> {
    query: Vec<QueryEntry<'a>>,
    response: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct QueryEntry<'a> {
    code: &'a str,
    selection: Selection<'a>,
}

#[derive(Debug, Serialize)]
struct Selection<'a> {
    filter: &'static str,
    values: &'a [String],
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    format: &'static str,
}

impl<'a> DataRequest<'a> {
    fn from_query(query: &'a NativeQuery) -> Self {
        Self {
            query: query
                .iter()
                .map(|(code, values)| QueryEntry {
                    code,
                    selection: Selection {
                        filter: "item",
                        values,
                    },
                })
                .collect(),
            response: ResponseFormat { format: "json" },
        }
    }
}

#[async_trait]
impl StatisticsProvider for PxWebClient {
    fn language(&self) -> Language {
        self.config.language
    }

    async fn list_root(&self) -> ProviderResult<Vec<CatalogNode>> {
        Ok(self.list_level("").await?)
    }

    async fn descend(&self, path: &str) -> ProviderResult<Vec<CatalogNode>> {
        Ok(self.list_level(path).await?)
    }

    async fn resolve_table(&self, table_id: &str) -> ProviderResult<TableHandle> {
        let table_id = table_id.trim();
        if table_id.is_empty() {
            return Err(ProviderError::TableNotFound("empty table id".to_string()));
        }

        // a full catalog path is checked directly instead of searched for
        let locator = if table_id.contains('/') {
            self.check_table(table_id, table_id.trim_matches('/')).await?
        } else {
            let hits = self.search(table_id).await?;
            debug!(table_id, hits = hits.len(), "Table search finished");
            let path = pick_hit(&hits, table_id)
                .map(SearchHit::catalog_path)
                .ok_or_else(|| ProviderError::TableNotFound(table_id.to_string()))?;
            self.table_url(&path)?
        };

        Ok(TableHandle {
            table_id: table_id.to_string(),
            locator: locator.to_string(),
        })
    }

    async fn table_metadata(&self, table: &TableHandle) -> ProviderResult<TableMetadata> {
        let url = Url::parse(&table.locator).map_err(PxWebError::from)?;
        match self.http.get::<TableMetadata>(url).await {
            Err(PxWebError::NotFound(_)) => Err(ProviderError::TableNotFound(table.table_id.clone())),
            other => Ok(other?),
        }
    }

    async fn fetch_data(
        &self,
        table: &TableHandle,
        query: &NativeQuery,
    ) -> ProviderResult<serde_json::Value> {
        let url = Url::parse(&table.locator).map_err(PxWebError::from)?;
        let body = DataRequest::from_query(query);
        match self.http.post::<serde_json::Value, _>(url, &body).await {
            Err(PxWebError::NotFound(_)) => Err(ProviderError::TableNotFound(table.table_id.clone())),
            other => Ok(other?),
        }
    }
}

/// Builder for creating a PxWebClient.
pub struct PxWebClientBuilder {
    base_url: Option<String>,
    database: Option<String>,
    language: Language,
    timeout: Duration,
    user_agent: Option<String>,
}

impl PxWebClientBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self {
            base_url: None,
            database: None,
            language: Language::Sv,
            timeout: Duration::from_secs(30),
            user_agent: None,
        }
    }

    /// Set the API root.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the database segment.
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// Set the language of the client.
    pub fn language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> PxWebResult<PxWebClient> {
        let base_url_str = self
            .base_url
            .ok_or_else(|| PxWebError::Config("base_url is required".to_string()))?;

        let mut config = ClientConfig::new(Url::parse(&base_url_str)?, self.language);
        config.timeout = self.timeout;
        if let Some(database) = self.database {
            config.database = database;
        }
        if let Some(agent) = self.user_agent {
            config.user_agent = agent;
        }

        PxWebClient::from_config(config)
    }
}

impl Default for PxWebClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
