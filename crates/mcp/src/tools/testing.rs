// In-memory provider used by the tool tests

use scb_core::{
    CatalogNode, Language, NativeQuery, ProviderError, ProviderResult, StatisticsProvider,
    TableHandle, TableMetadata, TableVariable,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted provider that counts every capability call
pub struct StubProvider {
    language: Language,
    calls: AtomicUsize,
    descended: Mutex<Vec<String>>,
    last_query: Mutex<Option<NativeQuery>>,
    failure: Option<ProviderError>,
    delay: Option<Duration>,
    panics: bool,
}

impl StubProvider {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            calls: AtomicUsize::new(0),
            descended: Mutex::new(Vec::new()),
            last_query: Mutex::new(None),
            failure: None,
            delay: None,
            panics: false,
        }
    }

    pub fn failing(mut self, error: ProviderError) -> Self {
        self.failure = Some(error);
        self
    }

    pub fn stalling(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn descended(&self) -> Vec<String> {
        self.descended.lock().unwrap().clone()
    }

    pub fn last_query(&self) -> Option<NativeQuery> {
        self.last_query.lock().unwrap().clone()
    }

    async fn enter(&self) -> ProviderResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.panics {
            panic!("stub provider panicked");
        }
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl StatisticsProvider for StubProvider {
    fn language(&self) -> Language {
        self.language
    }

    async fn list_root(&self) -> ProviderResult<Vec<CatalogNode>> {
        self.enter().await?;
        Ok(match self.language {
            Language::Sv => vec![
                CatalogNode::folder("BE", "Befolkning"),
                CatalogNode::folder("AM", "Arbetsmarknad"),
            ],
            Language::En => vec![
                CatalogNode::folder("BE", "Population"),
                CatalogNode::folder("AM", "Labour market"),
            ],
        })
    }

    async fn descend(&self, path: &str) -> ProviderResult<Vec<CatalogNode>> {
        self.enter().await?;
        self.descended.lock().unwrap().push(path.to_string());
        Ok(vec![CatalogNode::table("BE0101N1", "Folkmängd")])
    }

    async fn resolve_table(&self, table_id: &str) -> ProviderResult<TableHandle> {
        self.enter().await?;
        if table_id == "NOPE" {
            return Err(ProviderError::TableNotFound(table_id.to_string()));
        }
        Ok(TableHandle {
            table_id: table_id.to_string(),
            locator: format!("stub://{}/{}", self.language, table_id),
        })
    }

    async fn table_metadata(&self, _table: &TableHandle) -> ProviderResult<TableMetadata> {
        self.enter().await?;
        Ok(TableMetadata {
            title: "Folkmängd efter region och år".to_string(),
            variables: vec![
                TableVariable {
                    code: "Region".to_string(),
                    text: "region".to_string(),
                    values: vec!["00".into(), "01".into(), "03".into()],
                    value_texts: vec!["Riket".into(), "Stockholms län".into(), "Uppsala län".into()],
                    elimination: true,
                    time: false,
                },
                TableVariable {
                    code: "Tid".to_string(),
                    text: "år".to_string(),
                    values: vec!["2022".into(), "2023".into()],
                    value_texts: vec!["2022".into(), "2023".into()],
                    elimination: false,
                    time: true,
                },
            ],
        })
    }

    async fn fetch_data(
        &self,
        _table: &TableHandle,
        query: &NativeQuery,
    ) -> ProviderResult<serde_json::Value> {
        self.enter().await?;
        *self.last_query.lock().unwrap() = Some(query.clone());
        Ok(serde_json::json!({"columns": [], "data": []}))
    }
}
