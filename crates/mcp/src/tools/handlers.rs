// Operation handlers for the statistics tools

use crate::tools::registry::{ArgumentType, ToolName};
use scb_core::{
    translate, CatalogNode, Language, ProviderClients, ProviderError, SelectionQuery,
    TableVariable,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

const TABLE_ACCESSIBLE: &str = "Table found and accessible";

/// Label reported for an empty browse path
const ROOT_PATH: &str = "root";

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// Argument passed the schema check but not the typed parse
    #[error("Invalid argument '{field}': {reason}")]
    InvalidArgument { field: String, reason: String },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Failed to serialize result: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn lenient_language<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Language, D::Error> {
    let code = Option::<String>::deserialize(deserializer)?;
    Ok(code.as_deref().map(Language::from_lenient).unwrap_or_default())
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

/// Accepts `{"Tid": "2023"}` as shorthand for `{"Tid": ["2023"]}`
fn selection_query<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SelectionQuery, D::Error> {
    let raw = indexmap::IndexMap::<String, OneOrMany>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(code, values)| match values {
            OneOrMany::One(value) => (code, vec![value]),
            OneOrMany::Many(values) => (code, values),
        })
        .collect())
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrowseArgs {
    #[serde(default)]
    pub path: String,
    #[serde(default, deserialize_with = "lenient_language")]
    pub language: Language,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchArgs {
    pub query: String,
    #[serde(default, deserialize_with = "lenient_language")]
    pub language: Language,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableArgs {
    pub table_id: String,
    #[serde(default, deserialize_with = "lenient_language")]
    pub language: Language,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchDataArgs {
    pub table_id: String,
    #[serde(deserialize_with = "selection_query")]
    pub query: SelectionQuery,
    #[serde(default, deserialize_with = "lenient_language")]
    pub language: Language,
}

/// A validated call with typed arguments
#[derive(Debug, Clone)]
pub enum ToolCall {
    BrowseMetadata(BrowseArgs),
    SearchTables(SearchArgs),
    GetTableMetadata(TableArgs),
    FetchData(FetchDataArgs),
    GetTableInfo(TableArgs),
}

impl ToolCall {
    /// Parse validated arguments into the typed call for `tool`
    pub fn parse(tool: ToolName, arguments: &Map<String, Value>) -> Result<Self, HandlerError> {
        let value = Value::Object(arguments.clone());
        let call = match tool {
            ToolName::BrowseMetadata => ToolCall::BrowseMetadata(parse_args(tool, value)?),
            ToolName::SearchTables => ToolCall::SearchTables(parse_args(tool, value)?),
            ToolName::GetTableMetadata => ToolCall::GetTableMetadata(parse_args(tool, value)?),
            ToolName::FetchData => ToolCall::FetchData(parse_args(tool, value)?),
            ToolName::GetTableInfo => ToolCall::GetTableInfo(parse_args(tool, value)?),
        };
        Ok(call)
    }

    /// Effective language of the call
    pub fn language(&self) -> Language {
        match self {
            ToolCall::BrowseMetadata(args) => args.language,
            ToolCall::SearchTables(args) => args.language,
            ToolCall::GetTableMetadata(args) | ToolCall::GetTableInfo(args) => args.language,
            ToolCall::FetchData(args) => args.language,
        }
    }
}

/// Scalar arguments are already type-checked, so only a structured one can fail here
fn parse_args<T: serde::de::DeserializeOwned>(tool: ToolName, value: Value) -> Result<T, HandlerError> {
    serde_json::from_value(value).map_err(|e| {
        let field = tool
            .descriptor()
            .arguments
            .iter()
            .find(|arg| arg.ty == ArgumentType::Object)
            .map_or("arguments", |arg| arg.name);
        HandlerError::InvalidArgument {
            field: field.to_string(),
            reason: e.to_string(),
        }
    })
}

#[derive(Debug, Serialize)]
struct BrowseResult {
    path: String,
    language: Language,
    items: Vec<CatalogNode>,
}

#[derive(Debug, Serialize)]
struct SearchResult {
    query: String,
    language: Language,
    matches: Vec<CatalogNode>,
}

#[derive(Debug, Serialize)]
struct TableMetadataResult {
    table_id: String,
    language: Language,
    variables: Vec<TableVariable>,
}

#[derive(Debug, Serialize)]
struct FetchDataResult {
    table_id: String,
    language: Language,
    query: SelectionQuery,
    data: Value,
}

#[derive(Debug, Serialize)]
struct TableInfoResult {
    table_id: String,
    language: Language,
    url: String,
    info: &'static str,
}

/// Run a call against the provider client of its language
pub async fn execute(call: ToolCall, clients: &ProviderClients) -> Result<Value, HandlerError> {
    let provider = clients.for_language(call.language());

    let payload = match call {
        ToolCall::BrowseMetadata(args) => {
            let path = args.path.trim_matches('/');
            let items = if path.is_empty() {
                provider.list_root().await?
            } else {
                provider.descend(path).await?
            };
            serde_json::to_value(BrowseResult {
                path: if path.is_empty() { ROOT_PATH.to_string() } else { path.to_string() },
                language: args.language,
                items,
            })?
        }
        ToolCall::SearchTables(args) => {
            let matches = provider
                .list_root()
                .await?
                .into_iter()
                .filter(|node| node.label_contains(&args.query))
                .collect();
            serde_json::to_value(SearchResult {
                query: args.query,
                language: args.language,
                matches,
            })?
        }
        ToolCall::GetTableMetadata(args) => {
            let table = provider.resolve_table(&args.table_id).await?;
            let metadata = provider.table_metadata(&table).await?;
            serde_json::to_value(TableMetadataResult {
                table_id: args.table_id,
                language: args.language,
                variables: metadata.variables,
            })?
        }
        ToolCall::FetchData(args) => {
            let table = provider.resolve_table(&args.table_id).await?;
            let domains = provider.dimensions(&table).await?;
            let native = translate(&domains, &args.query);
            native.check_against(&domains)?;
            let data = provider.fetch_data(&table, &native).await?;
            serde_json::to_value(FetchDataResult {
                table_id: args.table_id,
                language: args.language,
                query: args.query,
                data,
            })?
        }
        ToolCall::GetTableInfo(args) => {
            let table = provider.resolve_table(&args.table_id).await?;
            serde_json::to_value(TableInfoResult {
                url: provider.locator(&table),
                table_id: args.table_id,
                language: args.language,
                info: TABLE_ACCESSIBLE,
            })?
        }
    };

    Ok(payload)
}
