use crate::config::AppState;
use anyhow::Result;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use scb_mcp::protocol::{JsonRpcError, JsonRpcResponse};
use scb_mcp::tools::{FailureKind, InvocationFailure};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

pub mod http;
pub mod sse;

/// Wire binding served by `scb-server`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Transport {
    /// Plain HTTP/JSON: `GET /tools`, `POST /call_tool`
    Http,
    /// MCP over Server-Sent Events: `GET /sse`, `POST /messages`
    Sse,
}

/// Start the API server
pub async fn serve(addr: &str, transport: Transport, state: AppState) -> Result<()> {
    let app = create_router(transport, state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(transport = ?transport, "API server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the router of one transport
pub fn create_router(transport: Transport, state: AppState) -> Router {
    let routes = match transport {
        Transport::Http => http::routes(),
        Transport::Sse => sse::routes(),
    };

    routes
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

/// API error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            tool: None,
            arguments: None,
        }
    }
}

/// Error type for API handlers
#[derive(Debug)]
pub enum ApiError {
    /// Body or query string unusable
    BadRequest(String),
    /// Rejected by the dispatcher
    Invocation(InvocationFailure),
    /// Malformed JSON-RPC frame, answered in JSON-RPC form
    JsonRpc(JsonRpcError),
    SessionNotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(error) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse::new(error))).into_response()
            }
            ApiError::Invocation(failure) => {
                let status = match failure.kind {
                    FailureKind::UnknownTool => StatusCode::NOT_FOUND,
                    FailureKind::MissingArgument | FailureKind::InvalidArgument => {
                        StatusCode::BAD_REQUEST
                    }
                    FailureKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                };
                let body = ErrorResponse {
                    success: false,
                    error: failure.message,
                    tool: Some(failure.tool_name),
                    arguments: Some(failure.arguments),
                };
                (status, Json(body)).into_response()
            }
            ApiError::JsonRpc(error) => (
                StatusCode::BAD_REQUEST,
                Json(JsonRpcResponse::error(Value::Null, error)),
            )
                .into_response(),
            ApiError::SessionNotFound(session_id) => (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!("Session not found: {}", session_id))),
            )
                .into_response(),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use scb_core::{
        CatalogNode, Language, NativeQuery, ProviderClients, ProviderError, ProviderResult,
        StatisticsProvider, TableHandle, TableMetadata,
    };
    use scb_mcp::tools::Dispatcher;
    use std::time::Duration;

    /// Provider answering from a fixed two-node catalog
    struct CatalogStub(Language);

    #[async_trait::async_trait]
    impl StatisticsProvider for CatalogStub {
        fn language(&self) -> Language {
            self.0
        }

        async fn list_root(&self) -> ProviderResult<Vec<CatalogNode>> {
            Ok(vec![
                CatalogNode::folder("BE", "Befolkning"),
                CatalogNode::folder("AM", "Arbetsmarknad"),
            ])
        }

        async fn descend(&self, path: &str) -> ProviderResult<Vec<CatalogNode>> {
            Err(ProviderError::NotFound(path.to_string()))
        }

        async fn resolve_table(&self, table_id: &str) -> ProviderResult<TableHandle> {
            Err(ProviderError::TableNotFound(table_id.to_string()))
        }

        async fn table_metadata(&self, table: &TableHandle) -> ProviderResult<TableMetadata> {
            Err(ProviderError::TableNotFound(table.table_id.clone()))
        }

        async fn fetch_data(
            &self,
            table: &TableHandle,
            _query: &NativeQuery,
        ) -> ProviderResult<Value> {
            Err(ProviderError::TableNotFound(table.table_id.clone()))
        }
    }

    pub fn test_state() -> AppState {
        let clients = ProviderClients::new(
            Arc::new(CatalogStub(Language::Sv)),
            Arc::new(CatalogStub(Language::En)),
        );
        AppState::from_dispatcher(Arc::new(Dispatcher::new(clients)), Duration::from_secs(30))
    }

    pub async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }
}
