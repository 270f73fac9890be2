// Plain HTTP/JSON transport

use super::{ApiError, ApiResult};
use crate::config::AppState;
use axum::{
    body::Bytes,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use scb_mcp::protocol::ToolSchema;
use scb_mcp::tools::{tool_schemas, InvocationRequest, InvocationResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/tools", get(list_tools))
        .route("/call_tool", post(call_tool))
        .route("/sse", get(heartbeat_stream))
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "SCB MCP Server",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Model Context Protocol server for Statistics Sweden (SCB) data access",
        "endpoints": {
            "tools": "/tools",
            "call_tool": "/call_tool",
            "sse": "/sse",
            "health": "/health"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "scb-mcp-server"}))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListToolsResponse {
    pub tools: Vec<ToolSchema>,
}

async fn list_tools() -> Json<ListToolsResponse> {
    Json(ListToolsResponse {
        tools: tool_schemas(),
    })
}

#[derive(Debug, Deserialize)]
pub struct CallToolRequest {
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Serialize)]
pub struct CallToolResponse {
    pub success: bool,
    pub result: Value,
}

/// Invoke a tool. The body is read as JSON whatever its content type.
async fn call_tool(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<Json<CallToolResponse>> {
    let request: CallToolRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {}", e)))?;
    let name = request
        .name
        .ok_or_else(|| ApiError::BadRequest("Missing 'name' field".to_string()))?;

    match state
        .dispatcher
        .invoke(InvocationRequest::new(name, request.arguments))
        .await
    {
        InvocationResult::Success(result) => Ok(Json(CallToolResponse {
            success: true,
            result,
        })),
        InvocationResult::Failure(failure) => Err(ApiError::Invocation(failure)),
    }
}

/// Liveness stream: one `connected` event, then a `heartbeat` event per period
async fn heartbeat_stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let period = state.heartbeat;
    tracing::info!("Heartbeat stream opened");

    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(Event::default().event("connected").data(
            json!({"status": "connected", "server": "scb-mcp-server"}).to_string(),
        ));

        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            yield Ok(Event::default().event("heartbeat").data(
                json!({"timestamp": chrono::Utc::now().to_rfc3339()}).to_string(),
            ));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{body_json, test_state};
    use crate::api::{create_router, Transport};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn post_call(body: &str) -> (StatusCode, Value) {
        let app = create_router(Transport::Http, test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/call_tool")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }

    async fn get(uri: &str) -> (StatusCode, Value) {
        let app = create_router(Transport::Http, test_state());
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, body_json(response).await)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"status": "healthy", "service": "scb-mcp-server"}));
    }

    #[tokio::test]
    async fn test_root_lists_endpoints() {
        let (status, body) = get("/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "SCB MCP Server");
        assert_eq!(body["endpoints"]["call_tool"], "/call_tool");
    }

    #[tokio::test]
    async fn test_tools() {
        let (status, body) = get("/tools").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tools"].as_array().unwrap().len(), 5);
        assert_eq!(body["tools"][1]["name"], "search_tables");
    }

    #[tokio::test]
    async fn test_call_tool_success() {
        let (status, body) =
            post_call(r#"{"name": "browse_metadata", "arguments": {"language": "en"}}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["result"]["path"], "root");
        assert_eq!(body["result"]["language"], "en");
    }

    #[tokio::test]
    async fn test_call_tool_without_arguments() {
        let (status, body) = post_call(r#"{"name": "scb_browse_metadata"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["items"][0]["id"], "BE");
    }

    #[tokio::test]
    async fn test_provider_error_is_ok() {
        let (status, body) =
            post_call(r#"{"name": "get_table_info", "arguments": {"table_id": "NOPE"}}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["result"]["error"], "Table not found: NOPE");
        assert_eq!(body["result"]["table_id"], "NOPE");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_404() {
        let (status, body) = post_call(r#"{"name": "invalid_tool_name", "arguments": {}}"#).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Unknown tool: invalid_tool_name");
        assert_eq!(body["tool"], "invalid_tool_name");
    }

    #[tokio::test]
    async fn test_missing_argument_is_400() {
        let (status, body) = post_call(r#"{"name": "search_tables", "arguments": {}}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required argument 'query'");
        assert_eq!(body["arguments"], json!({}));
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (status, body) = post_call("{\"name\": ").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);

        let (status, body) = post_call(r#"{"arguments": {}}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing 'name' field");
    }
}
