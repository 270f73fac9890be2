// MCP over Server-Sent Events
//
// A client opens `GET /sse`, learns its message endpoint from the first
// event, then posts JSON-RPC frames there. Responses come back on the stream.

use super::{ApiError, ApiResult};
use crate::config::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use futures::Stream;
use scb_mcp::protocol::{JsonRpcError, JsonRpcResponse};
use scb_mcp::server::list_tools_result;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/sse", get(open_session))
        .route("/messages", post(post_message))
}

type SessionSender = mpsc::UnboundedSender<JsonRpcResponse>;

/// Open SSE sessions, keyed by id
#[derive(Clone, Default)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, SessionSender>>>,
}

impl SessionRegistry {
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, SessionSender>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new session and return the receiving end of its responses
    pub fn open(&self) -> (Uuid, mpsc::UnboundedReceiver<JsonRpcResponse>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().insert(id, tx);
        (id, rx)
    }

    pub fn sender(&self, id: &Uuid) -> Option<SessionSender> {
        self.lock().get(id).cloned()
    }

    pub fn close(&self, id: &Uuid) {
        self.lock().remove(id);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Removes its session from the registry when the stream is dropped
struct SessionGuard {
    id: Uuid,
    registry: SessionRegistry,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.registry.close(&self.id);
        info!(session_id = %self.id, "SSE session closed");
    }
}

async fn root() -> Json<Value> {
    Json(json!({
        "name": "SCB MCP Server",
        "version": env!("CARGO_PKG_VERSION"),
        "protocol": "MCP over SSE",
        "sse_endpoint": "/sse"
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "scb-mcp-sse-server"}))
}

async fn open_session(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (id, mut responses) = state.sessions.open();
    info!(session_id = %id, active = state.sessions.len(), "SSE session opened");

    let guard = SessionGuard {
        id,
        registry: state.sessions.clone(),
    };
    let endpoint = format!("/messages?session_id={}", id);

    let stream = async_stream::stream! {
        let _guard = guard;

        yield Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint));

        match Event::default().event("tools").json_data(list_tools_result()) {
            Ok(event) => yield Ok(event),
            Err(e) => error!(error = %e, "Failed to encode tool listing"),
        }

        while let Some(response) = responses.recv().await {
            match Event::default().event("message").json_data(&response) {
                Ok(event) => yield Ok(event),
                Err(e) => error!(error = %e, "Failed to encode response"),
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.heartbeat)
            .text("heartbeat"),
    )
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Uuid,
}

/// Accept one JSON-RPC frame; its response goes out on the session stream
async fn post_message(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessageQuery>,
    body: Bytes,
) -> ApiResult<StatusCode> {
    let session = state
        .sessions
        .sender(&query.session_id)
        .ok_or_else(|| ApiError::SessionNotFound(query.session_id.to_string()))?;

    let message: Value = serde_json::from_slice(&body).map_err(|e| {
        warn!(session_id = %query.session_id, error = %e, "Malformed JSON-RPC frame");
        ApiError::JsonRpc(JsonRpcError::parse_error(e))
    })?;
    debug!(session_id = %query.session_id, frame = %message, "Frame received");

    let mcp = state.mcp.clone();
    tokio::spawn(async move {
        if let Some(response) = mcp.handle_value(message).await {
            if session.send(response).is_err() {
                debug!("Session closed before its response was ready");
            }
        }
    });

    Ok(StatusCode::ACCEPTED)
}
