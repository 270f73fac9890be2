// MCP session handling and the newline-delimited stdio transport

use crate::protocol::*;
use crate::tools::{tool_schemas, Dispatcher, FailureKind, InvocationFailure, InvocationRequest, InvocationResult};
use anyhow::{Context, Result};
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::{debug, error, info, warn};

/// Name announced in `initialize`
pub const SERVER_NAME: &str = "scb-statistics";

/// Longest accepted frame; a `fetch_data` query listing every code stays far below
const MAX_FRAME_LENGTH: usize = 8 * 1024 * 1024;

/// Full tool listing, as sent to clients
pub fn list_tools_result() -> ListToolsResult {
    ListToolsResult {
        tools: tool_schemas(),
    }
}

/// JSON-RPC error for a dispatcher failure
pub fn failure_to_rpc_error(failure: &InvocationFailure) -> JsonRpcError {
    let code = match failure.kind {
        FailureKind::UnknownTool => JsonRpcError::METHOD_NOT_FOUND,
        FailureKind::MissingArgument | FailureKind::InvalidArgument => JsonRpcError::INVALID_PARAMS,
        FailureKind::Internal => JsonRpcError::INTERNAL_ERROR,
    };
    JsonRpcError::custom(code, failure.message.clone()).with_data(json!({
        "tool": failure.tool_name,
        "arguments": failure.arguments,
    }))
}

/// One MCP session endpoint. Shared by the stdio and SSE transports.
pub struct McpServer {
    dispatcher: Arc<Dispatcher>,
}

impl McpServer {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// Handle one raw frame. Returns `None` for notifications.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Malformed JSON-RPC frame");
                return Some(JsonRpcResponse::error(Value::Null, JsonRpcError::parse_error(e)));
            }
        };

        self.handle_value(value).await
    }

    /// Handle one already-parsed frame. Returns `None` for notifications.
    pub async fn handle_value(&self, value: Value) -> Option<JsonRpcResponse> {
        let id = value.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle_request(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                id,
                JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
            )),
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            return Some(JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                JsonRpcError::invalid_request(format!(
                    "Unsupported JSON-RPC version: {}",
                    request.jsonrpc
                )),
            ));
        }

        debug!(method = %request.method, id = ?request.id, "Request received");

        let result = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params.as_ref()),
            "notifications/initialized" | "initialized" => {
                info!("Client initialized");
                return None;
            }
            "ping" => Ok(json!({})),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => self.handle_tools_call(request.params).await,
            method => Err(JsonRpcError::method_not_found(method)),
        };

        // Notifications never get a response, whatever the outcome
        let id = request.id?;
        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => JsonRpcResponse::error(id, e),
        })
    }

    fn handle_initialize(&self, params: Option<&Value>) -> Result<Value, JsonRpcError> {
        let protocol_version = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PROTOCOL_VERSION);

        let result = InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
                experimental: json!({}),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };
        to_result(&result)
    }

    fn handle_tools_list(&self) -> Result<Value, JsonRpcError> {
        to_result(&list_tools_result())
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params = params.ok_or_else(|| JsonRpcError::invalid_params("Missing params"))?;
        let params: CallToolParams = serde_json::from_value(params)
            .map_err(|e| JsonRpcError::invalid_params(format!("Invalid params: {}", e)))?;

        let request = InvocationRequest::new(params.name, params.arguments);
        match self.dispatcher.invoke(request).await {
            InvocationResult::Success(payload) => {
                let text = serde_json::to_string_pretty(&payload)
                    .map_err(|e| JsonRpcError::internal_error(e.to_string()))?;
                to_result(&CallToolResult {
                    content: vec![ToolContent::text(text)],
                    is_error: None,
                })
            }
            InvocationResult::Failure(failure) => Err(failure_to_rpc_error(&failure)),
        }
    }

    /// Serve one session over stdin/stdout
    pub async fn start(self: Arc<Self>) -> Result<()> {
        info!("MCP server listening on stdio");
        self.serve(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve one session over a pair of byte streams.
    ///
    /// Each request runs on its own task; responses are written by a single
    /// writer task, one JSON document per line, in completion order.
    pub async fn serve<R, W>(self: Arc<Self>, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        let writer_task = tokio::spawn(write_frames(writer, rx));

        let mut frames = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_FRAME_LENGTH));
        while let Some(frame) = frames.next().await {
            let line = match frame {
                Ok(line) => line,
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    warn!(limit = MAX_FRAME_LENGTH, "Frame too long, discarded");
                    send(&tx, JsonRpcResponse::error(
                        Value::Null,
                        JsonRpcError::parse_error("frame exceeds maximum length"),
                    ));
                    continue;
                }
                Err(LinesCodecError::Io(e)) => {
                    error!(error = %e, "Failed to read frame");
                    break;
                }
            };

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!(frame = %line, "Frame received");

            let server = Arc::clone(&self);
            let tx = tx.clone();
            let line = line.to_string();
            tokio::spawn(async move {
                if let Some(response) = server.handle_message(&line).await {
                    send(&tx, response);
                }
            });
        }

        info!("Input closed, draining pending responses");
        drop(tx);
        writer_task
            .await
            .context("Writer task failed")?
            .context("Failed to write response")?;
        Ok(())
    }
}

fn to_result<T: serde::Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}

fn send(tx: &mpsc::UnboundedSender<String>, response: JsonRpcResponse) {
    match serde_json::to_string(&response) {
        Ok(frame) => {
            // The writer only goes away once every sender is dropped
            let _ = tx.send(frame);
        }
        Err(e) => error!(error = %e, "Failed to encode response"),
    }
}

async fn write_frames<W>(mut writer: W, mut rx: mpsc::UnboundedReceiver<String>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        debug!(frame = %frame, "Frame sent");
        writer.write_all(frame.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}
