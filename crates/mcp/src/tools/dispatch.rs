// Dispatch of tool invocations: lookup, validation, execution

use crate::tools::handlers::{self, HandlerError, ToolCall};
use crate::tools::registry::{list_tools, ToolDescriptor, ToolName};
use scb_core::{Language, ProviderClients, ProviderError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Default deadline for one handler execution
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// A named tool call with its raw arguments
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvocationRequest {
    pub tool_name: String,
    #[serde(default)]
    pub arguments: Value,
}

impl InvocationRequest {
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    UnknownTool,
    MissingArgument,
    InvalidArgument,
    Internal,
}

/// A call rejected before or outside the provider path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationFailure {
    pub kind: FailureKind,
    pub message: String,
    pub tool_name: String,
    pub arguments: Value,
}

impl fmt::Display for InvocationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Outcome of every invocation.
///
/// Provider errors are data: they arrive as `Success` with an `error` key.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationResult {
    Success(Value),
    Failure(InvocationFailure),
}

impl InvocationResult {
    pub fn is_success(&self) -> bool {
        matches!(self, InvocationResult::Success(_))
    }
}

/// Validation failure of a single argument
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
enum ArgumentError {
    #[error("Missing required argument '{0}'")]
    Missing(&'static str),

    #[error("Invalid argument '{field}': expected {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },

    #[error("Invalid arguments: expected an object")]
    NotAnObject,
}

impl ArgumentError {
    fn kind(&self) -> FailureKind {
        match self {
            ArgumentError::Missing(_) => FailureKind::MissingArgument,
            ArgumentError::WrongType { .. } | ArgumentError::NotAnObject => {
                FailureKind::InvalidArgument
            }
        }
    }
}

/// Check `arguments` against a descriptor and fill in defaults.
///
/// JSON `null` counts as absent. Undeclared fields are dropped.
fn validate(
    descriptor: &ToolDescriptor,
    arguments: &Value,
) -> Result<Map<String, Value>, ArgumentError> {
    let empty = Map::new();
    let supplied = match arguments {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => return Err(ArgumentError::NotAnObject),
    };

    let mut validated = Map::new();
    for spec in descriptor.arguments {
        match supplied.get(spec.name).filter(|v| !v.is_null()) {
            Some(value) if spec.ty.accepts(value) => {
                validated.insert(spec.name.to_string(), value.clone());
            }
            Some(_) => {
                return Err(ArgumentError::WrongType {
                    field: spec.name,
                    expected: spec.ty.as_str(),
                })
            }
            None if spec.required => return Err(ArgumentError::Missing(spec.name)),
            None => {
                if let Some(default) = spec.default {
                    validated.insert(spec.name.to_string(), Value::from(default));
                }
            }
        }
    }
    Ok(validated)
}

/// In-payload answer for a provider error, echoing the identifying arguments
fn provider_error_payload(
    tool: ToolName,
    arguments: &Map<String, Value>,
    language: Language,
    error: &ProviderError,
) -> Value {
    let mut payload = Map::new();
    payload.insert("error".to_string(), Value::from(error.to_string()));
    for key in tool.echoed_arguments() {
        if let Some(value) = arguments.get(*key) {
            payload.insert(key.to_string(), value.clone());
        }
    }
    payload.insert("language".to_string(), Value::from(language.code()));
    Value::Object(payload)
}

/// Routes invocations to their handlers
pub struct Dispatcher {
    clients: ProviderClients,
    call_timeout: Duration,
}

impl Dispatcher {
    pub fn new(clients: ProviderClients) -> Self {
        Self {
            clients,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn tools(&self) -> &'static [ToolDescriptor] {
        list_tools()
    }

    /// Run one invocation. Never panics, never errors.
    pub async fn invoke(&self, request: InvocationRequest) -> InvocationResult {
        let started = Instant::now();
        info!(tool = %request.tool_name, arguments = %request.arguments, "Tool invoked");

        let result = self.dispatch(&request).await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &result {
            InvocationResult::Success(_) => {
                info!(tool = %request.tool_name, elapsed_ms, "Tool completed")
            }
            InvocationResult::Failure(failure) => warn!(
                tool = %request.tool_name,
                kind = ?failure.kind,
                error = %failure.message,
                elapsed_ms,
                "Tool rejected"
            ),
        }
        result
    }

    async fn dispatch(&self, request: &InvocationRequest) -> InvocationResult {
        let fail = |kind: FailureKind, message: String| {
            InvocationResult::Failure(InvocationFailure {
                kind,
                message,
                tool_name: request.tool_name.clone(),
                arguments: request.arguments.clone(),
            })
        };

        let tool = match request.tool_name.parse::<ToolName>() {
            Ok(tool) => tool,
            Err(e) => return fail(FailureKind::UnknownTool, e.to_string()),
        };

        let arguments = match validate(tool.descriptor(), &request.arguments) {
            Ok(arguments) => arguments,
            Err(e) => return fail(e.kind(), e.to_string()),
        };

        let call = match ToolCall::parse(tool, &arguments) {
            Ok(call) => call,
            Err(e) => return fail(FailureKind::InvalidArgument, e.to_string()),
        };
        let language = call.language();

        let clients = self.clients.clone();
        let deadline = self.call_timeout;
        let task = tokio::spawn(async move {
            tokio::time::timeout(deadline, handlers::execute(call, &clients)).await
        });

        let outcome = match task.await {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_elapsed)) => Err(HandlerError::Provider(ProviderError::Timeout(deadline))),
            Err(join_error) => {
                error!(tool = %tool, error = %join_error, "Tool handler aborted");
                return fail(
                    FailureKind::Internal,
                    format!("Tool handler failed: {}", join_error),
                );
            }
        };

        match outcome {
            Ok(payload) => InvocationResult::Success(payload),
            Err(HandlerError::Provider(e)) => {
                warn!(tool = %tool, error = %e, "Provider error");
                InvocationResult::Success(provider_error_payload(tool, &arguments, language, &e))
            }
            Err(e @ HandlerError::InvalidArgument { .. }) => {
                fail(FailureKind::InvalidArgument, e.to_string())
            }
            Err(e @ HandlerError::Serialization(_)) => {
                error!(tool = %tool, error = %e, "Internal failure");
                fail(FailureKind::Internal, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::StubProvider;
    use serde_json::json;
    use std::sync::Arc;

    fn dispatcher_with(sv: StubProvider) -> (Arc<StubProvider>, Dispatcher) {
        let sv = Arc::new(sv);
        let en = Arc::new(StubProvider::new(Language::En));
        let dispatcher = Dispatcher::new(ProviderClients::new(sv.clone(), en));
        (sv, dispatcher)
    }

    fn dispatcher() -> (Arc<StubProvider>, Dispatcher) {
        dispatcher_with(StubProvider::new(Language::Sv))
    }

    fn failure(result: InvocationResult) -> InvocationFailure {
        match result {
            InvocationResult::Failure(failure) => failure,
            other => panic!("expected failure, got {:?}", other),
        }
    }

    fn payload(result: InvocationResult) -> Value {
        match result {
            InvocationResult::Success(payload) => payload,
            other => panic!("expected success, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (sv, dispatcher) = dispatcher();
        let result = dispatcher
            .invoke(InvocationRequest::new("drop_tables", json!({})))
            .await;

        let failure = failure(result);
        assert_eq!(failure.kind, FailureKind::UnknownTool);
        assert_eq!(failure.message, "Unknown tool: drop_tables");
        assert_eq!(sv.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_required_argument_never_reaches_provider() {
        let (sv, dispatcher) = dispatcher();
        let result = dispatcher
            .invoke(InvocationRequest::new("fetch_data", json!({"query": {}})))
            .await;

        let failure = failure(result);
        assert_eq!(failure.kind, FailureKind::MissingArgument);
        assert_eq!(failure.message, "Missing required argument 'table_id'");
        assert_eq!(failure.tool_name, "fetch_data");
        assert_eq!(failure.arguments, json!({"query": {}}));
        assert_eq!(sv.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_arguments_reported_in_schema_order() {
        let (_, dispatcher) = dispatcher();
        let result = dispatcher
            .invoke(InvocationRequest::new("fetch_data", Value::Null))
            .await;
        assert_eq!(failure(result).message, "Missing required argument 'table_id'");

        let result = dispatcher
            .invoke(InvocationRequest::new("fetch_data", json!({"table_id": "T", "query": null})))
            .await;
        assert_eq!(failure(result).message, "Missing required argument 'query'");
    }

    #[tokio::test]
    async fn test_wrong_argument_type() {
        let (sv, dispatcher) = dispatcher();
        let result = dispatcher
            .invoke(InvocationRequest::new(
                "fetch_data",
                json!({"table_id": "T", "query": ["Tid"]}),
            ))
            .await;

        let failure = failure(result);
        assert_eq!(failure.kind, FailureKind::InvalidArgument);
        assert_eq!(failure.message, "Invalid argument 'query': expected object");
        assert_eq!(sv.calls(), 0);
    }

    #[tokio::test]
    async fn test_non_object_arguments() {
        let (_, dispatcher) = dispatcher();
        let result = dispatcher
            .invoke(InvocationRequest::new("browse_metadata", json!("BE")))
            .await;
        assert_eq!(failure(result).kind, FailureKind::InvalidArgument);
    }

    #[tokio::test]
    async fn test_unknown_fields_are_ignored_and_defaults_applied() {
        let (sv, dispatcher) = dispatcher();
        let result = dispatcher
            .invoke(InvocationRequest::new("browse_metadata", json!({"depth": 3})))
            .await;

        let payload = payload(result);
        assert_eq!(payload["path"], "root");
        assert_eq!(payload["language"], "sv");
        assert_eq!(sv.calls(), 1);
    }

    #[tokio::test]
    async fn test_legacy_alias_dispatches() {
        let (_, dispatcher) = dispatcher();
        let result = dispatcher
            .invoke(InvocationRequest::new(
                "scb_get_table_info",
                json!({"table_id": "BE0101N1"}),
            ))
            .await;
        assert_eq!(payload(result)["url"], "stub://sv/BE0101N1");
    }

    #[tokio::test]
    async fn test_provider_error_is_in_payload() {
        let (_, dispatcher) = dispatcher_with(
            StubProvider::new(Language::Sv)
                .failing(ProviderError::Unreachable("connection refused".to_string())),
        );
        let result = dispatcher
            .invoke(InvocationRequest::new(
                "fetch_data",
                json!({"table_id": "BE0101N1", "query": {"Tid": ["2023"]}, "language": "xx"}),
            ))
            .await;

        let payload = payload(result);
        assert_eq!(
            payload,
            json!({
                "error": "Failed to reach statistics provider: connection refused",
                "table_id": "BE0101N1",
                "query": {"Tid": ["2023"]},
                "language": "sv"
            })
        );
    }

    #[tokio::test]
    async fn test_browse_error_echoes_path() {
        let (_, dispatcher) = dispatcher_with(
            StubProvider::new(Language::Sv).failing(ProviderError::NotFound("x".to_string())),
        );
        let result = dispatcher
            .invoke(InvocationRequest::new("browse_metadata", json!({"path": "BE/XX"})))
            .await;

        assert_eq!(
            payload(result),
            json!({"error": "Not found: x", "path": "BE/XX", "language": "sv"})
        );
    }

    #[tokio::test]
    async fn test_unknown_table_echoes_table_id() {
        let (_, dispatcher) = dispatcher();
        let result = dispatcher
            .invoke(InvocationRequest::new("get_table_metadata", json!({"table_id": "NOPE"})))
            .await;

        let payload = payload(result);
        assert_eq!(payload["error"], "Table not found: NOPE");
        assert_eq!(payload["table_id"], "NOPE");
        assert!(payload.get("variables").is_none());
    }

    #[tokio::test]
    async fn test_invalid_selection_is_in_payload() {
        let (sv, dispatcher) = dispatcher();
        let result = dispatcher
            .invoke(InvocationRequest::new(
                "fetch_data",
                json!({"table_id": "BE0101N1", "query": {"Kon": ["1"]}}),
            ))
            .await;

        let payload = payload(result);
        assert_eq!(payload["error"], "Invalid selection: unknown dimension 'Kon'");
        assert!(sv.last_query().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_timeout() {
        let (_, dispatcher) = dispatcher_with(
            StubProvider::new(Language::Sv).stalling(Duration::from_secs(600)),
        );
        let dispatcher = dispatcher.with_call_timeout(Duration::from_secs(5));

        let result = dispatcher
            .invoke(InvocationRequest::new("search_tables", json!({"query": "folk"})))
            .await;

        let payload = payload(result);
        assert_eq!(payload["error"], "Provider call timed out after 5s");
        assert_eq!(payload["query"], "folk");
    }

    #[tokio::test]
    async fn test_panicking_handler_is_contained() {
        let (_, panicking) =
            dispatcher_with(StubProvider::new(Language::Sv).panicking());

        let result = panicking
            .invoke(InvocationRequest::new("search_tables", json!({"query": "folk"})))
            .await;

        let failure = failure(result);
        assert_eq!(failure.kind, FailureKind::Internal);
        assert_eq!(failure.arguments, json!({"query": "folk"}));

        let (_, healthy) = dispatcher();
        let again = healthy
            .invoke(InvocationRequest::new("search_tables", json!({"query": "folk"})))
            .await;
        assert!(again.is_success());
    }

    #[tokio::test]
    async fn test_concurrent_invocations_are_independent() {
        let (sv, dispatcher) = dispatcher();
        let dispatcher = Arc::new(dispatcher);

        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let dispatcher = dispatcher.clone();
                tokio::spawn(async move {
                    dispatcher
                        .invoke(InvocationRequest::new(
                            "get_table_info",
                            json!({"table_id": format!("T{}", i)}),
                        ))
                        .await
                })
            })
            .collect();

        for (i, task) in tasks.into_iter().enumerate() {
            let payload = payload(task.await.unwrap());
            assert_eq!(payload["table_id"], format!("T{}", i));
        }
        assert_eq!(sv.calls(), 8);
    }
}
