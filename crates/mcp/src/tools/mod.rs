pub mod dispatch;
pub mod handlers;
mod registry;
#[cfg(test)]
pub(crate) mod testing;

pub use dispatch::{
    Dispatcher, FailureKind, InvocationFailure, InvocationRequest, InvocationResult,
    DEFAULT_CALL_TIMEOUT,
};
pub use handlers::{HandlerError, ToolCall};
pub use registry::{
    json_schema_map, json_schema_object, json_schema_string, list_tools, tool_schemas,
    ArgumentSpec, ArgumentType, ToolDescriptor, ToolName, UnknownTool, LEGACY_PREFIX,
};
