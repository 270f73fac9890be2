// MCP (Model Context Protocol) server for Statistics Sweden (SCB) open data
// Exposes the statistics tools to agent clients over JSON-RPC 2.0

pub mod protocol;
pub mod server;
pub mod tools;

pub use server::McpServer;
pub use tools::{Dispatcher, InvocationRequest, InvocationResult};
