//! MCP (Model Context Protocol) server for tapd
//!
//! Exposes mobile UI automation to agents over stdio JSON-RPC:
//!
//! - Self-contained JSON-RPC 2.0 protocol implementation
//! - Async stdio transport using tokio
//! - 5 MCP tools:
//!   - `ui_snapshot`: canonical element tree with per-snapshot refs
//!   - `ui_tap` / `ui_type`: act on a selector (`@e<N>`, `coords:`,
//!     `text:`, `id:`)
//!   - `ui_describe`: resolve a selector without touching the device
//!   - `runs_gc`: retention over accumulated run directories
//!
//! # Example
//!
//! ```no_run
//! use tapd_mcp::{McpServer, ToolHandler, ToolResult};
//! use serde_json::Value;
//!
//! struct MyHandler;
//!
//! #[async_trait::async_trait]
//! impl ToolHandler for MyHandler {
//!     async fn call(&self, name: &str, arguments: Value) -> ToolResult {
//!         ToolResult::json(&serde_json::json!({"status": "ok"}))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = McpServer::new(MyHandler);
//!     server.run().await
//! }
//! ```

pub mod adapters;
pub mod handler;
pub mod rpc;
pub mod server;
pub mod tools;

// Re-exports for convenience
pub use adapters::{AdbAdapter, DeviceAdapter, IdbAdapter, RawDump};
pub use handler::TapdHandler;
pub use rpc::{Request, RequestId, Response, RpcFailure};
pub use server::{McpServer, ToolHandler};
pub use tools::{all_tools, get_tool, ToolContent, ToolDefinition, ToolResult};
