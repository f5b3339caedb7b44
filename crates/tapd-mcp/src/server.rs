//! MCP server over stdio
//!
//! One JSON-RPC message per line on stdin, one response per line on
//! stdout. Logging goes to stderr so the transport stays clean.

use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

use crate::rpc::{self, Request, Response, RpcFailure};
use crate::tools::{self, ToolResult};

const SERVER_NAME: &str = "tapd";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Tool dispatch seam. The server owns transport and protocol; tool
/// behavior is injected through this trait.
#[async_trait::async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, name: &str, arguments: Value) -> ToolResult;
}

/// MCP server driving a `ToolHandler` over stdio.
pub struct McpServer<H: ToolHandler> {
    handler: Arc<H>,
}

impl<H: ToolHandler> McpServer<H> {
    pub fn new(handler: H) -> Self {
        McpServer {
            handler: Arc::new(handler),
        }
    }

    /// Run until stdin closes.
    pub async fn run(&mut self) -> anyhow::Result<()> {
        info!("Starting MCP server on stdio");

        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);

        let mut line = String::new();
        loop {
            line.clear();
            if reader.read_line(&mut line).await? == 0 {
                info!("EOF on stdin, shutting down");
                break;
            }

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            debug!("<- {}", line);

            if let Some(response) = self.handle_line(line).await {
                let wire = rpc::encode_response(&response);
                debug!("-> {}", wire);
                stdout.write_all(wire.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle one transport line. Notifications yield no response.
    async fn handle_line(&self, line: &str) -> Option<Response> {
        let request = match rpc::decode_request(line) {
            Ok(request) => request,
            Err(failure) => return Some(Response::fail(None, failure)),
        };

        if request.is_notification() {
            debug!(method = %request.method, "notification");
            return None;
        }

        Some(self.handle_request(request).await)
    }

    async fn handle_request(&self, request: Request) -> Response {
        let id = request.id.clone();
        let params = request.params.unwrap_or(Value::Null);

        match request.method.as_str() {
            "initialize" => Response::ok(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": {
                        "name": SERVER_NAME,
                        "version": SERVER_VERSION,
                    }
                }),
            ),
            "tools/list" => Response::ok(id, json!({ "tools": tools::all_tools() })),
            "tools/call" => self.handle_tool_call(id, params).await,
            "ping" => Response::ok(id, json!({})),
            other => {
                warn!(method = %other, "unknown method");
                Response::fail(id, RpcFailure::method_not_found(other))
            }
        }
    }

    async fn handle_tool_call(
        &self,
        id: Option<crate::rpc::RequestId>,
        params: Value,
    ) -> Response {
        let Some(name) = params.get("name").and_then(Value::as_str) else {
            return Response::fail(id, RpcFailure::invalid_params("missing tool name"));
        };
        let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

        if tools::get_tool(name).is_none() {
            return Response::fail(
                id,
                RpcFailure::invalid_params(format!("unknown tool {:?}", name)),
            );
        }

        let result = self.handler.call(name, arguments).await;
        match serde_json::to_value(&result) {
            Ok(value) => Response::ok(id, value),
            Err(e) => Response::fail(id, RpcFailure::internal(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoHandler;

    #[async_trait::async_trait]
    impl ToolHandler for EchoHandler {
        async fn call(&self, name: &str, arguments: Value) -> ToolResult {
            ToolResult::json(&json!({ "tool": name, "arguments": arguments }))
        }
    }

    fn server() -> McpServer<EchoHandler> {
        McpServer::new(EchoHandler)
    }

    #[tokio::test]
    async fn test_initialize() {
        let resp = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"initialize","id":1}"#)
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["serverInfo"]["name"], "tapd");
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn test_tools_list() {
        let resp = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"tools/list","id":2}"#)
            .await
            .unwrap();
        let tools = resp.result.unwrap()["tools"].as_array().unwrap().len();
        assert_eq!(tools, 5);
    }

    #[tokio::test]
    async fn test_tools_call_dispatches() {
        let resp = server()
            .handle_line(
                r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"ui_tap","arguments":{"selector":"@e1"}},"id":3}"#,
            )
            .await
            .unwrap();
        let result = resp.result.unwrap();
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("ui_tap"));
        assert!(text.contains("@e1"));
    }

    #[tokio::test]
    async fn test_unknown_tool_rejected() {
        let resp = server()
            .handle_line(
                r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"bogus"},"id":4}"#,
            )
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, RpcFailure::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let resp = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"resources/list","id":5}"#)
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, RpcFailure::METHOD_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_notification_gets_no_response() {
        let resp = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#)
            .await;
        assert!(resp.is_none());
    }

    #[tokio::test]
    async fn test_ping() {
        let resp = server()
            .handle_line(r#"{"jsonrpc":"2.0","method":"ping","id":6}"#)
            .await
            .unwrap();
        assert!(resp.error.is_none());
    }
}
