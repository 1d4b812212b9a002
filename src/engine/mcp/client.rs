// ── Octoscout Engine: MCP session ──────────────────────────────────────────
// One connected session with the tool-provider process. `connect` performs
// spawn → initialize handshake → tools/list, in that order, so a session
// value never exists in a non-handshaken state. One session per query.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use log::info;

use crate::atoms::error::{AgentError, AgentResult};
use crate::atoms::traits::ToolSession;
use crate::engine::launcher::ServerLaunchSpec;

use super::transport::StdioTransport;
use super::types::*;

/// MCP protocol version we advertise.
const PROTOCOL_VERSION: &str = "2024-11-05";
/// Timeout for handshake and discovery requests (seconds).
const DEFAULT_TIMEOUT: u64 = 30;
/// Timeout for tool calls — GitHub API round-trips can be slow (seconds).
const TOOL_CALL_TIMEOUT: u64 = 120;

/// A handshaken MCP session over a child process's stdio.
pub struct McpSession {
    transport: StdioTransport,
    /// Monotonically increasing request ID.
    next_id: AtomicU64,
    /// Server identity from the initialize response.
    pub server_info: Option<ServerInfo>,
    /// Tools discovered at establishment; immutable for the session lifetime.
    tools: Vec<ToolDescriptor>,
}

impl McpSession {
    /// Launch the tool server and establish a session: spawn the process,
    /// run the initialize handshake, then fetch the tool list.
    pub async fn connect(spec: &ServerLaunchSpec) -> AgentResult<Self> {
        let transport = StdioTransport::spawn(spec.command(), spec.args(), spec.env())
            .await
            .map_err(AgentError::Launch)?;

        let mut session = McpSession {
            transport,
            next_id: AtomicU64::new(1),
            server_info: None,
            tools: vec![],
        };

        if let Err(e) = session.initialize().await {
            // Partial failure: the process is up but the session is not —
            // tear the child down before reporting.
            session.transport.shutdown().await;
            return Err(e);
        }

        if let Err(e) = session.discover_tools().await {
            session.transport.shutdown().await;
            return Err(e);
        }

        Ok(session)
    }

    /// MCP `initialize` handshake plus the `initialized` notification.
    async fn initialize(&mut self) -> AgentResult<()> {
        let params = InitializeParams {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ClientCapabilities::default(),
            client_info: ClientInfo {
                name: "octoscout".into(),
                version: env!("CARGO_PKG_VERSION").into(),
            },
        };

        let req = JsonRpcRequest::new(
            self.next_id(),
            "initialize",
            Some(serde_json::to_value(&params).map_err(|e| AgentError::Handshake(e.to_string()))?),
        );

        let resp = self
            .transport
            .send_request(req, DEFAULT_TIMEOUT)
            .await
            .map_err(AgentError::Handshake)?;

        if let Some(err) = resp.error {
            return Err(AgentError::Handshake(format!(
                "initialize failed: {} (code={})",
                err.message, err.code
            )));
        }

        if let Some(result) = resp.result {
            let init: InitializeResult = serde_json::from_value(result)
                .map_err(|e| AgentError::Handshake(format!("Parse init result: {}", e)))?;
            info!("[mcp] Server initialized (protocol={})", init.protocol_version);
            self.server_info = init.server_info;
        }

        // `initialized` notification is required before any other request
        self.transport
            .send_notification("notifications/initialized", None)
            .await
            .map_err(AgentError::Handshake)?;

        Ok(())
    }

    /// Fetch the tool list. Runs once, right after the handshake.
    /// An empty list is not an error; a server without tool support
    /// (method not found) is treated the same way.
    async fn discover_tools(&mut self) -> AgentResult<()> {
        let req = JsonRpcRequest::new(self.next_id(), "tools/list", None);
        let resp = self
            .transport
            .send_request(req, DEFAULT_TIMEOUT)
            .await
            .map_err(AgentError::Handshake)?;

        if let Some(err) = resp.error {
            if err.code == -32601 {
                info!("[mcp] Server does not expose tools");
                self.tools = vec![];
                return Ok(());
            }
            return Err(AgentError::Handshake(format!(
                "tools/list failed: {} (code={})",
                err.message, err.code
            )));
        }

        if let Some(result) = resp.result {
            let list: ToolsListResult = serde_json::from_value(result)
                .map_err(|e| AgentError::Handshake(format!("Parse tools/list: {}", e)))?;
            info!("[mcp] Server exposes {} tools", list.tools.len());
            self.tools = list.tools;
        } else {
            self.tools = vec![];
        }

        Ok(())
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }
}

#[async_trait]
impl ToolSession for McpSession {
    fn descriptors(&self) -> &[ToolDescriptor] {
        &self.tools
    }

    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> AgentResult<String> {
        let params = ToolCallParams { name: name.into(), arguments };

        let req = JsonRpcRequest::new(
            self.next_id(),
            "tools/call",
            Some(serde_json::to_value(&params).map_err(|e| AgentError::provider(name, e.to_string()))?),
        );

        let resp = self
            .transport
            .send_request(req, TOOL_CALL_TIMEOUT)
            .await
            .map_err(|e| AgentError::provider(name, e))?;

        if let Some(err) = resp.error {
            return Err(AgentError::provider(
                name,
                format!("{} (code={})", err.message, err.code),
            ));
        }

        let result_val = resp
            .result
            .ok_or_else(|| AgentError::provider(name, "empty result"))?;

        let tool_result: ToolCallResult = serde_json::from_value(result_val)
            .map_err(|e| AgentError::provider(name, format!("Parse tools/call result: {}", e)))?;

        let text = extract_text_content(&tool_result.content);
        if tool_result.is_error {
            return Err(AgentError::provider(name, text));
        }

        Ok(text)
    }

    async fn shutdown(&self) {
        self.transport.shutdown().await;
    }
}

// ── Helpers ────────────────────────────────────────────────────────────────

/// Extract text content from MCP content blocks, concatenated.
fn extract_text_content(content: &[McpContent]) -> String {
    content
        .iter()
        .filter_map(|c| match c {
            McpContent::Text { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Tests ──────────────────────────────────────────────────────────────────
