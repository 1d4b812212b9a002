// ── Octoscout Engine: Tool registry ────────────────────────────────────────
// Bridges discovered MCP tool descriptors to the model's tool-declaration
// format and routes invocations back to the session, partitioning errors:
//   unknown tool / malformed arguments → ToolContract (aborts the loop)
//   provider-reported failure          → ToolProvider (fed back to the model)

use log::{info, warn};

use crate::atoms::error::{AgentError, AgentResult};
use crate::atoms::traits::ToolSession;
use crate::engine::mcp::types::ToolDescriptor;
use crate::engine::types::{FunctionDefinition, ToolDefinition};

/// The tools one session offers, frozen at discovery time.
pub struct ToolRegistry {
    descriptors: Vec<ToolDescriptor>,
}

impl ToolRegistry {
    /// Capture the session's discovered tools. An empty set is permitted —
    /// the query proceeds as a tool-less model call.
    pub fn discover(session: &dyn ToolSession) -> Self {
        let descriptors = session.descriptors().to_vec();
        if descriptors.is_empty() {
            warn!("[engine] No tools discovered — proceeding with a tool-less model call");
        } else {
            info!("[engine] Discovered {} tools", descriptors.len());
        }
        ToolRegistry { descriptors }
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    /// Model-facing tool declarations.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.descriptors.iter().map(descriptor_to_definition).collect()
    }

    /// Invoke one tool through the session. `raw_arguments` is the
    /// JSON-encoded argument string as the model produced it.
    pub async fn invoke(
        &self,
        session: &dyn ToolSession,
        name: &str,
        raw_arguments: &str,
    ) -> AgentResult<String> {
        if !self.descriptors.iter().any(|d| d.name == name) {
            return Err(AgentError::contract(name, "unknown tool"));
        }

        let arguments: serde_json::Value = if raw_arguments.trim().is_empty() {
            serde_json::json!({})
        } else {
            serde_json::from_str(raw_arguments)
                .map_err(|e| AgentError::contract(name, format!("arguments are not valid JSON: {}", e)))?
        };

        if !arguments.is_object() {
            return Err(AgentError::contract(name, "arguments must be a JSON object"));
        }

        session.call_tool(name, arguments).await
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────

fn descriptor_to_definition(tool: &ToolDescriptor) -> ToolDefinition {
    ToolDefinition {
        function: FunctionDefinition {
            name: tool.name.clone(),
            description: tool
                .description
                .clone()
                .unwrap_or_else(|| "(no description)".to_string()),
            parameters: tool.input_schema.clone(),
        },
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoSession {
        tools: Vec<ToolDescriptor>,
        calls: AtomicUsize,
    }

    impl EchoSession {
        fn with_tool(name: &str) -> Self {
            EchoSession {
                tools: vec![ToolDescriptor {
                    name: name.into(),
                    description: Some("test tool".into()),
                    input_schema: serde_json::json!({"type": "object", "properties": {}}),
                }],
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ToolSession for EchoSession {
        fn descriptors(&self) -> &[ToolDescriptor] {
            &self.tools
        }

        async fn call_tool(
            &self,
            _name: &str,
            arguments: serde_json::Value,
        ) -> AgentResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(arguments.to_string())
        }

        async fn shutdown(&self) {}
    }

    #[tokio::test]
    async fn test_invoke_round_trips_arguments() {
        let session = EchoSession::with_tool("echo");
        let registry = ToolRegistry::discover(&session);
        let out = registry
            .invoke(&session, "echo", r#"{"a":1,"b":"two"}"#)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, serde_json::json!({"a": 1, "b": "two"}));
    }

    #[tokio::test]
    async fn test_unknown_tool_is_contract_violation() {
        let session = EchoSession::with_tool("echo");
        let registry = ToolRegistry::discover(&session);
        let err = registry.invoke(&session, "nope", "{}").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolContract { .. }));
        // The session was never reached
        assert_eq!(session.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_arguments_are_contract_violation() {
        let session = EchoSession::with_tool("echo");
        let registry = ToolRegistry::discover(&session);
        let err = registry.invoke(&session, "echo", "{not json").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolContract { .. }));

        let err = registry.invoke(&session, "echo", "[1,2,3]").await.unwrap_err();
        assert!(matches!(err, AgentError::ToolContract { .. }));
    }

    #[tokio::test]
    async fn test_empty_arguments_default_to_object() {
        let session = EchoSession::with_tool("echo");
        let registry = ToolRegistry::discover(&session);
        let out = registry.invoke(&session, "echo", "").await.unwrap();
        assert_eq!(out, "{}");
    }

    #[test]
    fn test_descriptor_conversion_fallback_description() {
        let tool = ToolDescriptor {
            name: "ping".into(),
            description: None,
            input_schema: serde_json::json!({"type": "object"}),
        };
        let def = descriptor_to_definition(&tool);
        assert_eq!(def.function.name, "ping");
        assert_eq!(def.function.description, "(no description)");
    }

    #[test]
    fn test_empty_registry_is_not_an_error() {
        struct Bare;
        #[async_trait]
        impl ToolSession for Bare {
            fn descriptors(&self) -> &[ToolDescriptor] {
                &[]
            }
            async fn call_tool(&self, _: &str, _: serde_json::Value) -> AgentResult<String> {
                unreachable!()
            }
            async fn shutdown(&self) {}
        }
        let registry = ToolRegistry::discover(&Bare);
        assert!(registry.is_empty());
        assert!(registry.definitions().is_empty());
    }
}
