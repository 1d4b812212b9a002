// ── Octoscout Engine: Core types ───────────────────────────────────────────
// The data structures that flow through the agent loop. They are independent
// of any specific model provider.

use serde::{Deserialize, Serialize};

// ── Provider config ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub api_key: String,
    pub model: String,
    /// Override for the API endpoint; `None` uses the provider default.
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        ProviderConfig { api_key: api_key.into(), model: model.into(), base_url: None }
    }
}

// ── Messages ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message { role: Role::System, content: content.into(), tool_calls: None, tool_call_id: None, name: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message { role: Role::User, content: content.into(), tool_calls: None, tool_call_id: None, name: None }
    }

    pub fn assistant(content: impl Into<String>, tool_calls: Option<Vec<ToolCall>>) -> Self {
        Message { role: Role::Assistant, content: content.into(), tool_calls, tool_call_id: None, name: None }
    }

    /// A tool-result message echoing one invocation's output back to the model.
    pub fn tool_result(call: &ToolCall, output: impl Into<String>) -> Self {
        Message {
            role: Role::Tool,
            content: output.into(),
            tool_calls: None,
            tool_call_id: Some(call.id.clone()),
            name: Some(call.function.name.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

// ── Tool calling ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments object.
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the accepted arguments.
    pub parameters: serde_json::Value,
}

// ── Model turn ─────────────────────────────────────────────────────────────

/// One model response: either the final answer text or a batch of tool-call
/// requests (with any interleaved commentary text).
#[derive(Debug, Clone)]
pub enum ModelTurn {
    Answer(String),
    ToolCalls { text: String, calls: Vec<ToolCall> },
}

// ── Helpers ────────────────────────────────────────────────────────────────

/// Truncate on a char boundary so error snippets never split a UTF-8 sequence.
pub fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let m = Message::system("be brief");
        assert_eq!(m.role, Role::System);
        assert!(m.tool_calls.is_none());

        let call = ToolCall {
            id: "call_1".into(),
            function: FunctionCall { name: "list_issues".into(), arguments: "{}".into() },
        };
        let t = Message::tool_result(&call, "3 open issues");
        assert_eq!(t.role, Role::Tool);
        assert_eq!(t.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(t.name.as_deref(), Some("list_issues"));
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&Role::Assistant).unwrap(), "\"assistant\"");
        let r: Role = serde_json::from_str("\"tool\"").unwrap();
        assert_eq!(r, Role::Tool);
    }

    #[test]
    fn test_truncate_utf8_boundary() {
        let s = "héllo wörld";
        let t = truncate_utf8(s, 2);
        assert!(t.len() <= 2);
        assert!(s.starts_with(t));
        assert_eq!(truncate_utf8("short", 100), "short");
    }
}
