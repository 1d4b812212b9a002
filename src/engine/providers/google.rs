// ── Octoscout Engine: Google Gemini provider ───────────────────────────────
// Implements the ModelProvider trait over the generateContent endpoint with
// function calling. Non-streaming: each query wants one aggregated answer.

use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::Client;
use serde_json::{json, Value};

use crate::atoms::traits::{ModelProvider, ProviderError};
use crate::engine::http::{is_retryable_status, parse_retry_after, retry_delay, MAX_RETRIES};
use crate::engine::types::{
    truncate_utf8, FunctionCall, Message, ModelTurn, ProviderConfig, Role, ToolCall,
    ToolDefinition,
};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

// ── Struct ─────────────────────────────────────────────────────────────────

pub struct GoogleProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GoogleProvider {
    pub fn new(config: &ProviderConfig) -> Self {
        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        GoogleProvider {
            client: Client::builder()
                .connect_timeout(std::time::Duration::from_secs(10))
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_default(),
            base_url,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        }
    }

    /// Map our message history onto Gemini's systemInstruction + contents.
    fn format_messages(messages: &[Message]) -> (Option<Value>, Vec<Value>) {
        let mut system_instruction: Option<Value> = None;
        let mut contents: Vec<Value> = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => {
                    // Merge multiple system messages into one systemInstruction
                    if let Some(ref mut existing) = system_instruction {
                        let prev = existing["parts"][0]["text"].as_str().unwrap_or("").to_string();
                        existing["parts"][0]["text"] = json!(format!("{}\n\n{}", prev, msg.content));
                    } else {
                        system_instruction = Some(json!({"parts": [{"text": msg.content}]}));
                    }
                }
                Role::Tool => {
                    let fn_name = msg
                        .name
                        .clone()
                        .or_else(|| msg.tool_call_id.clone())
                        .unwrap_or_default();
                    contents.push(json!({
                        "role": "function",
                        "parts": [{
                            "functionResponse": {
                                "name": fn_name,
                                "response": {"result": msg.content}
                            }
                        }]
                    }));
                }
                Role::Assistant => {
                    if let Some(tool_calls) = &msg.tool_calls {
                        let mut parts: Vec<Value> = vec![];
                        if !msg.content.is_empty() {
                            parts.push(json!({"text": msg.content}));
                        }
                        for tc in tool_calls {
                            let args: Value =
                                serde_json::from_str(&tc.function.arguments).unwrap_or(json!({}));
                            parts.push(json!({
                                "functionCall": {
                                    "name": tc.function.name,
                                    "args": args,
                                }
                            }));
                        }
                        contents.push(json!({"role": "model", "parts": parts}));
                    } else {
                        contents.push(json!({
                            "role": "model",
                            "parts": [{"text": msg.content}]
                        }));
                    }
                }
                Role::User => {
                    contents.push(json!({
                        "role": "user",
                        "parts": [{"text": msg.content}]
                    }));
                }
            }
        }

        // ── Merge consecutive same-role entries ───────────────────────
        // Gemini requires alternating user/model turns; consecutive entries
        // with the same role cause INVALID_ARGUMENT 400.
        let mut merged: Vec<Value> = Vec::new();
        for entry in contents {
            let entry_role = entry["role"].as_str().unwrap_or("").to_string();
            let can_merge = !merged.is_empty()
                && merged
                    .last()
                    .and_then(|e| e["role"].as_str())
                    .map(|r| r == entry_role)
                    .unwrap_or(false)
                && entry_role != "function"; // never merge function responses

            if can_merge {
                if let Some(last) = merged.last_mut() {
                    if let (Some(existing_parts), Some(new_parts)) =
                        (last["parts"].as_array().cloned(), entry["parts"].as_array())
                    {
                        let mut combined = existing_parts;
                        combined.extend(new_parts.iter().cloned());
                        last["parts"] = json!(combined);
                    }
                }
            } else {
                merged.push(entry);
            }
        }

        (system_instruction, merged)
    }

    /// Strip schema fields that Gemini doesn't support and fix invalid
    /// patterns. Gemini rejects:
    /// - `additionalProperties`, `$schema`, `$ref`
    /// - `"required": []` (empty array — must be omitted)
    /// - `"properties": {}` when `type: "object"` (needs at least one prop)
    fn sanitize_schema(val: &Value) -> Value {
        match val {
            Value::Object(map) => {
                let mut clean = serde_json::Map::new();
                for (k, v) in map {
                    if k == "additionalProperties" || k == "$schema" || k == "$ref" {
                        continue;
                    }
                    if k == "required" {
                        if let Value::Array(arr) = v {
                            if arr.is_empty() {
                                continue;
                            }
                        }
                    }
                    if k == "properties" {
                        if let Value::Object(props) = v {
                            if props.is_empty() {
                                continue;
                            }
                        }
                    }
                    clean.insert(k.clone(), Self::sanitize_schema(v));
                }
                // A type:object with no properties left makes Gemini complain;
                // drop the type and let it infer.
                if clean.get("type").and_then(|v| v.as_str()) == Some("object")
                    && !clean.contains_key("properties")
                {
                    clean.remove("type");
                }
                Value::Object(clean)
            }
            Value::Array(arr) => Value::Array(arr.iter().map(Self::sanitize_schema).collect()),
            other => other.clone(),
        }
    }

    fn format_tools(tools: &[ToolDefinition]) -> Value {
        let function_declarations: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.function.name,
                    "description": t.function.description,
                    "parameters": Self::sanitize_schema(&t.function.parameters),
                })
            })
            .collect();

        json!([{ "functionDeclarations": function_declarations }])
    }

    /// Interpret a generateContent response body as one model turn.
    fn parse_response(body: &Value) -> Result<ModelTurn, ProviderError> {
        if let Some(um) = body.get("usageMetadata") {
            debug!(
                "[engine] Google usage: prompt={} candidates={}",
                um["promptTokenCount"].as_u64().unwrap_or(0),
                um["candidatesTokenCount"].as_u64().unwrap_or(0)
            );
        }

        if let Some(reason) = body["promptFeedback"]["blockReason"].as_str() {
            return Err(ProviderError::Response(format!(
                "prompt blocked by Google ({})",
                reason
            )));
        }

        let candidate = body["candidates"]
            .as_array()
            .and_then(|c| c.first())
            .ok_or_else(|| ProviderError::Response("no candidates in response".into()))?;

        let finish_reason = candidate["finishReason"].as_str().unwrap_or("STOP");
        let parts = match candidate["content"]["parts"].as_array() {
            Some(parts) => parts,
            None => {
                return Err(ProviderError::Response(format!(
                    "empty response (finishReason={})",
                    finish_reason
                )));
            }
        };

        let mut text = String::new();
        let mut calls: Vec<ToolCall> = Vec::new();
        for part in parts {
            if let Some(t) = part["text"].as_str() {
                text.push_str(t);
            }
            if let Some(fc) = part.get("functionCall") {
                let name = fc["name"].as_str().unwrap_or("").to_string();
                let args = serde_json::to_string(&fc["args"]).unwrap_or_else(|_| "{}".into());
                calls.push(ToolCall {
                    id: format!("call_{}", uuid::Uuid::new_v4()),
                    function: FunctionCall { name, arguments: args },
                });
            }
        }

        if !calls.is_empty() {
            info!("[engine] Google requested {} tool call(s)", calls.len());
            return Ok(ModelTurn::ToolCalls { text, calls });
        }
        if text.is_empty() {
            return Err(ProviderError::Response(format!(
                "response had no text and no tool calls (finishReason={})",
                finish_reason
            )));
        }
        Ok(ModelTurn::Answer(text))
    }

    /// Inner implementation with retry + error classification.
    async fn converse_inner(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url.trim_end_matches('/'),
            self.model,
            self.api_key
        );

        let (system_instruction, contents) = Self::format_messages(messages);

        let mut body = json!({ "contents": contents });
        if let Some(sys) = system_instruction {
            body["systemInstruction"] = sys;
        }
        if !tools.is_empty() {
            body["tools"] = Self::format_tools(tools);
        }

        info!("[engine] Google request model={}", self.model);

        let mut last_error = String::new();
        let mut last_status: u16 = 0;
        let mut retry_after: Option<u64> = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let delay = retry_delay(attempt - 1, retry_after.take()).await;
                warn!(
                    "[engine] Google retry {}/{} after {}ms",
                    attempt,
                    MAX_RETRIES,
                    delay.as_millis()
                );
            }

            let response = match self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = format!("HTTP request failed: {}", e);
                    last_status = 0;
                    if attempt < MAX_RETRIES {
                        continue;
                    }
                    return Err(ProviderError::Transport(last_error));
                }
            };

            if !response.status().is_success() {
                let status = response.status().as_u16();
                last_status = status;
                retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_retry_after);
                let body_text = response.text().await.unwrap_or_default();
                last_error = format!("API error {}: {}", status, truncate_utf8(&body_text, 200));
                error!(
                    "[engine] Google error {}: {}",
                    status,
                    truncate_utf8(&body_text, 500)
                );

                // Auth errors are never retried
                if status == 401 || status == 403 {
                    return Err(ProviderError::Auth(last_error));
                }
                if is_retryable_status(status) && attempt < MAX_RETRIES {
                    continue;
                }
                return if status == 429 {
                    Err(ProviderError::RateLimited {
                        message: last_error,
                        retry_after_secs: retry_after.take(),
                    })
                } else {
                    Err(ProviderError::Api { status, message: last_error })
                };
            }

            let payload: Value = response
                .json()
                .await
                .map_err(|e| ProviderError::Transport(format!("Body read error: {}", e)))?;
            return Self::parse_response(&payload);
        }

        // All retries exhausted — classify the last error
        match last_status {
            0 => Err(ProviderError::Transport(last_error)),
            429 => Err(ProviderError::RateLimited { message: last_error, retry_after_secs: retry_after }),
            s => Err(ProviderError::Api { status: s, message: last_error }),
        }
    }
}

// ── ModelProvider trait implementation ─────────────────────────────────────

#[async_trait]
impl ModelProvider for GoogleProvider {
    fn name(&self) -> &str {
        "google"
    }

    async fn converse(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn, ProviderError> {
        self.converse_inner(messages, tools).await
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::types::FunctionDefinition;

    fn tool_msg(name: &str, output: &str) -> Message {
        Message {
            role: Role::Tool,
            content: output.into(),
            tool_calls: None,
            tool_call_id: Some("call_1".into()),
            name: Some(name.into()),
        }
    }

    #[test]
    fn test_format_messages_system_instruction() {
        let msgs = vec![Message::system("be brief"), Message::user("hi")];
        let (sys, contents) = GoogleProvider::format_messages(&msgs);
        assert_eq!(sys.unwrap()["parts"][0]["text"], "be brief");
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["role"], "user");
    }

    #[test]
    fn test_format_messages_function_response() {
        let msgs = vec![
            Message::user("how many issues?"),
            Message::assistant(
                "",
                Some(vec![ToolCall {
                    id: "call_1".into(),
                    function: FunctionCall {
                        name: "list_issues".into(),
                        arguments: r#"{"repo":"octo/repo"}"#.into(),
                    },
                }]),
            ),
            tool_msg("list_issues", "3 open issues"),
        ];
        let (_, contents) = GoogleProvider::format_messages(&msgs);
        assert_eq!(contents.len(), 3);
        assert_eq!(contents[1]["role"], "model");
        assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "list_issues");
        assert_eq!(contents[2]["role"], "function");
        assert_eq!(
            contents[2]["parts"][0]["functionResponse"]["response"]["result"],
            "3 open issues"
        );
    }

    #[test]
    fn test_format_messages_merges_consecutive_user_turns() {
        let msgs = vec![Message::user("one"), Message::user("two")];
        let (_, contents) = GoogleProvider::format_messages(&msgs);
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0]["parts"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_sanitize_schema_strips_unsupported_fields() {
        let schema = json!({
            "type": "object",
            "$schema": "http://json-schema.org/draft-07/schema#",
            "additionalProperties": false,
            "required": [],
            "properties": {
                "repo": {"type": "string"}
            }
        });
        let clean = GoogleProvider::sanitize_schema(&schema);
        assert!(clean.get("$schema").is_none());
        assert!(clean.get("additionalProperties").is_none());
        assert!(clean.get("required").is_none());
        assert_eq!(clean["properties"]["repo"]["type"], "string");
    }

    #[test]
    fn test_sanitize_schema_empty_object() {
        let schema = json!({"type": "object", "properties": {}});
        let clean = GoogleProvider::sanitize_schema(&schema);
        assert!(clean.get("properties").is_none());
        assert!(clean.get("type").is_none());
    }

    #[test]
    fn test_format_tools_shape() {
        let tools = vec![ToolDefinition {
            function: FunctionDefinition {
                name: "list_issues".into(),
                description: "List issues".into(),
                parameters: json!({"type": "object", "properties": {"repo": {"type": "string"}}}),
            },
        }];
        let v = GoogleProvider::format_tools(&tools);
        assert_eq!(v[0]["functionDeclarations"][0]["name"], "list_issues");
    }

    #[test]
    fn test_parse_response_answer() {
        let body = json!({
            "candidates": [{
                "content": {"parts": [{"text": "3 open issues"}], "role": "model"},
                "finishReason": "STOP"
            }]
        });
        match GoogleProvider::parse_response(&body).unwrap() {
            ModelTurn::Answer(text) => assert_eq!(text, "3 open issues"),
            other => panic!("expected answer, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_response_tool_calls() {
        let body = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        {"text": "Let me check."},
                        {"functionCall": {"name": "list_issues", "args": {"repo": "octo/repo"}}}
                    ],
                    "role": "model"
                }
            }]
        });
        match GoogleProvider::parse_response(&body).unwrap() {
            ModelTurn::ToolCalls { text, calls } => {
                assert_eq!(text, "Let me check.");
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].function.name, "list_issues");
                let args: Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
                assert_eq!(args["repo"], "octo/repo");
            }
            other => panic!("expected tool calls, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_response_blocked() {
        let body = json!({
            "candidates": [{"finishReason": "SAFETY"}],
        });
        let err = GoogleProvider::parse_response(&body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_parse_response_no_candidates() {
        let body = json!({"promptFeedback": {"blockReason": "BLOCKLIST"}});
        let err = GoogleProvider::parse_response(&body).unwrap_err();
        assert!(err.to_string().contains("BLOCKLIST"));
    }
}
