// ── Octoscout Engine: Agent loop ───────────────────────────────────────────
// The core orchestration loop: send to model → tool calls → execute → repeat
// until the model produces a final text answer or the round ceiling is hit.

use log::{info, warn};

use crate::atoms::error::{AgentError, AgentResult};
use crate::atoms::traits::{ModelProvider, ToolSession};
use crate::engine::registry::ToolRegistry;
use crate::engine::types::{Message, ModelTurn};

/// Run one request-to-answer cycle over an established session.
///
/// Tool-provider failures are appended to the conversation so the model can
/// try differently; contract violations (unknown tool, malformed arguments)
/// abort the loop. Exceeding `max_rounds` is a `LoopExhausted` outcome, not a
/// hang.
pub async fn run_agent_turn(
    provider: &dyn ModelProvider,
    session: &dyn ToolSession,
    registry: &ToolRegistry,
    messages: &mut Vec<Message>,
    max_rounds: u32,
) -> AgentResult<String> {
    let tools = registry.definitions();
    let mut round = 0;

    loop {
        round += 1;
        if round > max_rounds {
            warn!("[engine] Max tool rounds ({}) reached, stopping", max_rounds);
            return Err(AgentError::LoopExhausted { rounds: max_rounds });
        }

        info!("[engine] Agent round {}/{}", round, max_rounds);

        // ── 1. Call the model ─────────────────────────────────────────
        let turn = provider.converse(messages, &tools).await?;

        match turn {
            // ── 2a. Final answer: record it and stop ──────────────────
            ModelTurn::Answer(text) => {
                messages.push(Message::assistant(text.clone(), None));
                return Ok(text);
            }

            // ── 2b. Tool calls: execute sequentially, feed results back ─
            ModelTurn::ToolCalls { text, calls } => {
                messages.push(Message::assistant(text, Some(calls.clone())));

                // One outstanding invocation at a time; each result is in the
                // history before the next model call.
                for tc in &calls {
                    info!("[engine] Tool call: {} id={}", tc.function.name, tc.id);

                    match registry
                        .invoke(session, &tc.function.name, &tc.function.arguments)
                        .await
                    {
                        Ok(output) => {
                            info!(
                                "[engine] Tool result: {} output_len={}",
                                tc.function.name,
                                output.len()
                            );
                            messages.push(Message::tool_result(tc, output));
                        }
                        Err(e @ AgentError::ToolProvider { .. }) => {
                            // Operational failure — contextual feedback, the
                            // model may retry with different arguments.
                            warn!("[engine] Tool failed: {}", e);
                            messages.push(Message::tool_result(tc, format!("Tool call failed: {}", e)));
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
