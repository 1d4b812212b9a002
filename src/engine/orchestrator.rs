// ── Octoscout Engine: Orchestrator ─────────────────────────────────────────
// One query in, one AgentTurnResult out. Owns the session lifetime: the tool
// server is started and terminated inside a single call to `run`, on every
// exit path. No state survives between calls.

use log::{error, info};

use crate::atoms::error::{AgentError, AgentResult};
use crate::atoms::traits::{ModelProvider, SessionFactory, ToolSession};
use crate::atoms::types::{AgentTurnResult, Credentials, Query};
use crate::engine::agent_loop::run_agent_turn;
use crate::engine::registry::ToolRegistry;
use crate::engine::types::Message;

/// Default ceiling on model⇄tool rounds per query.
pub const DEFAULT_MAX_ROUNDS: u32 = 10;

/// Fixed role instruction, submitted with every query.
const SYSTEM_INSTRUCTION: &str = "\
You are a GitHub assistant. Help users explore repositories and their activity.

- Provide organized, concise insights
- Focus on facts from the GitHub API
- Use Markdown formatting
- Present numerical data in tables
- Include links to relevant GitHub pages";

pub struct Orchestrator {
    credentials: Credentials,
    provider: Box<dyn ModelProvider>,
    factory: Box<dyn SessionFactory>,
    max_rounds: u32,
}

impl Orchestrator {
    pub fn new(
        credentials: Credentials,
        provider: Box<dyn ModelProvider>,
        factory: Box<dyn SessionFactory>,
    ) -> Self {
        Orchestrator { credentials, provider, factory, max_rounds: DEFAULT_MAX_ROUNDS }
    }

    /// Override the round ceiling. Must be at least 1.
    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    /// Execute one request-to-answer cycle. Every failure class comes back as
    /// an `AgentTurnResult::Failure` — nothing propagates to the caller as a
    /// raw error, and the session is torn down regardless of outcome.
    pub async fn run(&self, query: &Query) -> AgentTurnResult {
        // Precondition: credentials present. Fail fast, no process launch.
        if self.credentials.is_missing() {
            return AgentError::CredentialMissing.into();
        }

        let prompt = query.compose();
        info!("[engine] Running query ({} chars)", prompt.len());

        // Scoped acquisition: launch + handshake + discovery
        let session = match self.factory.open().await {
            Ok(s) => s,
            Err(e) => {
                error!("[engine] Session open failed: {}", e);
                return e.into();
            }
        };

        let outcome = self.drive(session.as_ref(), &prompt).await;

        // Teardown on every path — the child process must not leak
        session.shutdown().await;

        if let Err(ref e) = outcome {
            error!("[engine] Query failed: {}", e);
        }
        outcome.into()
    }

    async fn drive(&self, session: &dyn ToolSession, prompt: &str) -> AgentResult<String> {
        let registry = ToolRegistry::discover(session);

        let mut messages = vec![Message::system(SYSTEM_INSTRUCTION), Message::user(prompt)];

        run_agent_turn(
            self.provider.as_ref(),
            session,
            &registry,
            &mut messages,
            self.max_rounds,
        )
        .await
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
// Full pipeline scenarios (credential fail-fast, session close counting,
// end-to-end tool flow) live in tests/integration.rs with shared stubs.
