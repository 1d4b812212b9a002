// ── Octoscout Atoms: Trait seams ───────────────────────────────────────────
// Narrow interfaces between the orchestrator and its two external
// collaborators (model service, tool-provider session) so the loop logic is
// testable with stubs and independent of any vendor library.

use async_trait::async_trait;
use thiserror::Error;

use crate::atoms::error::{AgentError, AgentResult};
use crate::engine::mcp::types::ToolDescriptor;
use crate::engine::types::{Message, ModelTurn, ToolDefinition};

// ── Model provider ─────────────────────────────────────────────────────────

/// A language-model backend: submit conversation + tool declarations, receive
/// either a final text answer or tool-call requests.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// One model call. Implementations handle their own transport retries;
    /// errors returned here are terminal for the query.
    async fn converse(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelTurn, ProviderError>;
}

/// Classified model-transport failures. Collapsed into
/// `AgentError::Model` at the orchestrator boundary — the distinctions only
/// drive retry behavior inside a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Connection / request-level failure before an HTTP status was received.
    #[error("transport: {0}")]
    Transport(String),

    /// Authentication or authorization rejection. Never retried.
    #[error("auth: {0}")]
    Auth(String),

    /// Rate limited after retries were exhausted.
    #[error("rate limited: {message}")]
    RateLimited { message: String, retry_after_secs: Option<u64> },

    /// Any other non-success API status.
    #[error("api error {status}: {message}")]
    Api { status: u16, message: String },

    /// The response arrived but could not be interpreted (blocked, empty,
    /// malformed).
    #[error("response: {0}")]
    Response(String),
}

impl From<ProviderError> for AgentError {
    fn from(e: ProviderError) -> Self {
        AgentError::Model(e.to_string())
    }
}

// ── Tool session ───────────────────────────────────────────────────────────

/// An established session with a tool-provider process. Handshake is complete
/// by the time a value of this type exists; descriptors are immutable for the
/// session's lifetime.
#[async_trait]
pub trait ToolSession: Send + Sync {
    /// Tools discovered during session establishment. May be empty.
    fn descriptors(&self) -> &[ToolDescriptor];

    /// Invoke one tool and return its text payload. Provider-reported
    /// failures come back as `AgentError::ToolProvider`.
    async fn call_tool(&self, name: &str, arguments: serde_json::Value) -> AgentResult<String>;

    /// Tear the session down and terminate the child process.
    /// Idempotent — safe to call after partial failure or a prior shutdown.
    async fn shutdown(&self);
}

// ── Session factory ────────────────────────────────────────────────────────

/// Opens a fresh session per query. The orchestrator must not call this when
/// credentials are absent (fail fast, no resource acquisition).
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> AgentResult<Box<dyn ToolSession>>;
}

// ── Tests ──────────────────────────────────────────────────────────────────
