// ── Octoscout Atoms: Error Types ───────────────────────────────────────────
// Single canonical error enum for the query pipeline, built with `thiserror`.
//
// Design rules:
//   • One variant per failure class the orchestrator can report — nothing
//     internal leaks past `Orchestrator::run` unconverted.
//   • `Launch` is distinct from `Handshake`: a process that never started is
//     not a protocol failure.
//   • `ToolContract` aborts the agent loop; `ToolProvider` is fed back to the
//     model as a tool result so it can try differently.
//   • No variant carries secret material (tokens, API keys) in its message.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum AgentError {
    /// No GitHub token was supplied. Checked before any resource acquisition.
    #[error("GitHub token not provided")]
    CredentialMissing,

    /// The tool-provider process could not be started (binary missing,
    /// spawn denied). Raised before any protocol handshake is attempted.
    #[error("failed to launch tool server: {0}")]
    Launch(String),

    /// The process started but the MCP session could not be established
    /// (initialize or initial tools/list failed).
    #[error("MCP handshake failed: {0}")]
    Handshake(String),

    /// Unknown tool name or malformed arguments — a programming error in the
    /// model/registry contract, never retried.
    #[error("tool contract violation: {tool}: {message}")]
    ToolContract { tool: String, message: String },

    /// The tool provider executed but reported an operational failure
    /// (error payload, timeout, dead transport).
    #[error("tool provider failure: {tool}: {message}")]
    ToolProvider { tool: String, message: String },

    /// The language-model call itself failed or timed out.
    #[error("model service failure: {0}")]
    Model(String),

    /// The tool-calling loop hit its round ceiling without a final answer.
    #[error("agent loop exhausted after {rounds} rounds without a final answer")]
    LoopExhausted { rounds: u32 },
}

// ── Convenience constructors ───────────────────────────────────────────────

impl AgentError {
    /// Create a tool contract violation with tool name and message.
    pub fn contract(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolContract { tool: tool.into(), message: message.into() }
    }

    /// Create a tool provider failure with tool name and message.
    pub fn provider(tool: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolProvider { tool: tool.into(), message: message.into() }
    }

    /// Short classification label, used by the result formatter.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::CredentialMissing => "Credential Missing",
            AgentError::Launch(_) => "Process Launch Failure",
            AgentError::Handshake(_) => "Handshake Failure",
            AgentError::ToolContract { .. } => "Tool Contract Violation",
            AgentError::ToolProvider { .. } => "Tool Provider Failure",
            AgentError::Model(_) => "Model Service Failure",
            AgentError::LoopExhausted { .. } => "Loop Exhausted",
        }
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All pipeline operations return this type.
pub type AgentResult<T> = Result<T, AgentError>;

// ── Conversion: AgentError → String ────────────────────────────────────────
// Lets boundary code call `.map_err(AgentError::into)` directly.

impl From<AgentError> for String {
    fn from(e: AgentError) -> Self {
        e.to_string()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────
