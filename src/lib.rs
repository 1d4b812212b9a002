// Octoscout — ask natural-language questions about GitHub repositories.
//
// Each query launches the GitHub MCP server as a child process, establishes
// a stdio session, hands the discovered tools to a Gemini-driven agent loop,
// and returns one aggregated markdown answer. One session per query, torn
// down on every exit path.

pub mod atoms;
pub mod engine;

pub use atoms::{AgentError, AgentResult, AgentTurnResult, Credentials, Query};
pub use engine::format::render;
pub use engine::{GoogleProvider, Orchestrator, Platform, ServerLaunchSpec, StdioSessionFactory};
