// ── Octoscout Engine ───────────────────────────────────────────────────────
// The query-execution pipeline: launch the tool server, establish an MCP
// session, discover tools, drive the model⇄tool loop, format the outcome.

pub mod agent_loop;
pub mod format;
pub mod http;
pub mod launcher;
pub mod mcp;
pub mod orchestrator;
pub mod providers;
pub mod registry;
pub mod types;

pub use launcher::{Platform, ServerLaunchSpec, StdioSessionFactory};
pub use orchestrator::{Orchestrator, DEFAULT_MAX_ROUNDS};
pub use providers::GoogleProvider;
pub use registry::ToolRegistry;
