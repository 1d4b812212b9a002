// ── Octoscout Engine: MCP client ───────────────────────────────────────────
// Stdio client for the Model Context Protocol, sized for one server and one
// session per query:
//   types.rs     — JSON-RPC frames + MCP message payloads
//   transport.rs — child process spawning + newline-delimited framing
//   client.rs    — initialize handshake, tools/list, tools/call

pub mod client;
pub mod transport;
pub mod types;

pub use client::McpSession;
pub use types::ToolDescriptor;
