// ── Octoscout Atoms ────────────────────────────────────────────────────────
// Leaf types with no dependencies on the engine's control flow: the error
// taxonomy, boundary value types, and the trait seams stubs implement in
// tests.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{AgentError, AgentResult};
pub use types::{AgentTurnResult, Credentials, Query};
