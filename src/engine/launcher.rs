// ── Octoscout Engine: Tool-server launcher ─────────────────────────────────
// Builds the platform-appropriate command line for the GitHub MCP server and
// opens sessions against it. On Windows, npx is a script rather than a native
// executable, so the invocation goes through cmd.exe.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::atoms::error::AgentResult;
use crate::atoms::traits::{SessionFactory, ToolSession};

use super::mcp::McpSession;

/// The npm package exposing GitHub repository operations over MCP.
const GITHUB_SERVER_PACKAGE: &str = "@modelcontextprotocol/server-github";

// ── Platform ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Posix,
    Windows,
}

impl Platform {
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }
}

// ── ServerLaunchSpec ───────────────────────────────────────────────────────

/// Command, argument list, and child environment used to start the
/// tool-provider process. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ServerLaunchSpec {
    command: String,
    args: Vec<String>,
    env: HashMap<String, String>,
}

impl ServerLaunchSpec {
    /// Launch spec for the GitHub MCP server on the given platform.
    /// The access token rides in the child environment; the server, not us,
    /// validates it.
    pub fn github(platform: Platform, token: &str) -> Self {
        let (command, args) = match platform {
            Platform::Posix => (
                "npx".to_string(),
                vec!["-y".to_string(), GITHUB_SERVER_PACKAGE.to_string()],
            ),
            Platform::Windows => (
                "cmd.exe".to_string(),
                vec![
                    "/c".to_string(),
                    "npx".to_string(),
                    "-y".to_string(),
                    GITHUB_SERVER_PACKAGE.to_string(),
                ],
            ),
        };

        let mut env = HashMap::new();
        // Current server releases read GITHUB_PERSONAL_ACCESS_TOKEN; older
        // ones read GITHUB_TOKEN. Set both.
        env.insert("GITHUB_TOKEN".to_string(), token.to_string());
        env.insert("GITHUB_PERSONAL_ACCESS_TOKEN".to_string(), token.to_string());

        ServerLaunchSpec { command, args, env }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }
}

// ── Session factory ────────────────────────────────────────────────────────

/// Opens one `McpSession` per query against the configured launch spec.
pub struct StdioSessionFactory {
    spec: ServerLaunchSpec,
}

impl StdioSessionFactory {
    pub fn new(spec: ServerLaunchSpec) -> Self {
        StdioSessionFactory { spec }
    }
}

#[async_trait]
impl SessionFactory for StdioSessionFactory {
    async fn open(&self) -> AgentResult<Box<dyn ToolSession>> {
        let session = McpSession::connect(&self.spec).await?;
        Ok(Box::new(session))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_posix_spec_runs_npx_directly() {
        let spec = ServerLaunchSpec::github(Platform::Posix, "ghp_test");
        assert_eq!(spec.command(), "npx");
        assert_eq!(spec.args(), ["-y", GITHUB_SERVER_PACKAGE]);
    }

    #[test]
    fn test_windows_spec_goes_through_cmd() {
        let spec = ServerLaunchSpec::github(Platform::Windows, "ghp_test");
        assert_eq!(spec.command(), "cmd.exe");
        assert_eq!(spec.args()[0], "/c");
        assert_eq!(spec.args()[1], "npx");
        assert_eq!(spec.args().last().unwrap(), GITHUB_SERVER_PACKAGE);
    }

    #[test]
    fn test_token_lands_in_child_env() {
        let spec = ServerLaunchSpec::github(Platform::Posix, "ghp_secret");
        assert_eq!(spec.env().get("GITHUB_TOKEN").map(String::as_str), Some("ghp_secret"));
        assert_eq!(
            spec.env().get("GITHUB_PERSONAL_ACCESS_TOKEN").map(String::as_str),
            Some("ghp_secret")
        );
    }
}
