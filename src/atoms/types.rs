// ── Octoscout Atoms: Core value types ──────────────────────────────────────
// The boundary inputs (credentials, query) and the unified outcome type.

use serde::{Deserialize, Serialize};

use super::error::AgentError;

// ── Credentials ────────────────────────────────────────────────────────────

/// The GitHub access token required before any external call.
/// Absence is a precondition failure, not a transport failure.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    github_token: String,
}

impl Credentials {
    pub fn new(github_token: impl Into<String>) -> Self {
        Credentials { github_token: github_token.into() }
    }

    /// True when no usable token was supplied.
    pub fn is_missing(&self) -> bool {
        self.github_token.trim().is_empty()
    }

    pub fn github_token(&self) -> &str {
        &self.github_token
    }
}

// ── Query ──────────────────────────────────────────────────────────────────

/// Raw user text plus an optional `owner/repo` qualifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    #[serde(default)]
    pub repo: Option<String>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Query { text: text.into(), repo: None }
    }

    pub fn with_repo(mut self, repo: impl Into<String>) -> Self {
        let repo = repo.into();
        self.repo = if repo.trim().is_empty() { None } else { Some(repo) };
        self
    }

    /// True for empty or whitespace-only query text. The upstream layer must
    /// reject these before the orchestrator is ever constructed.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Combine text and repo qualifier into the prompt submitted to the model.
    /// If the qualifier is non-empty and not already present in the text, the
    /// result is `"{text} in {repo}"`; otherwise the text is unchanged.
    pub fn compose(&self) -> String {
        match &self.repo {
            Some(repo) if !repo.trim().is_empty() && !self.text.contains(repo.as_str()) => {
                format!("{} in {}", self.text, repo)
            }
            _ => self.text.clone(),
        }
    }
}

// ── AgentTurnResult ────────────────────────────────────────────────────────

/// The orchestrator's unified outcome for one query: either a final answer
/// (markdown text) or a classified error with diagnostic detail.
#[derive(Debug)]
pub enum AgentTurnResult {
    Answer(String),
    Failure(AgentError),
}

impl AgentTurnResult {
    pub fn is_answer(&self) -> bool {
        matches!(self, AgentTurnResult::Answer(_))
    }
}

impl From<AgentError> for AgentTurnResult {
    fn from(e: AgentError) -> Self {
        AgentTurnResult::Failure(e)
    }
}

impl From<Result<String, AgentError>> for AgentTurnResult {
    fn from(r: Result<String, AgentError>) -> Self {
        match r {
            Ok(text) => AgentTurnResult::Answer(text),
            Err(e) => AgentTurnResult::Failure(e),
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_missing() {
        assert!(Credentials::default().is_missing());
        assert!(Credentials::new("   ").is_missing());
        assert!(!Credentials::new("ghp_abc").is_missing());
    }

    #[test]
    fn test_compose_appends_repo() {
        let q = Query::new("What issues are open?").with_repo("octo/repo");
        assert_eq!(q.compose(), "What issues are open? in octo/repo");
    }

    #[test]
    fn test_compose_repo_already_present() {
        let q = Query::new("What issues are open in octo/repo?").with_repo("octo/repo");
        assert_eq!(q.compose(), "What issues are open in octo/repo?");
    }

    #[test]
    fn test_compose_no_repo() {
        let q = Query::new("Show repository health metrics");
        assert_eq!(q.compose(), "Show repository health metrics");
    }

    #[test]
    fn test_blank_repo_is_dropped() {
        let q = Query::new("anything").with_repo("  ");
        assert!(q.repo.is_none());
        assert_eq!(q.compose(), "anything");
    }

    #[test]
    fn test_is_blank() {
        assert!(Query::new("   \n\t").is_blank());
        assert!(!Query::new("hi").is_blank());
    }

    #[test]
    fn test_turn_result_conversions() {
        let ok: AgentTurnResult = Ok::<_, AgentError>("3 open issues".to_string()).into();
        assert!(ok.is_answer());
        let err: AgentTurnResult = AgentError::CredentialMissing.into();
        assert!(!err.is_answer());
    }
}
