// ── Octoscout Engine: Result formatter ─────────────────────────────────────
// Pure mapping from AgentTurnResult to the display string. No I/O.

use crate::atoms::types::AgentTurnResult;

/// Render an outcome for display. Answers are already markdown and pass
/// through verbatim; failures render as an error marker plus a fenced
/// diagnostic block.
pub fn render(result: &AgentTurnResult) -> String {
    match result {
        AgentTurnResult::Answer(text) => text.clone(),
        AgentTurnResult::Failure(err) => {
            format!("❌ **{}**\n\n```\n{}\n```", err.kind(), err)
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::error::AgentError;

    #[test]
    fn test_answer_passes_through_verbatim() {
        let result = AgentTurnResult::Answer("| issues |\n|---|\n| 3 |".into());
        assert_eq!(render(&result), "| issues |\n|---|\n| 3 |");
    }

    #[test]
    fn test_failure_renders_fenced_block() {
        let result = AgentTurnResult::Failure(AgentError::CredentialMissing);
        let out = render(&result);
        assert!(out.starts_with("❌ **Credential Missing**"));
        assert!(out.contains("```\nGitHub token not provided\n```"));
    }

    #[test]
    fn test_failure_includes_detail() {
        let result =
            AgentTurnResult::Failure(AgentError::Handshake("initialize failed: boom".into()));
        let out = render(&result);
        assert!(out.contains("Handshake Failure"));
        assert!(out.contains("boom"));
    }
}
