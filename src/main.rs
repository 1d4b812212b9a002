// Octoscout CLI — the presentation boundary over the query pipeline.
// Collects the query, repository qualifier, and credentials, then prints the
// rendered result. Empty queries are rejected here, before any orchestrator
// (and therefore any child process) exists.

use clap::{Parser, ValueEnum};

use octoscout::engine::types::ProviderConfig;
use octoscout::{
    render, Credentials, GoogleProvider, Orchestrator, Platform, Query, ServerLaunchSpec,
    StdioSessionFactory,
};

#[derive(Parser)]
#[command(
    name = "octoscout",
    version,
    about = "Explore GitHub repositories with natural language via the GitHub MCP server"
)]
struct Cli {
    /// Natural-language question about a repository
    query: Option<String>,

    /// Repository qualifier, e.g. octo/repo. Appended to the query when not
    /// already mentioned in it.
    #[arg(short, long)]
    repo: Option<String>,

    /// Prefill the query from a template (requires --repo)
    #[arg(short, long, value_enum, requires = "repo")]
    template: Option<Template>,

    /// GitHub token with repo scope (create one at github.com/settings/tokens)
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    gemini_api_key: String,

    /// Gemini model id
    #[arg(long, default_value = "gemini-2.5-flash")]
    model: String,

    /// Ceiling on model/tool rounds per query
    #[arg(long, default_value_t = octoscout::engine::DEFAULT_MAX_ROUNDS)]
    max_rounds: u32,
}

/// Example-query templates, mirroring the common things people ask first.
#[derive(Debug, Clone, Copy, ValueEnum)]
enum Template {
    /// Find issues labeled as bugs
    Issues,
    /// Show pull requests that need review
    Pulls,
    /// Show recent activity trends
    Activity,
}

impl Template {
    fn render(self, repo: &str) -> String {
        match self {
            Template::Issues => format!("Find issues labeled as bugs in {}", repo),
            Template::Pulls => format!("Show pull requests that need review in {}", repo),
            Template::Activity => format!("Show recent activity trends in {}", repo),
        }
    }
}

fn build_query(cli: &Cli) -> Option<Query> {
    let text = match (&cli.query, cli.template) {
        (Some(text), _) => text.clone(),
        (None, Some(template)) => template.render(cli.repo.as_deref().unwrap_or_default()),
        (None, None) => return None,
    };

    let query = Query::new(text);
    let query = match &cli.repo {
        Some(repo) => query.with_repo(repo.clone()),
        None => query,
    };

    if query.is_blank() {
        None
    } else {
        Some(query)
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    // Empty or whitespace-only query: rejected upstream, no process launch
    let Some(query) = build_query(&cli) else {
        eprintln!("error: please provide a query (or --template with --repo)");
        std::process::exit(2);
    };

    let credentials = Credentials::new(cli.github_token.clone().unwrap_or_default());
    let provider = GoogleProvider::new(&ProviderConfig::new(&cli.gemini_api_key, &cli.model));
    let launch = ServerLaunchSpec::github(Platform::current(), credentials.github_token());
    let factory = StdioSessionFactory::new(launch);

    let orchestrator = Orchestrator::new(credentials, Box::new(provider), Box::new(factory))
        .with_max_rounds(cli.max_rounds);

    let result = orchestrator.run(&query).await;
    println!("{}", render(&result));

    if !result.is_answer() {
        std::process::exit(1);
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(
            std::iter::once("octoscout").chain(args.iter().copied()).map(String::from),
        )
        .unwrap()
    }

    #[test]
    fn test_blank_query_rejected_upstream() {
        let c = cli(&["   ", "--gemini-api-key", "k"]);
        assert!(build_query(&c).is_none());
    }

    #[test]
    fn test_no_query_no_template_rejected() {
        let c = cli(&["--gemini-api-key", "k"]);
        assert!(build_query(&c).is_none());
    }

    #[test]
    fn test_template_renders_with_repo() {
        let c = cli(&["--template", "issues", "--repo", "octo/repo", "--gemini-api-key", "k"]);
        let q = build_query(&c).unwrap();
        assert_eq!(q.text, "Find issues labeled as bugs in octo/repo");
        // Repo already present in the text, so composition leaves it alone
        assert_eq!(q.compose(), q.text);
    }

    #[test]
    fn test_free_text_query_with_repo() {
        let c = cli(&["What issues are open?", "--repo", "octo/repo", "--gemini-api-key", "k"]);
        let q = build_query(&c).unwrap();
        assert_eq!(q.compose(), "What issues are open? in octo/repo");
    }

    #[test]
    fn test_template_requires_repo() {
        let err = Cli::try_parse_from(["octoscout", "--template", "pulls", "--gemini-api-key", "k"]);
        assert!(err.is_err());
    }
}
