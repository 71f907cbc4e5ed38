use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use git_fleet::config::{self, RunConfig, RunDefaults};
use git_fleet::orchestrator;
use git_fleet::platform::github::{auth, GitHubPlatform};
use git_fleet::platform::Platform;
use git_fleet::report;
use git_fleet::selection;
use git_fleet::tracker::RunTracker;
use git_fleet::vcs::git::Git2Backend;
use git_fleet::vcs::VcsBackend;

#[derive(Parser)]
#[command(
    name = "git-fleet",
    about = "Run a command across many GitHub repositories and open pull requests for the results"
)]
struct Cli {
    /// Path to a configuration file with run defaults
    #[arg(short, long)]
    config: Option<String>,

    /// Select a repository as an owner/name slug (repeatable)
    #[arg(long = "repo")]
    repos: Vec<String>,

    /// File of owner/name slugs, one per line
    #[arg(long)]
    repos_file: Option<PathBuf>,

    /// Read owner/name slugs from stdin
    #[arg(long)]
    stdin: bool,

    /// Select every repository of an organization
    #[arg(long)]
    github_org: Option<String>,

    /// Leave archived repositories out of the run
    #[arg(long)]
    skip_archived_repos: bool,

    /// Branch to create in every repository (generated when unset)
    #[arg(long)]
    branch_name: Option<String>,

    /// Base branch for pull requests (each repository's default branch when unset)
    #[arg(long)]
    base_branch_name: Option<String>,

    /// Commit message for the changes the command produces
    #[arg(long)]
    commit_message: Option<String>,

    /// Title for opened pull requests
    #[arg(long)]
    pull_request_title: Option<String>,

    /// Description for opened pull requests
    #[arg(long)]
    pull_request_description: Option<String>,

    /// Request reviews from these users on every opened pull request (repeatable)
    #[arg(long = "reviewer")]
    reviewers: Vec<String>,

    /// Assign these users to every opened pull request (repeatable)
    #[arg(long = "assignee")]
    assignees: Vec<String>,

    /// Open pull requests as drafts
    #[arg(long)]
    draft: bool,

    /// Commit locally but never push or open pull requests
    #[arg(long)]
    dry_run: bool,

    /// Push branches but do not open pull requests
    #[arg(long)]
    skip_pull_requests: bool,

    /// Maximum number of repositories processed at once (0 = unbounded)
    #[arg(long, default_value_t = 0)]
    max_concurrent_repos: usize,

    /// History depth for clones
    #[arg(long)]
    clone_depth: Option<u32>,

    /// Branch to clone instead of each repository's default branch
    #[arg(long)]
    clone_branch: Option<String>,

    /// Talk to a GitHub Enterprise host (GITHUB_ENTERPRISE_HOST and
    /// GITHUB_ENTERPRISE_OAUTH_TOKEN must be set)
    #[arg(long)]
    internal: bool,

    /// The command to run in every repository
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    args: Vec<String>,
}

fn build_run_config(cli: Cli, defaults: RunDefaults) -> RunConfig {
    RunConfig {
        draft: cli.draft,
        dry_run: cli.dry_run,
        skip_pull_requests: cli.skip_pull_requests,
        skip_archived_repos: cli.skip_archived_repos,
        max_concurrent_repos: cli.max_concurrent_repos,
        branch_name: cli
            .branch_name
            .or(defaults.branch_name)
            .unwrap_or_else(config::generated_branch_name),
        base_branch_name: cli.base_branch_name.or(defaults.base_branch_name),
        commit_message: cli
            .commit_message
            .or(defaults.commit_message)
            .unwrap_or_else(config::default_commit_message),
        pull_request_title: cli
            .pull_request_title
            .or(defaults.pull_request_title)
            .unwrap_or_else(config::default_pull_request_title),
        pull_request_description: cli
            .pull_request_description
            .or(defaults.pull_request_description)
            .unwrap_or_else(config::default_pull_request_description),
        reviewers: if cli.reviewers.is_empty() {
            defaults.reviewers
        } else {
            cli.reviewers
        },
        assignees: if cli.assignees.is_empty() {
            defaults.assignees
        } else {
            cli.assignees
        },
        clone_depth: cli
            .clone_depth
            .or(defaults.clone_depth)
            .unwrap_or_else(config::default_clone_depth),
        clone_branch: cli.clone_branch,
        args: cli.args,
        github_org: cli.github_org,
        repo_slugs: cli.repos,
        repos_file: cli.repos_file,
        repos_from_stdin: cli.stdin,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let defaults = RunDefaults::load(cli.config.as_deref())?;

    // A missing token halts the run before any repository is touched.
    let creds = auth::credentials_from_env(cli.internal)?;
    let platform: Arc<dyn Platform> = Arc::new(GitHubPlatform::new(&creds)?);
    let vcs: Arc<dyn VcsBackend> = Arc::new(Git2Backend::new(&creds.token));

    let cfg = Arc::new(build_run_config(cli, defaults));

    tracing::info!(
        host = %creds.host,
        branch = %cfg.branch_name,
        dry_run = cfg.dry_run,
        max_concurrent = cfg.max_concurrent_repos,
        "Starting git-fleet run"
    );

    let repos = selection::select_repos(&cfg, platform.as_ref()).await?;

    let tracker = Arc::new(RunTracker::new());
    let results = orchestrator::process_repos(
        Arc::clone(&cfg),
        platform,
        vcs,
        Arc::clone(&tracker),
        repos,
    )
    .await;

    let outcomes = tracker.drain();
    report::print_summary(&outcomes, &results);

    let failed = outcomes.values().filter(|o| o.is_failure()).count();
    if failed > 0 {
        anyhow::bail!("{failed} of {} repositories failed", outcomes.len());
    }

    Ok(())
}
