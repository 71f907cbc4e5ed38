use std::collections::HashSet;

use tokio::io::AsyncReadExt;

use crate::config::RunConfig;
use crate::error::{AppError, Result};
use crate::platform::types::RemoteRepo;
use crate::platform::Platform;

/// Resolve the run's repository set from the configured selection inputs.
///
/// Explicit slugs (flags, file, stdin) win over organization listing; both
/// at once would make the run's scope ambiguous. Archived repositories are
/// dropped when the run says so.
pub async fn select_repos(cfg: &RunConfig, platform: &dyn Platform) -> Result<Vec<RemoteRepo>> {
    let mut slugs: Vec<String> = cfg.repo_slugs.clone();

    if let Some(path) = &cfg.repos_file {
        let contents = tokio::fs::read_to_string(path).await?;
        slugs.extend(parse_slug_lines(&contents));
    }

    if cfg.repos_from_stdin {
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        slugs.extend(parse_slug_lines(&buf));
    }

    let mut repos = if !slugs.is_empty() {
        let mut seen = HashSet::new();
        let mut repos = Vec::new();
        for slug in slugs {
            validate_slug(&slug)?;
            if !seen.insert(slug.clone()) {
                continue;
            }
            repos.push(platform.get_repo(&slug).await?);
        }
        repos
    } else if let Some(org) = &cfg.github_org {
        platform.list_org_repos(org).await?
    } else {
        return Err(AppError::Config(
            "no repositories selected; use --repo, --repos-file, --stdin, or --github-org"
                .to_string(),
        ));
    };

    if cfg.skip_archived_repos {
        let before = repos.len();
        repos.retain(|r| !r.archived);
        let skipped = before - repos.len();
        if skipped > 0 {
            tracing::info!(skipped = skipped, "Skipped archived repositories");
        }
    }

    tracing::info!(repos = repos.len(), "Selected repositories");
    Ok(repos)
}

fn parse_slug_lines(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

fn validate_slug(slug: &str) -> Result<()> {
    let parts: Vec<&str> = slug.splitn(2, '/').collect();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return Err(AppError::Config(format!(
            "malformed repository slug (expected owner/name): {slug}"
        )));
    }
    Ok(())
}
