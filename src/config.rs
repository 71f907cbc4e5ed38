use serde::Deserialize;
use std::path::PathBuf;

use crate::error::{AppError, Result};

/// Options for a single run.
///
/// Built once before any repository is processed, then shared read-only by
/// every concurrent pipeline. Nothing mutates this after the run starts.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub draft: bool,
    pub dry_run: bool,
    pub skip_pull_requests: bool,
    pub skip_archived_repos: bool,
    /// Concurrency ceiling for repository pipelines. 0 means unbounded.
    pub max_concurrent_repos: usize,
    pub branch_name: String,
    /// Base branch for pull requests. Falls back to each repository's
    /// default branch when unset.
    pub base_branch_name: Option<String>,
    pub commit_message: String,
    pub pull_request_title: String,
    pub pull_request_description: String,
    pub reviewers: Vec<String>,
    pub assignees: Vec<String>,
    pub clone_depth: u32,
    /// Branch to clone instead of each repository's default branch.
    pub clone_branch: Option<String>,
    /// The operator-supplied command to run in every clone.
    pub args: Vec<String>,

    // Repository selection inputs.
    pub github_org: Option<String>,
    pub repo_slugs: Vec<String>,
    pub repos_file: Option<PathBuf>,
    pub repos_from_stdin: bool,
}

/// Run defaults loadable from an optional `git-fleet.toml` and `GIT_FLEET`
/// prefixed environment variables. CLI flags take precedence over these.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct RunDefaults {
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub base_branch_name: Option<String>,
    #[serde(default)]
    pub commit_message: Option<String>,
    #[serde(default)]
    pub pull_request_title: Option<String>,
    #[serde(default)]
    pub pull_request_description: Option<String>,
    #[serde(default)]
    pub reviewers: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub clone_depth: Option<u32>,
}

impl RunDefaults {
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(config::File::with_name(path));
        } else {
            builder = builder.add_source(config::File::with_name("git-fleet").required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("GIT_FLEET")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::Config(e.to_string()))
    }
}

pub fn default_commit_message() -> String {
    "git-fleet programmatic commit".to_string()
}

pub fn default_pull_request_title() -> String {
    "git-fleet programmatic pull request".to_string()
}

pub fn default_pull_request_description() -> String {
    "This pull request was programmatically opened by git-fleet".to_string()
}

pub fn default_clone_depth() -> u32 {
    1
}

/// Short random suffix for run-unique names (branches, clone directories).
pub fn unique_suffix() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    id[..9].to_string()
}

/// Tool-generated branch name, used when the operator does not supply one,
/// so repeated runs never collide with operator branches.
pub fn generated_branch_name() -> String {
    format!("git-fleet-{}", unique_suffix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_suffix_length_and_uniqueness() {
        let a = unique_suffix();
        let b = unique_suffix();
        assert_eq!(a.len(), 9);
        assert_ne!(a, b);
    }

    #[test]
    fn test_generated_branch_name_prefix() {
        let name = generated_branch_name();
        assert!(name.starts_with("git-fleet-"));
    }

    #[test]
    fn test_defaults_load_without_file() {
        let defaults = RunDefaults::load(None).unwrap();
        assert!(defaults.branch_name.is_none());
        assert!(defaults.reviewers.is_empty());
    }

    #[test]
    fn test_builtin_defaults() {
        assert_eq!(default_clone_depth(), 1);
        assert!(default_commit_message().contains("git-fleet"));
    }
}
