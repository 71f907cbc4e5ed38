pub mod github;
pub mod mock;
pub mod types;

use async_trait::async_trait;

use crate::error::Result;
use types::*;

/// Remote host capability.
///
/// The production implementation talks to the GitHub API; the mock
/// implementation is deterministic and in-memory. Pipelines only ever see
/// this trait, which is what makes them testable without network access.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Fetch a single repository by `owner/name`.
    async fn get_repo(&self, repo_full_name: &str) -> Result<RemoteRepo>;

    /// List every repository of an organization, following pagination.
    async fn list_org_repos(&self, org: &str) -> Result<Vec<RemoteRepo>>;

    /// Create a pull request.
    async fn create_pull_request(
        &self,
        repo_full_name: &str,
        pr: &CreatePullRequest,
    ) -> Result<PullRequest>;

    /// List open pull requests from `head_branch` against `base_branch`.
    async fn list_pull_requests(
        &self,
        repo_full_name: &str,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<Vec<PullRequest>>;

    /// Request reviews from the given users on a pull request.
    async fn request_reviewers(
        &self,
        repo_full_name: &str,
        pr_number: u64,
        reviewers: &[String],
    ) -> Result<()>;

    /// Assign the given users to a pull request.
    async fn add_assignees(
        &self,
        repo_full_name: &str,
        pr_number: u64,
        assignees: &[String],
    ) -> Result<()>;
}
