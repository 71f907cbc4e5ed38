use async_trait::async_trait;
use octocrab::params;
use octocrab::Octocrab;

use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::Platform;

use super::auth::HostCredentials;
use super::mapper;

/// Production `Platform` backed by the GitHub REST API.
pub struct GitHubPlatform {
    client: Octocrab,
}

impl GitHubPlatform {
    pub fn new(creds: &HostCredentials) -> Result<Self> {
        Ok(Self {
            client: super::auth::build_client(creds)?,
        })
    }

    fn parse_repo(repo_full_name: &str) -> Result<(&str, &str)> {
        let parts: Vec<&str> = repo_full_name.splitn(2, '/').collect();
        if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
            return Err(AppError::GitHubApi(format!(
                "Invalid repo name: {repo_full_name}"
            )));
        }
        Ok((parts[0], parts[1]))
    }
}

#[async_trait]
impl Platform for GitHubPlatform {
    async fn get_repo(&self, repo_full_name: &str) -> Result<RemoteRepo> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        let fetched = self.client.repos(owner, repo).get().await?;

        mapper::map_repository(fetched)
    }

    async fn list_org_repos(&self, org: &str) -> Result<Vec<RemoteRepo>> {
        let mut page = self
            .client
            .orgs(org)
            .list_repos()
            .per_page(100)
            .send()
            .await?;

        let mut repos = Vec::new();
        loop {
            for repo in std::mem::take(&mut page.items) {
                repos.push(mapper::map_repository(repo)?);
            }
            match self
                .client
                .get_page::<octocrab::models::Repository>(&page.next)
                .await?
            {
                Some(next) => page = next,
                None => break,
            }
        }

        Ok(repos)
    }

    async fn create_pull_request(
        &self,
        repo_full_name: &str,
        pr: &CreatePullRequest,
    ) -> Result<PullRequest> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        let created = self
            .client
            .pulls(owner, repo)
            .create(&pr.title, &pr.head_branch, &pr.base_branch)
            .body(&pr.body)
            .draft(pr.draft)
            .send()
            .await
            .map_err(|e| AppError::PullRequest(e.to_string()))?;

        Ok(mapper::map_pull_request(created))
    }

    async fn list_pull_requests(
        &self,
        repo_full_name: &str,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<Vec<PullRequest>> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        // GitHub's head filter requires the `user:ref` form.
        let page = self
            .client
            .pulls(owner, repo)
            .list()
            .state(params::State::Open)
            .head(format!("{owner}:{head_branch}"))
            .base(base_branch)
            .per_page(100)
            .send()
            .await?;

        Ok(page.items.into_iter().map(mapper::map_pull_request).collect())
    }

    async fn request_reviewers(
        &self,
        repo_full_name: &str,
        pr_number: u64,
        reviewers: &[String],
    ) -> Result<()> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        // octocrab has no typed endpoint for this, use the API directly
        let url = format!("/repos/{owner}/{repo}/pulls/{pr_number}/requested_reviewers");
        let body = serde_json::json!({ "reviewers": reviewers });
        let _: serde_json::Value = self
            .client
            .post(&url, Some(&body))
            .await
            .map_err(|e| AppError::ReviewerRequest(e.to_string()))?;

        Ok(())
    }

    async fn add_assignees(
        &self,
        repo_full_name: &str,
        pr_number: u64,
        assignees: &[String],
    ) -> Result<()> {
        let (owner, repo) = Self::parse_repo(repo_full_name)?;

        let refs: Vec<&str> = assignees.iter().map(String::as_str).collect();
        self.client
            .issues(owner, repo)
            .add_assignees(pr_number, &refs)
            .await
            .map_err(|e| AppError::ReviewerRequest(e.to_string()))?;

        Ok(())
    }
}
