use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::platform::types::*;
use crate::platform::Platform;

/// Deterministic in-memory `Platform`.
///
/// Seeded with repositories and (optionally) already-open pull requests, it
/// records every mutation so tests can assert on exactly what a run did to
/// the remote host. Selected by dependency injection in place of
/// `GitHubPlatform`; no network access ever happens through it.
#[derive(Default)]
pub struct MockPlatform {
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    repos: Vec<RemoteRepo>,
    open_prs: Vec<(String, PullRequest)>,
    created_prs: Vec<(String, PullRequest)>,
    reviewer_requests: Vec<(String, u64, Vec<String>)>,
    assignee_requests: Vec<(String, u64, Vec<String>)>,
    fail_create_pr: Option<String>,
    fail_follow_ups: bool,
    next_pr_number: u64,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_repo(&self, repo: RemoteRepo) {
        self.state.lock().unwrap().repos.push(repo);
    }

    /// Seed a pull request that is already open on the remote host.
    pub fn seed_open_pr(&self, repo_full_name: &str, pr: PullRequest) {
        self.state
            .lock()
            .unwrap()
            .open_prs
            .push((repo_full_name.to_string(), pr));
    }

    /// Make every subsequent PR creation fail with the given message.
    pub fn fail_pull_request_creation(&self, message: &str) {
        self.state.lock().unwrap().fail_create_pr = Some(message.to_string());
    }

    /// Make reviewer and assignee follow-up requests fail.
    pub fn fail_follow_ups(&self) {
        self.state.lock().unwrap().fail_follow_ups = true;
    }

    pub fn created_pull_requests(&self) -> Vec<(String, PullRequest)> {
        self.state.lock().unwrap().created_prs.clone()
    }

    pub fn reviewer_requests(&self) -> Vec<(String, u64, Vec<String>)> {
        self.state.lock().unwrap().reviewer_requests.clone()
    }

    pub fn assignee_requests(&self) -> Vec<(String, u64, Vec<String>)> {
        self.state.lock().unwrap().assignee_requests.clone()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn get_repo(&self, repo_full_name: &str) -> Result<RemoteRepo> {
        let state = self.state.lock().unwrap();
        state
            .repos
            .iter()
            .find(|r| r.full_name() == repo_full_name)
            .cloned()
            .ok_or_else(|| AppError::GitHubApi(format!("Unknown repository: {repo_full_name}")))
    }

    async fn list_org_repos(&self, org: &str) -> Result<Vec<RemoteRepo>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .repos
            .iter()
            .filter(|r| r.owner == org)
            .cloned()
            .collect())
    }

    async fn create_pull_request(
        &self,
        repo_full_name: &str,
        pr: &CreatePullRequest,
    ) -> Result<PullRequest> {
        let mut state = self.state.lock().unwrap();

        if let Some(msg) = &state.fail_create_pr {
            return Err(AppError::PullRequest(msg.clone()));
        }

        state.next_pr_number += 1;
        let number = state.next_pr_number;
        let created = PullRequest {
            number,
            title: pr.title.clone(),
            head_branch: pr.head_branch.clone(),
            base_branch: pr.base_branch.clone(),
            url: Some(format!(
                "https://github.com/{repo_full_name}/pull/{number}"
            )),
        };

        state
            .created_prs
            .push((repo_full_name.to_string(), created.clone()));
        state
            .open_prs
            .push((repo_full_name.to_string(), created.clone()));

        Ok(created)
    }

    async fn list_pull_requests(
        &self,
        repo_full_name: &str,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<Vec<PullRequest>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .open_prs
            .iter()
            .filter(|(name, pr)| {
                name == repo_full_name
                    && pr.head_branch == head_branch
                    && pr.base_branch == base_branch
            })
            .map(|(_, pr)| pr.clone())
            .collect())
    }

    async fn request_reviewers(
        &self,
        repo_full_name: &str,
        pr_number: u64,
        reviewers: &[String],
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_follow_ups {
            return Err(AppError::ReviewerRequest(
                "reviewer request rejected".to_string(),
            ));
        }
        state.reviewer_requests.push((
            repo_full_name.to_string(),
            pr_number,
            reviewers.to_vec(),
        ));
        Ok(())
    }

    async fn add_assignees(
        &self,
        repo_full_name: &str,
        pr_number: u64,
        assignees: &[String],
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.fail_follow_ups {
            return Err(AppError::ReviewerRequest(
                "assignee request rejected".to_string(),
            ));
        }
        state.assignee_requests.push((
            repo_full_name.to_string(),
            pr_number,
            assignees.to_vec(),
        ));
        Ok(())
    }
}
