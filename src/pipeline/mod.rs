pub mod command;

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{self, RunConfig};
use crate::error::{AppError, Result};
use crate::platform::types::{CreatePullRequest, PullRequest, RemoteRepo};
use crate::platform::Platform;
use crate::tracker::{Outcome, RunTracker};
use crate::vcs::VcsBackend;

/// Exclusive ownership of one on-disk clone.
///
/// The directory is never removed automatically; it outlives the run so the
/// operator can inspect what a command actually did.
#[derive(Debug, Clone)]
pub struct LocalCheckout {
    pub path: PathBuf,
    pub head: Option<String>,
}

/// Everything one repository's pipeline produced, however far it got.
///
/// A plain aggregate of the remote reference and the local clone state.
/// Partial on failure (`checkout` stays `None` until the clone succeeds), so
/// the orchestrator can hand operators whatever exists for post-mortem.
#[derive(Debug)]
pub struct PipelineResult {
    pub repo: RemoteRepo,
    pub checkout: Option<LocalCheckout>,
    pub branch: Option<String>,
    pub pull_request: Option<PullRequest>,
}

impl PipelineResult {
    fn new(repo: RemoteRepo) -> Self {
        Self {
            repo,
            checkout: None,
            branch: None,
            pull_request: None,
        }
    }
}

/// The per-repository mutation workflow.
///
/// Holds the run configuration and the injected capability implementations;
/// one instance drives every repository in the run.
pub struct Pipeline {
    cfg: Arc<RunConfig>,
    platform: Arc<dyn Platform>,
    vcs: Arc<dyn VcsBackend>,
    tracker: Arc<RunTracker>,
}

/// Collision-free clone directory under the system temp root. The repo name
/// keeps it findable, the random suffix keeps concurrent and repeated runs
/// apart.
fn clone_dir(repo_name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("git-fleet-{repo_name}-{}", config::unique_suffix()))
}

impl Pipeline {
    pub fn new(
        cfg: Arc<RunConfig>,
        platform: Arc<dyn Platform>,
        vcs: Arc<dyn VcsBackend>,
        tracker: Arc<RunTracker>,
    ) -> Self {
        Self {
            cfg,
            platform,
            vcs,
            tracker,
        }
    }

    /// Run the full workflow for one repository.
    ///
    /// Never returns an error: every failure is folded into the tracker as
    /// that repository's Outcome, and the partial result is returned as-is.
    pub async fn process_repo(&self, repo: RemoteRepo) -> PipelineResult {
        let full_name = repo.full_name();
        let mut result = PipelineResult::new(repo);

        match self.run(&mut result).await {
            Ok(outcome) => {
                tracing::info!(
                    repo = %full_name,
                    outcome = outcome.label(),
                    "Repository processed"
                );
                self.tracker.record(&full_name, outcome);
            }
            Err(err) => {
                tracing::error!(repo = %full_name, error = %err, "Repository failed");
                self.tracker.record(&full_name, Outcome::Failed(err));
            }
        }

        result
    }

    async fn run(&self, result: &mut PipelineResult) -> Result<Outcome> {
        let cfg = &self.cfg;
        let repo = result.repo.clone();
        let full_name = repo.full_name();

        // Clone
        let workdir = clone_dir(&repo.name);
        self.vcs
            .clone_repo(
                &repo.clone_url,
                &workdir,
                cfg.clone_depth,
                cfg.clone_branch.as_deref(),
            )
            .await?;
        result.checkout = Some(LocalCheckout {
            path: workdir.clone(),
            head: None,
        });

        // Resolve HEAD
        let head = self.vcs.head_ref(&workdir).await?;
        if let Some(checkout) = result.checkout.as_mut() {
            checkout.head = Some(head);
        }

        // Obtain working tree
        self.vcs.open_worktree(&workdir).await?;

        // Branch checkout
        self.vcs.checkout_branch(&workdir, &cfg.branch_name).await?;
        result.branch = Some(cfg.branch_name.clone());

        // Command execution. On failure the worktree is left exactly as the
        // command left it, uncommitted, for post-mortem inspection.
        command::execute(&cfg.args, &workdir, &repo).await?;

        // Stage everything the command changed
        let status = self.vcs.worktree_status(&workdir).await?;
        self.vcs.stage_all(&workdir).await?;

        if status.is_clean() {
            // A command that changes nothing is a success, not an error.
            return Ok(Outcome::NoChanges);
        }
        tracing::debug!(
            repo = %full_name,
            changes = status.change_count(),
            "Staged worktree changes"
        );

        // Commit
        self.vcs.commit(&workdir, &cfg.commit_message).await?;

        if cfg.dry_run {
            return Ok(Outcome::DryRun);
        }

        // Push
        self.vcs.push(&workdir, &cfg.branch_name).await?;

        if cfg.skip_pull_requests {
            return Ok(Outcome::PullRequestSkipped);
        }

        // Open pull request, unless one already exists for this head/base
        let base_branch = cfg
            .base_branch_name
            .clone()
            .unwrap_or_else(|| repo.default_branch.clone());

        let existing = self
            .platform
            .list_pull_requests(&full_name, &cfg.branch_name, &base_branch)
            .await
            .map_err(|e| AppError::PullRequest(e.to_string()))?;
        if let Some(pr) = existing.into_iter().next() {
            result.pull_request = Some(pr);
            return Ok(Outcome::PullRequestAlreadyOpen);
        }

        let pr = self
            .platform
            .create_pull_request(
                &full_name,
                &CreatePullRequest {
                    title: cfg.pull_request_title.clone(),
                    body: cfg.pull_request_description.clone(),
                    head_branch: cfg.branch_name.clone(),
                    base_branch,
                    draft: cfg.draft,
                },
            )
            .await?;

        // Reviewer and assignee requests are best-effort follow-ups; a
        // failure here never fails an already-opened pull request.
        if !cfg.reviewers.is_empty() {
            if let Err(e) = self
                .platform
                .request_reviewers(&full_name, pr.number, &cfg.reviewers)
                .await
            {
                tracing::warn!(repo = %full_name, error = %e, "Reviewer request failed");
            }
        }
        if !cfg.assignees.is_empty() {
            if let Err(e) = self
                .platform
                .add_assignees(&full_name, pr.number, &cfg.assignees)
                .await
            {
                tracing::warn!(repo = %full_name, error = %e, "Assignee request failed");
            }
        }

        result.pull_request = Some(pr);
        Ok(Outcome::PullRequestOpened)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::MockPlatform;
    use crate::vcs::mock::{FailPoint, MockVcs};

    fn test_config(args: &[&str]) -> RunConfig {
        RunConfig {
            draft: false,
            dry_run: false,
            skip_pull_requests: false,
            skip_archived_repos: false,
            max_concurrent_repos: 0,
            branch_name: "git-fleet-test".to_string(),
            base_branch_name: None,
            commit_message: "test commit".to_string(),
            pull_request_title: "test pr".to_string(),
            pull_request_description: "test pr body".to_string(),
            reviewers: Vec::new(),
            assignees: Vec::new(),
            clone_depth: 1,
            clone_branch: None,
            args: args.iter().map(|s| s.to_string()).collect(),
            github_org: None,
            repo_slugs: Vec::new(),
            repos_file: None,
            repos_from_stdin: false,
        }
    }

    fn remote_repo(name: &str) -> RemoteRepo {
        RemoteRepo {
            owner: "acme".to_string(),
            name: name.to_string(),
            default_branch: "main".to_string(),
            archived: false,
            clone_url: format!("https://github.com/acme/{name}.git"),
        }
    }

    struct Harness {
        pipeline: Pipeline,
        platform: Arc<MockPlatform>,
        vcs: Arc<MockVcs>,
        tracker: Arc<RunTracker>,
    }

    fn harness(cfg: RunConfig) -> Harness {
        let platform = Arc::new(MockPlatform::new());
        let vcs = Arc::new(MockVcs::new());
        let tracker = Arc::new(RunTracker::new());
        let pipeline = Pipeline::new(
            Arc::new(cfg),
            Arc::clone(&platform) as Arc<dyn Platform>,
            Arc::clone(&vcs) as Arc<dyn VcsBackend>,
            Arc::clone(&tracker),
        );
        Harness {
            pipeline,
            platform,
            vcs,
            tracker,
        }
    }

    #[tokio::test]
    async fn test_end_to_end_success_opens_pull_request() {
        let h = harness(test_config(&["true"]));

        let result = h.pipeline.process_repo(remote_repo("widgets")).await;

        assert!(result.checkout.is_some());
        assert_eq!(result.branch.as_deref(), Some("git-fleet-test"));
        let pr = result.pull_request.expect("pull request should be opened");
        assert_eq!(pr.head_branch, "git-fleet-test");
        assert_eq!(pr.base_branch, "main");

        assert_eq!(h.vcs.commits().len(), 1);
        assert_eq!(h.vcs.pushes().len(), 1);
        assert_eq!(h.platform.created_pull_requests().len(), 1);

        let outcomes = h.tracker.drain();
        assert!(matches!(
            outcomes["acme/widgets"],
            Outcome::PullRequestOpened
        ));
    }

    #[tokio::test]
    async fn test_no_changes_is_a_noop_success() {
        let h = harness(test_config(&["true"]));
        h.vcs.set_staged_changes("widgets", 0);

        h.pipeline.process_repo(remote_repo("widgets")).await;

        assert!(h.vcs.commits().is_empty());
        assert!(h.vcs.pushes().is_empty());
        assert!(h.platform.created_pull_requests().is_empty());
        assert!(matches!(
            h.tracker.drain()["acme/widgets"],
            Outcome::NoChanges
        ));
    }

    #[tokio::test]
    async fn test_command_failure_halts_before_staging() {
        let h = harness(test_config(&["sh", "-c", "exit 1"]));

        let result = h.pipeline.process_repo(remote_repo("widgets")).await;

        // Clone and branch happened, nothing after the command did.
        assert!(result.checkout.is_some());
        assert!(h.vcs.stage_calls().is_empty());
        assert!(h.vcs.commits().is_empty());
        assert!(h.vcs.pushes().is_empty());
        assert!(h.platform.created_pull_requests().is_empty());

        let outcomes = h.tracker.drain();
        match &outcomes["acme/widgets"] {
            Outcome::Failed(AppError::CommandExecution(_)) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dry_run_commits_locally_only() {
        let mut cfg = test_config(&["true"]);
        cfg.dry_run = true;
        let h = harness(cfg);

        h.pipeline.process_repo(remote_repo("widgets")).await;

        assert_eq!(h.vcs.commits().len(), 1);
        assert!(h.vcs.pushes().is_empty());
        assert!(h.platform.created_pull_requests().is_empty());
        assert!(matches!(h.tracker.drain()["acme/widgets"], Outcome::DryRun));
    }

    #[tokio::test]
    async fn test_skip_pull_requests_pushes_only() {
        let mut cfg = test_config(&["true"]);
        cfg.skip_pull_requests = true;
        let h = harness(cfg);

        h.pipeline.process_repo(remote_repo("widgets")).await;

        assert_eq!(h.vcs.pushes().len(), 1);
        assert!(h.platform.created_pull_requests().is_empty());
        assert!(matches!(
            h.tracker.drain()["acme/widgets"],
            Outcome::PullRequestSkipped
        ));
    }

    #[tokio::test]
    async fn test_existing_pull_request_is_not_duplicated() {
        let h = harness(test_config(&["true"]));
        h.platform.seed_open_pr(
            "acme/widgets",
            PullRequest {
                number: 7,
                title: "earlier run".to_string(),
                head_branch: "git-fleet-test".to_string(),
                base_branch: "main".to_string(),
                url: None,
            },
        );

        let result = h.pipeline.process_repo(remote_repo("widgets")).await;

        assert!(h.platform.created_pull_requests().is_empty());
        assert_eq!(result.pull_request.map(|pr| pr.number), Some(7));
        assert!(matches!(
            h.tracker.drain()["acme/widgets"],
            Outcome::PullRequestAlreadyOpen
        ));
    }

    #[tokio::test]
    async fn test_reviewers_and_assignees_requested() {
        let mut cfg = test_config(&["true"]);
        cfg.reviewers = vec!["alice".to_string(), "bob".to_string()];
        cfg.assignees = vec!["carol".to_string()];
        let h = harness(cfg);

        h.pipeline.process_repo(remote_repo("widgets")).await;

        let reviews = h.platform.reviewer_requests();
        assert_eq!(reviews.len(), 1);
        assert_eq!(reviews[0].2, vec!["alice".to_string(), "bob".to_string()]);
        assert_eq!(h.platform.assignee_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_reviewer_failure_is_non_fatal() {
        let mut cfg = test_config(&["true"]);
        cfg.reviewers = vec!["alice".to_string()];
        let h = harness(cfg);
        h.platform.fail_follow_ups();

        let result = h.pipeline.process_repo(remote_repo("widgets")).await;

        assert!(result.pull_request.is_some());
        assert!(matches!(
            h.tracker.drain()["acme/widgets"],
            Outcome::PullRequestOpened
        ));
    }

    #[tokio::test]
    async fn test_clone_failure_preserves_partial_result() {
        let h = harness(test_config(&["true"]));
        h.vcs.fail_at("widgets", FailPoint::Clone);

        let result = h.pipeline.process_repo(remote_repo("widgets")).await;

        assert!(result.checkout.is_none());
        assert!(result.branch.is_none());
        match &h.tracker.drain()["acme/widgets"] {
            Outcome::Failed(AppError::Clone(_)) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_push_failure_is_tagged_as_push() {
        let h = harness(test_config(&["true"]));
        h.vcs.fail_at("widgets", FailPoint::Push);

        let result = h.pipeline.process_repo(remote_repo("widgets")).await;

        // Commit landed locally before the push failed.
        assert_eq!(h.vcs.commits().len(), 1);
        assert!(result.branch.is_some());
        match &h.tracker.drain()["acme/widgets"] {
            Outcome::Failed(AppError::Push(_)) => {}
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_clone_dirs_do_not_collide() {
        let a = clone_dir("widgets");
        let b = clone_dir("widgets");
        assert_ne!(a, b);
        assert!(a
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("git-fleet-widgets-"));
    }
}
