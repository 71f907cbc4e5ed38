use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::vcs::{VcsBackend, WorktreeStatus};

/// Pipeline step at which a `MockVcs` repository is scripted to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailPoint {
    Clone,
    HeadRef,
    Worktree,
    BranchCheckout,
    Staging,
    Commit,
    Push,
}

const MOCK_HEAD: &str = "0123456789abcdef0123456789abcdef01234567";
const MOCK_COMMIT: &str = "89abcdef0123456789abcdef0123456789abcdef";

/// Deterministic in-memory `VcsBackend`.
///
/// Records every operation for assertions, supports scripted per-repository
/// failures, per-repository staged-change counts, and an artificial clone
/// delay with an active-clone high-water mark so tests can observe how many
/// pipelines actually ran at once.
#[derive(Default)]
pub struct MockVcs {
    state: Mutex<MockVcsState>,
    clone_delay: Duration,
}

#[derive(Default)]
struct MockVcsState {
    /// Clone target dir -> repository name, learned at clone time.
    dirs: HashMap<PathBuf, String>,
    /// Repository name -> number of changed paths after the command (default 1).
    staged_changes: HashMap<String, usize>,
    failures: HashMap<String, FailPoint>,

    cloned: Vec<String>,
    branches: Vec<(String, String)>,
    stage_calls: Vec<String>,
    commits: Vec<(String, String)>,
    pushes: Vec<(String, String)>,

    active_clones: usize,
    max_active_clones: usize,
}

fn repo_name_from_url(url: &str) -> String {
    url.trim_end_matches(".git")
        .rsplit('/')
        .next()
        .unwrap_or(url)
        .to_string()
}

impl MockVcs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone operations will hold an "active" slot for this long, which is
    /// what makes the concurrency high-water mark observable.
    pub fn with_clone_delay(delay: Duration) -> Self {
        Self {
            state: Mutex::default(),
            clone_delay: delay,
        }
    }

    /// Script the named repository to fail at the given step.
    pub fn fail_at(&self, repo_name: &str, point: FailPoint) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(repo_name.to_string(), point);
    }

    /// Set how many changed paths the command leaves behind in this
    /// repository. Zero makes the pipeline take the no-changes path.
    pub fn set_staged_changes(&self, repo_name: &str, count: usize) {
        self.state
            .lock()
            .unwrap()
            .staged_changes
            .insert(repo_name.to_string(), count);
    }

    pub fn cloned(&self) -> Vec<String> {
        self.state.lock().unwrap().cloned.clone()
    }

    pub fn branches(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().branches.clone()
    }

    pub fn stage_calls(&self) -> Vec<String> {
        self.state.lock().unwrap().stage_calls.clone()
    }

    pub fn commits(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().commits.clone()
    }

    pub fn pushes(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().pushes.clone()
    }

    pub fn max_active_clones(&self) -> usize {
        self.state.lock().unwrap().max_active_clones
    }

    fn name_for(&self, dir: &Path) -> String {
        self.state
            .lock()
            .unwrap()
            .dirs
            .get(dir)
            .cloned()
            .unwrap_or_else(|| dir.display().to_string())
    }

    fn check_failure(&self, name: &str, point: FailPoint) -> Option<AppError> {
        let state = self.state.lock().unwrap();
        if state.failures.get(name) != Some(&point) {
            return None;
        }
        let msg = format!("scripted {point:?} failure for {name}");
        Some(match point {
            FailPoint::Clone => AppError::Clone(msg),
            FailPoint::HeadRef => AppError::HeadRef(msg),
            FailPoint::Worktree => AppError::Worktree(msg),
            FailPoint::BranchCheckout => AppError::BranchCheckout(msg),
            FailPoint::Staging => AppError::Staging(msg),
            FailPoint::Commit => AppError::Commit(msg),
            FailPoint::Push => AppError::Push(msg),
        })
    }
}

#[async_trait]
impl VcsBackend for MockVcs {
    async fn clone_repo(
        &self,
        url: &str,
        target: &Path,
        _depth: u32,
        _branch: Option<&str>,
    ) -> Result<()> {
        let name = repo_name_from_url(url);

        if let Some(err) = self.check_failure(&name, FailPoint::Clone) {
            return Err(err);
        }

        {
            let mut state = self.state.lock().unwrap();
            state.active_clones += 1;
            state.max_active_clones = state.max_active_clones.max(state.active_clones);
        }

        if !self.clone_delay.is_zero() {
            tokio::time::sleep(self.clone_delay).await;
        }

        // The command step runs with the clone as its working directory, so
        // the directory has to exist even in tests.
        tokio::fs::create_dir_all(target)
            .await
            .map_err(|e| AppError::Clone(e.to_string()))?;

        let mut state = self.state.lock().unwrap();
        state.active_clones -= 1;
        state.cloned.push(name.clone());
        state.dirs.insert(target.to_path_buf(), name);
        Ok(())
    }

    async fn head_ref(&self, dir: &Path) -> Result<String> {
        let name = self.name_for(dir);
        if let Some(err) = self.check_failure(&name, FailPoint::HeadRef) {
            return Err(err);
        }
        Ok(MOCK_HEAD.to_string())
    }

    async fn open_worktree(&self, dir: &Path) -> Result<()> {
        let name = self.name_for(dir);
        if let Some(err) = self.check_failure(&name, FailPoint::Worktree) {
            return Err(err);
        }
        Ok(())
    }

    async fn checkout_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        let name = self.name_for(dir);
        if let Some(err) = self.check_failure(&name, FailPoint::BranchCheckout) {
            return Err(err);
        }
        self.state
            .lock()
            .unwrap()
            .branches
            .push((name, branch.to_string()));
        Ok(())
    }

    async fn worktree_status(&self, dir: &Path) -> Result<WorktreeStatus> {
        let name = self.name_for(dir);
        if let Some(err) = self.check_failure(&name, FailPoint::Staging) {
            return Err(err);
        }

        let count = {
            let state = self.state.lock().unwrap();
            state.staged_changes.get(&name).copied().unwrap_or(1)
        };

        let mut status = WorktreeStatus::default();
        for i in 0..count {
            status.modified.push(format!("file-{i}.txt"));
        }
        Ok(status)
    }

    async fn stage_all(&self, dir: &Path) -> Result<()> {
        let name = self.name_for(dir);
        if let Some(err) = self.check_failure(&name, FailPoint::Staging) {
            return Err(err);
        }
        self.state.lock().unwrap().stage_calls.push(name);
        Ok(())
    }

    async fn commit(&self, dir: &Path, message: &str) -> Result<String> {
        let name = self.name_for(dir);
        if let Some(err) = self.check_failure(&name, FailPoint::Commit) {
            return Err(err);
        }
        self.state
            .lock()
            .unwrap()
            .commits
            .push((name, message.to_string()));
        Ok(MOCK_COMMIT.to_string())
    }

    async fn push(&self, dir: &Path, branch: &str) -> Result<()> {
        let name = self.name_for(dir);
        if let Some(err) = self.check_failure(&name, FailPoint::Push) {
            return Err(err);
        }
        self.state
            .lock()
            .unwrap()
            .pushes
            .push((name, branch.to_string()));
        Ok(())
    }
}
