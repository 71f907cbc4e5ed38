pub mod git;
pub mod mock;

use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;

/// Worktree status snapshot: every path the operator's command touched.
#[derive(Debug, Clone, Default)]
pub struct WorktreeStatus {
    pub new: Vec<String>,
    pub modified: Vec<String>,
    pub deleted: Vec<String>,
}

impl WorktreeStatus {
    pub fn change_count(&self) -> usize {
        self.new.len() + self.modified.len() + self.deleted.len()
    }

    pub fn is_clean(&self) -> bool {
        self.change_count() == 0
    }
}

/// Local version-control capability.
///
/// The production implementation drives git2; the mock implementation is
/// in-memory. Credentials live inside the implementation, never in call
/// sites.
#[async_trait]
pub trait VcsBackend: Send + Sync {
    /// Clone `url` into `target`, honoring a clone depth and an optional
    /// source branch override (the remote's default branch otherwise).
    async fn clone_repo(
        &self,
        url: &str,
        target: &Path,
        depth: u32,
        branch: Option<&str>,
    ) -> Result<()>;

    /// Resolve HEAD to a commit id.
    async fn head_ref(&self, dir: &Path) -> Result<String>;

    /// Verify the clone has a usable working tree.
    async fn open_worktree(&self, dir: &Path) -> Result<()>;

    /// Create `branch` from HEAD and check it out. When the remote already
    /// has a branch of that name, converge on its tip instead so repeated
    /// runs against the same branch do not diverge.
    async fn checkout_branch(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Inspect the worktree for new, modified, and deleted paths.
    async fn worktree_status(&self, dir: &Path) -> Result<WorktreeStatus>;

    /// Stage every change in the worktree, deletions included.
    async fn stage_all(&self, dir: &Path) -> Result<()>;

    /// Commit the staged changes; returns the new commit id.
    async fn commit(&self, dir: &Path, message: &str) -> Result<String>;

    /// Push `branch` to the origin remote.
    async fn push(&self, dir: &Path, branch: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worktree_status_counts() {
        let mut status = WorktreeStatus::default();
        assert!(status.is_clean());

        status.new.push("a.txt".to_string());
        status.deleted.push("b.txt".to_string());
        assert_eq!(status.change_count(), 2);
        assert!(!status.is_clean());
    }
}
