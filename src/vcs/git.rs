use std::path::Path;

use async_trait::async_trait;
use git2::{
    build::RepoBuilder, Cred, FetchOptions, IndexAddOption, PushOptions, RemoteCallbacks,
    Repository, Signature, StatusOptions,
};

use crate::error::{AppError, Result};
use crate::vcs::{VcsBackend, WorktreeStatus};

/// Production `VcsBackend` driving libgit2.
///
/// Every operation opens the repository fresh inside `spawn_blocking`, so no
/// git2 handle is ever held across an await point.
pub struct Git2Backend {
    token: String,
}

impl Git2Backend {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
        }
    }
}

/// Validate a branch name to prevent argument injection.
/// Rejects names starting with `-` as defence in depth.
fn validate_branch_name(name: &str) -> std::result::Result<(), git2::Error> {
    if name.starts_with('-') {
        return Err(git2::Error::from_str(&format!(
            "invalid branch name (starts with '-'): {name}"
        )));
    }
    Ok(())
}

/// Build `FetchOptions` that authenticate via credential callback.
/// The token is captured by the closure and never written to disk.
fn make_fetch_options(token: &str) -> FetchOptions<'_> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username_from_url, _allowed_types| {
        Cred::userpass_plaintext("x-access-token", token)
    });
    let mut opts = FetchOptions::new();
    opts.remote_callbacks(callbacks);
    opts
}

/// Build `PushOptions` that authenticate via credential callback.
fn make_push_options(token: &str) -> PushOptions<'_> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.credentials(move |_url, _username_from_url, _allowed_types| {
        Cred::userpass_plaintext("x-access-token", token)
    });
    let mut opts = PushOptions::new();
    opts.remote_callbacks(callbacks);
    opts
}

fn commit_signature(repo: &Repository) -> std::result::Result<Signature<'static>, git2::Error> {
    // Prefer the local/global git identity, fall back to the tool's own.
    repo.signature()
        .or_else(|_| Signature::now("git-fleet", "git-fleet@localhost"))
}

#[async_trait]
impl VcsBackend for Git2Backend {
    async fn clone_repo(
        &self,
        url: &str,
        target: &Path,
        depth: u32,
        branch: Option<&str>,
    ) -> Result<()> {
        if !url.starts_with("https://") {
            return Err(AppError::Clone(format!(
                "expected HTTPS clone URL, got: {url}"
            )));
        }

        let url = url.to_string();
        let target = target.to_path_buf();
        let branch = branch.map(|b| b.to_string());
        let token = self.token.clone();

        let out = tokio::task::spawn_blocking(move || -> std::result::Result<(), git2::Error> {
            let mut fetch_opts = make_fetch_options(&token);
            if depth > 0 {
                fetch_opts.depth(depth as i32);
            }

            let mut builder = RepoBuilder::new();
            builder.fetch_options(fetch_opts);
            if let Some(branch) = &branch {
                validate_branch_name(branch)?;
                builder.branch(branch);
            }
            builder.clone(&url, &target)?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Clone(format!("clone task panicked: {e}")))?;

        out.map_err(|e| AppError::Clone(e.message().to_string()))
    }

    async fn head_ref(&self, dir: &Path) -> Result<String> {
        let dir = dir.to_path_buf();

        let out = tokio::task::spawn_blocking(move || -> std::result::Result<String, git2::Error> {
            let repo = Repository::open(&dir)?;
            let head = repo.head()?;
            let commit = head.peel_to_commit()?;
            Ok(commit.id().to_string())
        })
        .await
        .map_err(|e| AppError::HeadRef(format!("head-ref task panicked: {e}")))?;

        out.map_err(|e| AppError::HeadRef(e.message().to_string()))
    }

    async fn open_worktree(&self, dir: &Path) -> Result<()> {
        let dir = dir.to_path_buf();

        let out = tokio::task::spawn_blocking(move || -> std::result::Result<(), git2::Error> {
            let repo = Repository::open(&dir)?;
            if repo.is_bare() || repo.workdir().is_none() {
                return Err(git2::Error::from_str("repository has no working tree"));
            }
            Ok(())
        })
        .await
        .map_err(|e| AppError::Worktree(format!("worktree task panicked: {e}")))?;

        out.map_err(|e| AppError::Worktree(e.message().to_string()))
    }

    async fn checkout_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        let dir = dir.to_path_buf();
        let branch = branch.to_string();
        let token = self.token.clone();

        let out = tokio::task::spawn_blocking(move || -> std::result::Result<(), git2::Error> {
            validate_branch_name(&branch)?;

            let repo = Repository::open(&dir)?;

            // Fetch the branch if the remote already has it, so repeated
            // runs against the same branch converge on the remote tip.
            // A fetch failure (no such remote ref, offline remote) is not
            // fatal here; the branch is then created from HEAD.
            if let Ok(mut remote) = repo.find_remote("origin") {
                let refspec =
                    format!("+refs/heads/{branch}:refs/remotes/origin/{branch}");
                let mut fetch_opts = make_fetch_options(&token);
                if let Err(e) = remote.fetch(&[&refspec], Some(&mut fetch_opts), None) {
                    tracing::debug!(branch = %branch, error = %e, "No remote branch to converge on");
                }
            }

            let target = match repo.find_reference(&format!("refs/remotes/origin/{branch}")) {
                Ok(remote_ref) => remote_ref.peel_to_commit()?,
                Err(_) => repo.head()?.peel_to_commit()?,
            };

            repo.branch(&branch, &target, true)?;
            let obj = repo.revparse_single(&format!("refs/heads/{branch}"))?;
            repo.checkout_tree(&obj, None)?;
            repo.set_head(&format!("refs/heads/{branch}"))?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::BranchCheckout(format!("checkout task panicked: {e}")))?;

        out.map_err(|e| AppError::BranchCheckout(e.message().to_string()))
    }

    async fn worktree_status(&self, dir: &Path) -> Result<WorktreeStatus> {
        let dir = dir.to_path_buf();

        let out = tokio::task::spawn_blocking(
            move || -> std::result::Result<WorktreeStatus, git2::Error> {
                let repo = Repository::open(&dir)?;

                let mut opts = StatusOptions::new();
                opts.include_untracked(true).recurse_untracked_dirs(true);
                let statuses = repo.statuses(Some(&mut opts))?;

                let mut result = WorktreeStatus::default();
                for entry in statuses.iter() {
                    let path = entry.path().unwrap_or_default().to_string();
                    let s = entry.status();
                    if s.is_wt_new() || s.is_index_new() {
                        result.new.push(path);
                    } else if s.is_wt_deleted() || s.is_index_deleted() {
                        result.deleted.push(path);
                    } else if !s.is_ignored() {
                        result.modified.push(path);
                    }
                }
                Ok(result)
            },
        )
        .await
        .map_err(|e| AppError::Staging(format!("status task panicked: {e}")))?;

        out.map_err(|e| AppError::Staging(e.message().to_string()))
    }

    async fn stage_all(&self, dir: &Path) -> Result<()> {
        let dir = dir.to_path_buf();

        let out = tokio::task::spawn_blocking(move || -> std::result::Result<(), git2::Error> {
            let repo = Repository::open(&dir)?;
            let mut index = repo.index()?;
            index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
            // add_all does not record deletions; update_all does.
            index.update_all(["*"].iter(), None)?;
            index.write()?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Staging(format!("stage task panicked: {e}")))?;

        out.map_err(|e| AppError::Staging(e.message().to_string()))
    }

    async fn commit(&self, dir: &Path, message: &str) -> Result<String> {
        let dir = dir.to_path_buf();
        let message = message.to_string();

        let out = tokio::task::spawn_blocking(move || -> std::result::Result<String, git2::Error> {
            let repo = Repository::open(&dir)?;
            let sig = commit_signature(&repo)?;
            let mut index = repo.index()?;
            let tree_oid = index.write_tree()?;
            let tree = repo.find_tree(tree_oid)?;
            let head = repo.head()?;
            let parent = head.peel_to_commit()?;
            let oid = repo.commit(Some("HEAD"), &sig, &sig, &message, &tree, &[&parent])?;
            Ok(oid.to_string())
        })
        .await
        .map_err(|e| AppError::Commit(format!("commit task panicked: {e}")))?;

        out.map_err(|e| AppError::Commit(e.message().to_string()))
    }

    async fn push(&self, dir: &Path, branch: &str) -> Result<()> {
        let dir = dir.to_path_buf();
        let branch = branch.to_string();
        let token = self.token.clone();

        let out = tokio::task::spawn_blocking(move || -> std::result::Result<(), git2::Error> {
            validate_branch_name(&branch)?;

            let repo = Repository::open(&dir)?;
            let mut remote = repo.find_remote("origin")?;
            let refspec = format!("refs/heads/{branch}:refs/heads/{branch}");
            let mut push_opts = make_push_options(&token);
            remote.push(&[&refspec], Some(&mut push_opts))?;
            Ok(())
        })
        .await
        .map_err(|e| AppError::Push(format!("push task panicked: {e}")))?;

        out.map_err(|e| AppError::Push(e.message().to_string()))
    }
}
