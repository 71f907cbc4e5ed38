use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::error::AppError;

/// Terminal classification recorded for one repository.
#[derive(Debug)]
pub enum Outcome {
    /// Full pipeline ran and a pull request was opened.
    PullRequestOpened,
    /// A pull request from the same head/base pair was already open.
    PullRequestAlreadyOpen,
    /// Pushed, but pull requests are disabled for this run.
    PullRequestSkipped,
    /// Dry run: committed locally, nothing pushed, no PR.
    DryRun,
    /// The command left the worktree untouched; nothing to commit.
    NoChanges,
    /// The pipeline failed at some step.
    Failed(AppError),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed(_))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::PullRequestOpened => "pr opened",
            Outcome::PullRequestAlreadyOpen => "pr already open",
            Outcome::PullRequestSkipped => "pushed, pr skipped",
            Outcome::DryRun => "dry run",
            Outcome::NoChanges => "no changes",
            Outcome::Failed(_) => "failed",
        }
    }

    pub fn detail(&self) -> Option<String> {
        match self {
            Outcome::Failed(e) => Some(e.to_string()),
            _ => None,
        }
    }
}

/// Concurrency-safe sink for one `Outcome` per repository.
///
/// Writes arrive from concurrently running pipelines; the first write for a
/// repository wins and later ones are dropped with a warning, so no entry is
/// ever overwritten. Read once via `drain` after every pipeline has
/// finished.
#[derive(Default)]
pub struct RunTracker {
    outcomes: Mutex<HashMap<String, Outcome>>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, repo_full_name: &str, outcome: Outcome) {
        let mut outcomes = self.outcomes.lock().unwrap();
        if outcomes.contains_key(repo_full_name) {
            tracing::warn!(
                repo = repo_full_name,
                outcome = outcome.label(),
                "Duplicate outcome dropped"
            );
            return;
        }
        outcomes.insert(repo_full_name.to_string(), outcome);
    }

    /// Take the full outcome map, sorted by repository name.
    pub fn drain(&self) -> BTreeMap<String, Outcome> {
        let mut outcomes = self.outcomes.lock().unwrap();
        std::mem::take(&mut *outcomes).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_write_wins() {
        let tracker = RunTracker::new();
        tracker.record("acme/widgets", Outcome::NoChanges);
        tracker.record(
            "acme/widgets",
            Outcome::Failed(AppError::Push("late".to_string())),
        );

        let outcomes = tracker.drain();
        assert_eq!(outcomes.len(), 1);
        assert!(matches!(outcomes["acme/widgets"], Outcome::NoChanges));
    }

    #[test]
    fn test_drain_empties_the_tracker() {
        let tracker = RunTracker::new();
        tracker.record("acme/widgets", Outcome::DryRun);

        assert_eq!(tracker.drain().len(), 1);
        assert!(tracker.drain().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers() {
        let tracker = Arc::new(RunTracker::new());

        let mut handles = Vec::new();
        for i in 0..32 {
            let tracker = Arc::clone(&tracker);
            handles.push(tokio::spawn(async move {
                tracker.record(&format!("acme/repo-{i}"), Outcome::PullRequestOpened);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let outcomes = tracker.drain();
        assert_eq!(outcomes.len(), 32);
        assert!(outcomes.values().all(|o| !o.is_failure()));
    }
}
