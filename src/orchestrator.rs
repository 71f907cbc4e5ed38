use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};

use crate::config::RunConfig;
use crate::pipeline::{Pipeline, PipelineResult};
use crate::platform::types::RemoteRepo;
use crate::platform::Platform;
use crate::tracker::RunTracker;
use crate::vcs::VcsBackend;

/// Fan the pipeline out over every selected repository.
///
/// At most `max_concurrent_repos` pipelines run at once when that value is
/// positive; zero lifts the ceiling entirely. One task is dispatched per
/// repository and every task runs to completion; a failing repository
/// cannot cancel or affect a sibling. Each task sends its single result
/// into a channel owned here, so collection needs no shared mutable state;
/// the call returns only after every task has reported.
pub async fn process_repos(
    cfg: Arc<RunConfig>,
    platform: Arc<dyn Platform>,
    vcs: Arc<dyn VcsBackend>,
    tracker: Arc<RunTracker>,
    repos: Vec<RemoteRepo>,
) -> Vec<PipelineResult> {
    let pipeline = Arc::new(Pipeline::new(
        Arc::clone(&cfg),
        platform,
        vcs,
        tracker,
    ));

    let semaphore = match cfg.max_concurrent_repos {
        0 => None,
        n => Some(Arc::new(Semaphore::new(n))),
    };

    tracing::info!(
        repos = repos.len(),
        max_concurrent = cfg.max_concurrent_repos,
        "Dispatching repository pipelines"
    );

    let expected = repos.len();
    let (tx, mut rx) = mpsc::unbounded_channel();

    for repo in repos {
        let pipeline = Arc::clone(&pipeline);
        let semaphore = semaphore.clone();
        let tx = tx.clone();

        tokio::spawn(async move {
            let _permit = match semaphore {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };

            let result = pipeline.process_repo(repo).await;

            // The receiver outlives every sender; a failed send can only
            // mean the run was torn down underneath us.
            let _ = tx.send(result);
        });
    }
    drop(tx);

    let mut results = Vec::with_capacity(expected);
    while let Some(result) = rx.recv().await {
        results.push(result);
    }

    results
}
