use std::path::Path;

use tokio::process::Command;

use crate::error::{AppError, Result};
use crate::platform::types::RemoteRepo;

/// Run the operator-supplied command with the clone as working directory.
///
/// The target repository's identity is exported through
/// `GIT_FLEET_REPO_NAME` and `GIT_FLEET_REPO_OWNER` so scripts can vary
/// their behavior per repository. No timeout is imposed; the command may
/// run for as long as it needs.
pub async fn execute(args: &[String], dir: &Path, repo: &RemoteRepo) -> Result<()> {
    let (program, rest) = args.split_first().ok_or_else(|| {
        AppError::CommandExecution("no command was supplied".to_string())
    })?;

    tracing::debug!(repo = %repo.full_name(), command = %args.join(" "), "Executing command");

    let output = Command::new(program)
        .args(rest)
        .current_dir(dir)
        .env("GIT_FLEET_REPO_NAME", &repo.name)
        .env("GIT_FLEET_REPO_OWNER", &repo.owner)
        .output()
        .await
        .map_err(|e| AppError::CommandExecution(format!("failed to launch {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let stderr = stderr.trim();
        let detail = if stderr.is_empty() {
            String::new()
        } else {
            format!(": {stderr}")
        };
        return Err(AppError::CommandExecution(format!(
            "{program} exited with {}{detail}",
            output.status
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RemoteRepo {
        RemoteRepo {
            owner: "acme".to_string(),
            name: "widgets".to_string(),
            default_branch: "main".to_string(),
            archived: false,
            clone_url: "https://github.com/acme/widgets.git".to_string(),
        }
    }

    fn args(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_runs_in_clone_directory() {
        let tmp = tempfile::tempdir().unwrap();
        execute(&args(&["touch", "marker.txt"]), tmp.path(), &repo())
            .await
            .unwrap();
        assert!(tmp.path().join("marker.txt").exists());
    }

    #[tokio::test]
    async fn test_repository_identity_in_environment() {
        let tmp = tempfile::tempdir().unwrap();
        execute(
            &args(&[
                "sh",
                "-c",
                "test \"$GIT_FLEET_REPO_NAME\" = widgets && test \"$GIT_FLEET_REPO_OWNER\" = acme",
            ]),
            tmp.path(),
            &repo(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = execute(&args(&["sh", "-c", "echo boom >&2; exit 3"]), tmp.path(), &repo())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CommandExecution(_)));
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_launch_failure_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = execute(
            &args(&["definitely-not-a-real-binary-4242"]),
            tmp.path(),
            &repo(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::CommandExecution(_)));
    }

    #[tokio::test]
    async fn test_empty_command_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = execute(&[], tmp.path(), &repo()).await.unwrap_err();
        assert!(matches!(err, AppError::CommandExecution(_)));
    }
}
