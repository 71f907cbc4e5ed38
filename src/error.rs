use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    #[error("Clone failed: {0}")]
    Clone(String),

    #[error("HEAD ref lookup failed: {0}")]
    HeadRef(String),

    #[error("Worktree unavailable: {0}")]
    Worktree(String),

    #[error("Branch checkout failed: {0}")]
    BranchCheckout(String),

    #[error("Command execution failed: {0}")]
    CommandExecution(String),

    #[error("Staging changes failed: {0}")]
    Staging(String),

    #[error("Commit failed: {0}")]
    Commit(String),

    #[error("Push failed: {0}")]
    Push(String),

    #[error("Pull request creation failed: {0}")]
    PullRequest(String),

    #[error("Reviewer request failed: {0}")]
    ReviewerRequest(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<octocrab::Error> for AppError {
    fn from(e: octocrab::Error) -> Self {
        AppError::GitHubApi(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
