use crate::error::{AppError, Result};
use crate::platform::types;

/// Map an octocrab Repository to our platform type.
///
/// A repository without an owner or clone URL cannot be processed, so both
/// are hard errors rather than defaults.
pub fn map_repository(repo: octocrab::models::Repository) -> Result<types::RemoteRepo> {
    let owner = repo
        .owner
        .map(|o| o.login)
        .ok_or_else(|| AppError::GitHubApi(format!("Repository {} has no owner", repo.name)))?;

    let clone_url = repo
        .clone_url
        .map(|u| u.to_string())
        .ok_or_else(|| AppError::GitHubApi(format!("Repository {} has no clone URL", repo.name)))?;

    Ok(types::RemoteRepo {
        owner,
        name: repo.name,
        default_branch: repo.default_branch.unwrap_or_else(|| "main".to_string()),
        archived: repo.archived.unwrap_or(false),
        clone_url,
    })
}

pub fn map_pull_request(pr: octocrab::models::pulls::PullRequest) -> types::PullRequest {
    types::PullRequest {
        number: pr.number,
        title: pr.title.clone().unwrap_or_default(),
        head_branch: pr.head.ref_field.clone(),
        base_branch: pr.base.ref_field.clone(),
        url: pr.html_url.map(|u| u.to_string()),
    }
}
