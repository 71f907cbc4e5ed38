use octocrab::Octocrab;

use crate::error::{AppError, Result};

/// Host and token resolved from the process environment.
///
/// The token never leaves this struct except through the octocrab builder
/// and the git credential callbacks.
#[derive(Clone)]
pub struct HostCredentials {
    pub host: String,
    pub token: String,
}

// Manual Debug impl to avoid leaking the token
impl std::fmt::Debug for HostCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostCredentials")
            .field("host", &self.host)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Resolve credentials from the environment.
///
/// The standard host requires `GITHUB_OAUTH_TOKEN`. With `internal` set, an
/// enterprise host is read from `GITHUB_ENTERPRISE_HOST` together with
/// `GITHUB_ENTERPRISE_OAUTH_TOKEN`. A missing token is a startup-fatal
/// error; nothing is processed without one.
pub fn credentials_from_env(internal: bool) -> Result<HostCredentials> {
    if internal {
        let host = non_empty_env("GITHUB_ENTERPRISE_HOST").ok_or_else(|| {
            AppError::Auth(
                "--internal requires the GITHUB_ENTERPRISE_HOST environment variable".to_string(),
            )
        })?;
        let token = non_empty_env("GITHUB_ENTERPRISE_OAUTH_TOKEN").ok_or_else(|| {
            AppError::Auth(
                "--internal requires the GITHUB_ENTERPRISE_OAUTH_TOKEN environment variable"
                    .to_string(),
            )
        })?;
        return Ok(HostCredentials { host, token });
    }

    let token = non_empty_env("GITHUB_OAUTH_TOKEN").ok_or_else(|| {
        AppError::Auth("the GITHUB_OAUTH_TOKEN environment variable must be set".to_string())
    })?;

    Ok(HostCredentials {
        host: "github.com".to_string(),
        token,
    })
}

/// Build an octocrab client for the resolved host.
pub fn build_client(creds: &HostCredentials) -> Result<Octocrab> {
    let mut builder = Octocrab::builder().personal_token(creds.token.clone());

    if creds.host != "github.com" {
        let base = format!("https://{}/api/v3", creds.host);
        builder = builder
            .base_uri(base.as_str())
            .map_err(|e| AppError::Config(format!("Invalid enterprise host {base}: {e}")))?;
    }

    builder
        .build()
        .map_err(|e| AppError::GitHubApi(format!("Failed to build GitHub client: {e}")))
}
