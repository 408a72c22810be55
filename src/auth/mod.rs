//! Authentication for GitHub
//!
//! Supports an explicit token, environment variables and the gh CLI.

use crate::error::{Error, Result};
use crate::git::{CommandRunner, CommandSpec};
use tracing::debug;

/// Environment variables checked for a token, in order
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Source of authentication token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthSource {
    /// `--github-token` / `GOVERN_GITHUB_TOKEN`
    Flag,
    /// Token from environment variable
    EnvVar,
    /// Token from CLI tool (`gh auth token`)
    Cli,
}

/// A resolved GitHub token
#[derive(Clone, PartialEq, Eq)]
pub struct GitHubAuth {
    /// The token
    pub token: String,
    /// Where it came from
    pub source: AuthSource,
}

impl std::fmt::Debug for GitHubAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubAuth")
            .field("token", &"***")
            .field("source", &self.source)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Resolve a token: the flag value, then `env`, then `gh auth token`.
///
/// `env` looks up an environment variable; it is a parameter so callers
/// and tests decide where values come from.
pub async fn resolve_github_token<F>(
    flag: Option<&str>,
    env: F,
    runner: &dyn CommandRunner,
) -> Result<GitHubAuth>
where
    F: Fn(&str) -> Option<String> + Send,
{
    if let Some(token) = non_empty(flag.map(ToString::to_string)) {
        debug!("using token from flag");
        return Ok(GitHubAuth {
            token,
            source: AuthSource::Flag,
        });
    }

    for var in TOKEN_ENV_VARS {
        if let Some(token) = non_empty(env(var)) {
            debug!(var, "using token from environment");
            return Ok(GitHubAuth {
                token,
                source: AuthSource::EnvVar,
            });
        }
    }

    let output = runner
        .run(&CommandSpec::new("gh").args(["auth", "token"]))
        .await
        .ok()
        .filter(crate::git::CommandOutput::success);
    if let Some(token) = non_empty(output.map(|o| o.stdout)) {
        debug!("using token from gh auth token");
        return Ok(GitHubAuth {
            token,
            source: AuthSource::Cli,
        });
    }

    Err(Error::Auth(
        "no GitHub token: pass --github-token, set GITHUB_TOKEN or run `gh auth login`".to_string(),
    ))
}
