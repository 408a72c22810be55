//! Shared command context for CLI commands
//!
//! Extracts the setup shared by every command: token resolution, the
//! GitHub client and PR reference parsing.

use governance::auth::{AuthSource, resolve_github_token};
use governance::config::{GovernConfig, under_github_actions};
use governance::definitions::Definitions;
use governance::error::{Error, Result};
use governance::git::SystemRunner;
use governance::platform::{GitHubService, PlatformService};
use governance::types::PrRef;
use tracing::debug;

/// Shared context for CLI commands that talk to GitHub
pub struct CommandContext {
    /// Normalized global settings
    pub config: GovernConfig,
    /// GitHub client
    pub platform: Box<dyn PlatformService>,
    /// Resolved token, also handed to git and gh
    pub token: String,
    /// Runner for git, gh and checkpatch
    pub runner: SystemRunner,
}

impl CommandContext {
    /// Validate `config`, resolve the token and create the GitHub client
    pub async fn new(config: GovernConfig) -> Result<Self> {
        config.validate()?;

        let runner = SystemRunner;
        let auth = resolve_github_token(
            config.token.as_deref(),
            |var| std::env::var(var).ok(),
            &runner,
        )
        .await?;
        if auth.source == AuthSource::Cli {
            debug!("token taken from gh; consider passing --github-token in automation");
        }

        let platform = GitHubService::new(&auth.token, config.endpoint.as_deref(), config.skip_ssl)?;

        Ok(Self {
            config,
            platform: Box::new(platform),
            token: auth.token,
            runner,
        })
    }

    /// Load team and repository definitions from the configured directories
    pub fn definitions(&self) -> Result<Definitions> {
        Definitions::load(&self.config.teams_dir, &self.config.repos_dir)
    }
}

/// Parse positional PR arguments, falling back to the GitHub Actions environment
pub fn resolve_pr_ref(args: &[String]) -> Result<PrRef> {
    if args.is_empty() && under_github_actions() {
        let repository = std::env::var("GITHUB_REPOSITORY")
            .map_err(|_| Error::InvalidPrRef("GITHUB_REPOSITORY is not set".to_string()))?;
        let git_ref = std::env::var("GITHUB_REF")
            .map_err(|_| Error::InvalidPrRef("GITHUB_REF is not set".to_string()))?;
        return PrRef::from_actions_env(&repository, &git_ref);
    }
    PrRef::parse_args(args)
}
