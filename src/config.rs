//! Run-wide configuration shared by every command

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::debug;

/// Default GitHub organization
pub const DEFAULT_ORG: &str = "unikraft";

/// Global settings, normalized from flags and `GOVERN_*` variables
#[derive(Debug, Clone, Default)]
pub struct GovernConfig {
    /// GitHub organization
    pub org: String,
    /// GitHub user, used for authenticated clone URLs
    pub user: Option<String>,
    /// Explicit token; resolved through [`crate::auth`] when `None`
    pub token: Option<String>,
    /// API endpoint override
    pub endpoint: Option<String>,
    /// Disable TLS verification on the HTTP client
    pub skip_ssl: bool,
    /// Plan and report without mutating anything
    pub dry_run: bool,
    /// Plain output, no colour or spinners
    pub no_render: bool,
    /// Repository definitions
    pub repos_dir: PathBuf,
    /// Team definitions
    pub teams_dir: PathBuf,
    /// Working directory kept after the run; a temporary one otherwise
    pub temp_dir: Option<PathBuf>,
}

impl GovernConfig {
    /// Reject settings that cannot work before anything else runs
    pub fn validate(&self) -> Result<()> {
        if self.org.trim().is_empty() {
            return Err(Error::Config("--github-org must not be empty".to_string()));
        }
        if let Some(endpoint) = &self.endpoint {
            url::Url::parse(endpoint)
                .map_err(|e| Error::Config(format!("invalid --github-endpoint '{endpoint}': {e}")))?;
        }
        Ok(())
    }

    /// Working directory for clones and patch files
    pub fn workdir(&self, prefix: &str) -> Result<Workdir> {
        Workdir::new(self.temp_dir.as_deref(), prefix)
    }
}

/// A directory that is either kept (user supplied) or removed on drop
#[derive(Debug)]
pub enum Workdir {
    /// `--temp-dir`, left in place
    Kept(PathBuf),
    /// Fresh temporary directory
    Temporary(TempDir),
}

impl Workdir {
    /// Use `dir` when given (creating it), else a new temporary directory named after `prefix`
    pub fn new(dir: Option<&Path>, prefix: &str) -> Result<Self> {
        if let Some(dir) = dir {
            std::fs::create_dir_all(dir)?;
            debug!(path = %dir.display(), "using working directory");
            return Ok(Self::Kept(dir.to_path_buf()));
        }
        let temp = tempfile::Builder::new().prefix(prefix).tempdir()?;
        debug!(path = %temp.path().display(), "created temporary directory");
        Ok(Self::Temporary(temp))
    }

    /// Path of the directory
    pub fn path(&self) -> &Path {
        match self {
            Self::Kept(path) => path,
            Self::Temporary(temp) => temp.path(),
        }
    }
}

/// Whether the process runs inside GitHub Actions
pub fn under_github_actions() -> bool {
    std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true" || v == "yes")
}

/// The checked-out repository of a GitHub Actions job
pub fn actions_workspace() -> Option<PathBuf> {
    under_github_actions()
        .then(|| std::env::var_os("GITHUB_WORKSPACE").map(PathBuf::from))
        .flatten()
}
