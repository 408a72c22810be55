//! Error types for governance operations

use thiserror::Error;

/// Errors that can occur while governing an organization
#[derive(Error, Debug)]
pub enum Error {
    /// A definition file (team, repo, label) is malformed or inconsistent
    #[error("invalid definition in {path}: {message}")]
    Definition {
        /// File or directory the definition came from
        path: String,
        /// What is wrong with it
        message: String,
    },

    /// Invalid command-line or environment configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Authentication could not be resolved
    #[error("authentication error: {0}")]
    Auth(String),

    /// GitHub API returned an error or unexpected payload
    #[error("GitHub API error: {0}")]
    GitHubApi(String),

    /// Error surfaced by octocrab
    #[error("GitHub API error: {0}")]
    Octocrab(#[from] octocrab::Error),

    /// HTTP transport error from raw API calls
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Generic platform failure (used by mocks and collaborators)
    #[error("platform error: {0}")]
    Platform(String),

    /// A team could not be found remotely
    #[error("team not found: @{org}/{team}")]
    TeamNotFound {
        /// Organization searched
        org: String,
        /// Team name searched
        team: String,
    },

    /// A single membership change failed during reconciliation
    #[error("failed to {action} {username} in team {team}: {source}")]
    Membership {
        /// Team slug being reconciled
        team: String,
        /// `add` or `remove`
        action: &'static str,
        /// Affected user
        username: String,
        /// Underlying failure
        #[source]
        source: Box<Self>,
    },

    /// No candidates were available for an assignment role
    #[error("no {role} candidates available for {pr}")]
    NoCandidates {
        /// `maintainer` or `reviewer`
        role: &'static str,
        /// Pull request reference
        pr: String,
    },

    /// The pull request reference could not be parsed
    #[error("invalid pull request reference: {0}")]
    InvalidPrRef(String),

    /// The pull request is closed or merged
    #[error("pull request {0} is not open")]
    PrNotOpen(String),

    /// The pull request does not satisfy the merge policy
    #[error("pull request is not mergeable: {0}")]
    NotMergeable(String),

    /// An external command (git, gh, checkpatch.pl) failed
    #[error("command `{command}` failed{}: {stderr}", status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    Command {
        /// Command line that was run
        command: String,
        /// Exit status, if the process exited normally
        status: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// checkpatch produced output that could not be parsed
    #[error("unexpected checkpatch output: {0}")]
    Checkpatch(String),

    /// checkpatch reported problems
    #[error("checkpatch failed with {errors} errors and {warnings} warnings")]
    PatchCheckFailed {
        /// Error notes
        errors: usize,
        /// Warning notes
        warnings: usize,
    },

    /// A commit could not be turned into a patch
    #[error("patch error: {0}")]
    Patch(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML (de)serialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid regular expression
    #[error("invalid regular expression: {0}")]
    Regex(#[from] regex::Error),

    /// Invalid glob pattern
    #[error("invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    /// Internal error (unexpected state)
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for a definition error tied to a path
    pub fn definition(path: impl AsRef<std::path::Path>, message: impl Into<String>) -> Self {
        Self::Definition {
            path: path.as_ref().display().to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias for governance operations
pub type Result<T> = std::result::Result<T, Error>;
