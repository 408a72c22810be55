//! GitHub collaborator interface
//!
//! Orchestrators only talk to GitHub through [`PlatformService`], so they can
//! be driven by a mock in tests.

mod github;

pub use github::{GitHubService, next_page_url};

use crate::error::Result;
use crate::types::{
    ChangedFile, MembershipRole, PrComment, PrRef, PrReview, PullRequest, RemoteTeam, TeamUpsert,
};
use async_trait::async_trait;

/// Operations the governance tool performs against GitHub
#[async_trait]
pub trait PlatformService: Send + Sync {
    // =========================================================================
    // Teams
    // =========================================================================

    /// Find a team by display name or slug
    async fn find_team(&self, org: &str, name: &str) -> Result<Option<RemoteTeam>>;

    /// Create the team, or update it when one with the same name exists
    async fn upsert_team(&self, org: &str, team: &TeamUpsert) -> Result<RemoteTeam>;

    /// Logins of the direct members of a team
    async fn list_team_members(&self, org: &str, team_slug: &str) -> Result<Vec<String>>;

    /// Add (or update) a user's membership with the given role
    async fn add_team_member(
        &self,
        org: &str,
        team_slug: &str,
        username: &str,
        role: MembershipRole,
    ) -> Result<()>;

    /// Remove a user from a team
    async fn remove_team_member(&self, org: &str, team_slug: &str, username: &str) -> Result<()>;

    /// Whether `username` is an active member of the team
    async fn is_team_member(&self, org: &str, team_slug: &str, username: &str) -> Result<bool>;

    // =========================================================================
    // Pull requests
    // =========================================================================

    /// All open PRs of a repository
    async fn list_open_prs(&self, org: &str, repo: &str) -> Result<Vec<PullRequest>>;

    /// Fetch a single PR
    async fn get_pr(&self, pr: &PrRef) -> Result<PullRequest>;

    /// Issue comments on a PR
    async fn list_pr_comments(&self, pr: &PrRef) -> Result<Vec<PrComment>>;

    /// Submitted reviews on a PR
    async fn list_pr_reviews(&self, pr: &PrRef) -> Result<Vec<PrReview>>;

    /// Files touched by a PR
    async fn list_changed_files(&self, pr: &PrRef) -> Result<Vec<ChangedFile>>;

    /// Add assignees to a PR
    async fn add_assignees(&self, pr: &PrRef, assignees: &[String]) -> Result<()>;

    /// Request reviews from users
    async fn request_reviewers(&self, pr: &PrRef, reviewers: &[String]) -> Result<()>;

    /// Add labels to a PR
    async fn add_labels(&self, pr: &PrRef, labels: &[String]) -> Result<()>;

    // =========================================================================
    // Repository content
    // =========================================================================

    /// Raw content of a file on the default branch, `None` when absent
    async fn fetch_file(&self, org: &str, repo: &str, path: &str) -> Result<Option<String>>;

    /// Paths of the files directly inside directory `path` on the default
    /// branch, `None` when the directory is absent
    async fn list_dir(&self, org: &str, repo: &str, path: &str) -> Result<Option<Vec<String>>>;
}
