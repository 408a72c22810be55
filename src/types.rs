//! Core types shared by the orchestrators and the GitHub collaborator

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Reference to a single pull request: `org/repo#number`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrRef {
    /// Organization (or user) owning the repository
    pub org: String,
    /// Repository name
    pub repo: String,
    /// Pull request number
    pub number: u64,
}

impl PrRef {
    /// Create a new reference
    pub fn new(org: impl Into<String>, repo: impl Into<String>, number: u64) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
            number,
        }
    }

    /// Parse positional CLI arguments into a reference.
    ///
    /// Accepted forms:
    /// - `ORG/REPO/ID`
    /// - `https://github.com/ORG/REPO/pull/ID`
    /// - `https://github.com/ORG/REPO[.git] ID`
    pub fn parse_args(args: &[String]) -> Result<Self> {
        match args {
            [single] if single.contains("://") => Self::parse_pr_url(single),
            [single] => Self::parse_triple(single),
            [repo_url, id] => {
                let (org, repo) = parse_repo_url(repo_url)?;
                let number = parse_number(id)?;
                Ok(Self::new(org, repo, number))
            }
            [] => Err(Error::InvalidPrRef(
                "expected ORG/REPO/ID, a pull request URL, or a repository URL and ID".to_string(),
            )),
            _ => Err(Error::InvalidPrRef(format!(
                "too many arguments: {}",
                args.join(" ")
            ))),
        }
    }

    /// Build a reference from GitHub Actions' `GITHUB_REPOSITORY` and `GITHUB_REF`
    pub fn from_actions_env(repository: &str, git_ref: &str) -> Result<Self> {
        let (org, repo) = repository.split_once('/').ok_or_else(|| {
            Error::InvalidPrRef(format!("malformed GITHUB_REPOSITORY: {repository}"))
        })?;

        // refs/pull/<id>/merge
        let parts: Vec<&str> = git_ref.split('/').collect();
        match parts.as_slice() {
            ["refs", "pull", id, ..] => Ok(Self::new(org, repo, parse_number(id)?)),
            _ => Err(Error::InvalidPrRef(format!(
                "GITHUB_REF does not reference a pull request: {git_ref}"
            ))),
        }
    }

    fn parse_triple(value: &str) -> Result<Self> {
        let parts: Vec<&str> = value.split('/').collect();
        match parts.as_slice() {
            [org, repo, id] if !org.is_empty() && !repo.is_empty() => {
                Ok(Self::new(*org, *repo, parse_number(id)?))
            }
            _ => Err(Error::InvalidPrRef(format!(
                "expected ORG/REPO/ID, got {value}"
            ))),
        }
    }

    fn parse_pr_url(value: &str) -> Result<Self> {
        let url = Url::parse(value)
            .map_err(|e| Error::InvalidPrRef(format!("{value}: {e}")))?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            [org, repo, "pull", id, ..] => Ok(Self::new(*org, *repo, parse_number(id)?)),
            _ => Err(Error::InvalidPrRef(format!(
                "not a pull request URL: {value}"
            ))),
        }
    }

    /// `org/repo` slug of the repository
    pub fn repo_slug(&self) -> String {
        format!("{}/{}", self.org, self.repo)
    }
}

impl fmt::Display for PrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.org, self.repo, self.number)
    }
}

fn parse_number(value: &str) -> Result<u64> {
    value
        .trim_start_matches('#')
        .parse()
        .map_err(|_| Error::InvalidPrRef(format!("invalid pull request number: {value}")))
}

fn parse_repo_url(value: &str) -> Result<(String, String)> {
    let url = Url::parse(value).map_err(|e| Error::InvalidPrRef(format!("{value}: {e}")))?;
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    match segments.as_slice() {
        [org, repo] => Ok((
            (*org).to_string(),
            repo.trim_end_matches(".git").to_string(),
        )),
        _ => Err(Error::InvalidPrRef(format!(
            "not a repository URL: {value}"
        ))),
    }
}

/// PR state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    /// Open
    Open,
    /// Closed without merging
    Closed,
    /// Merged
    Merged,
}

impl PrState {
    /// Lowercase name, as used by policy state filters
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Merged => "merged",
        }
    }
}

impl fmt::Display for PrState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of a pull request, fetched fresh per invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    /// PR number
    pub number: u64,
    /// PR title
    pub title: String,
    /// PR body
    pub body: Option<String>,
    /// Login of the author
    pub author: String,
    /// Current state
    pub state: PrState,
    /// Whether the PR is a draft
    pub is_draft: bool,
    /// `None` while GitHub is still computing mergeability
    pub mergeable: Option<bool>,
    /// Label names
    pub labels: Vec<String>,
    /// Assignee logins
    pub assignees: Vec<String>,
    /// Requested reviewer logins
    pub requested_reviewers: Vec<String>,
    /// Base branch name
    pub base_ref: String,
    /// Head branch name
    pub head_ref: String,
    /// Web URL
    pub html_url: String,
    /// Number of commits, when reported
    pub commits: Option<u64>,
}

impl PullRequest {
    /// Whether `login` is assigned to this PR
    pub fn is_assignee(&self, login: &str) -> bool {
        self.assignees.iter().any(|a| a.eq_ignore_ascii_case(login))
    }

    /// Whether `login` was requested as reviewer
    pub fn is_requested_reviewer(&self, login: &str) -> bool {
        self.requested_reviewers
            .iter()
            .any(|r| r.eq_ignore_ascii_case(login))
    }

    /// Whether the PR carries `label`
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }
}

/// A comment on a PR (issue comment)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrComment {
    /// Comment ID
    pub id: u64,
    /// Login of the commenter
    pub author: String,
    /// Comment body
    pub body: String,
}

/// State of a submitted review
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewState {
    /// Approved the changes
    Approved,
    /// Requested changes
    ChangesRequested,
    /// Left a comment-only review
    Commented,
    /// Review was dismissed
    Dismissed,
    /// Review not yet submitted
    Pending,
}

impl ReviewState {
    /// Canonical policy token for this state
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "approve",
            Self::ChangesRequested => "request_changes",
            Self::Commented => "comment",
            Self::Dismissed => "dismiss",
            Self::Pending => "pending",
        }
    }
}

/// A submitted review on a PR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrReview {
    /// Review ID
    pub id: u64,
    /// Login of the reviewer
    pub author: String,
    /// Review body
    pub body: String,
    /// Review state
    pub state: ReviewState,
}

/// A file touched by a PR
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedFile {
    /// Path after the change
    pub path: String,
    /// Path before a rename, if renamed
    pub previous_path: Option<String>,
}

impl ChangedFile {
    /// Both the old and the new path, deduplicated
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.previous_path
            .as_deref()
            .filter(|p| *p != self.path)
            .into_iter()
            .chain(std::iter::once(self.path.as_str()))
    }
}

/// Team privacy on GitHub
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamPrivacy {
    /// Visible to all organization members
    #[default]
    Closed,
    /// Visible only to members and owners
    Secret,
}

/// Role of a user inside a GitHub team
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipRole {
    /// Regular member
    Member,
    /// Team maintainer
    Maintainer,
}

impl MembershipRole {
    /// API value
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Maintainer => "maintainer",
        }
    }
}

/// A team as it exists on GitHub
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteTeam {
    /// Numeric team ID
    pub id: u64,
    /// Display name
    pub name: String,
    /// URL slug
    pub slug: String,
}

/// Desired state of a team pushed by an upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamUpsert {
    /// Full team name
    pub name: String,
    /// Description
    pub description: String,
    /// Privacy
    pub privacy: TeamPrivacy,
    /// Parent team ID; `None` removes any parent
    pub parent_id: Option<u64>,
    /// Maintainer logins (only honored on creation)
    pub maintainers: Vec<String>,
    /// `org/repo` names the team should be added to on creation
    pub repo_names: Vec<String>,
}
