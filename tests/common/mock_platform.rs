//! Mock GitHub platform for testing
//!
//! These are test utilities - not all may be used in current tests but are
//! available for future test development.

#![allow(dead_code)]

use async_trait::async_trait;
use governance::error::{Error, Result};
use governance::platform::PlatformService;
use governance::types::{
    ChangedFile, MembershipRole, PrComment, PrRef, PrReview, PrState, PullRequest, RemoteTeam,
    ReviewState, TeamUpsert,
};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// Call record for `add_team_member`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddMemberCall {
    pub team: String,
    pub username: String,
    pub role: MembershipRole,
}

/// Call record for `remove_team_member`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveMemberCall {
    pub team: String,
    pub username: String,
}

/// Call record for PR mutations (assignees, reviewers, labels)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrMutationCall {
    pub pr: u64,
    pub values: Vec<String>,
}

/// In-memory GitHub organization.
///
/// Features:
/// - Teams keyed by slug with auto-incrementing ids
/// - Configurable PRs, comments, reviews and changed files per PR number
/// - Call tracking for verification
/// - Error injection for failure path testing
pub struct MockPlatformService {
    next_team_id: AtomicU64,
    teams: Mutex<HashMap<String, RemoteTeam>>,
    members: Mutex<HashMap<String, Vec<String>>>,
    prs: Mutex<HashMap<u64, PullRequest>>,
    comments: Mutex<HashMap<u64, Vec<PrComment>>>,
    reviews: Mutex<HashMap<u64, Vec<PrReview>>>,
    files: Mutex<HashMap<u64, Vec<ChangedFile>>>,
    repo_files: Mutex<HashMap<String, String>>,
    // Call tracking
    upsert_calls: Mutex<Vec<TeamUpsert>>,
    add_member_calls: Mutex<Vec<AddMemberCall>>,
    remove_member_calls: Mutex<Vec<RemoveMemberCall>>,
    membership_checks: Mutex<Vec<(String, String)>>,
    assignee_calls: Mutex<Vec<PrMutationCall>>,
    reviewer_calls: Mutex<Vec<PrMutationCall>>,
    label_calls: Mutex<Vec<PrMutationCall>>,
    // Error injection
    error_on_upsert: Mutex<Option<String>>,
    error_on_add_member: Mutex<Option<String>>,
    error_on_get_pr: Mutex<Option<String>>,
}

impl Default for MockPlatformService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPlatformService {
    /// Empty organization
    pub fn new() -> Self {
        Self {
            next_team_id: AtomicU64::new(100),
            teams: Mutex::new(HashMap::new()),
            members: Mutex::new(HashMap::new()),
            prs: Mutex::new(HashMap::new()),
            comments: Mutex::new(HashMap::new()),
            reviews: Mutex::new(HashMap::new()),
            files: Mutex::new(HashMap::new()),
            repo_files: Mutex::new(HashMap::new()),
            upsert_calls: Mutex::new(Vec::new()),
            add_member_calls: Mutex::new(Vec::new()),
            remove_member_calls: Mutex::new(Vec::new()),
            membership_checks: Mutex::new(Vec::new()),
            assignee_calls: Mutex::new(Vec::new()),
            reviewer_calls: Mutex::new(Vec::new()),
            label_calls: Mutex::new(Vec::new()),
            error_on_upsert: Mutex::new(None),
            error_on_add_member: Mutex::new(None),
            error_on_get_pr: Mutex::new(None),
        }
    }

    // === Error injection methods ===

    /// Make `upsert_team` return an error
    pub fn fail_upsert(&self, msg: &str) {
        *self.error_on_upsert.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `add_team_member` return an error
    pub fn fail_add_member(&self, msg: &str) {
        *self.error_on_add_member.lock().unwrap() = Some(msg.to_string());
    }

    /// Make `get_pr` return an error
    pub fn fail_get_pr(&self, msg: &str) {
        *self.error_on_get_pr.lock().unwrap() = Some(msg.to_string());
    }

    // === Setup helpers ===

    /// Create a team with existing members
    pub fn add_team(&self, name: &str, members: &[&str]) -> RemoteTeam {
        let team = RemoteTeam {
            id: self.next_team_id.fetch_add(1, Ordering::SeqCst),
            name: name.to_string(),
            slug: slug(name),
        };
        self.teams
            .lock()
            .unwrap()
            .insert(team.slug.clone(), team.clone());
        self.members.lock().unwrap().insert(
            team.slug.clone(),
            members.iter().map(ToString::to_string).collect(),
        );
        team
    }

    /// Register a pull request
    pub fn set_pr(&self, pr: PullRequest) {
        self.prs.lock().unwrap().insert(pr.number, pr);
    }

    /// Set the issue comments of a PR
    pub fn set_comments(&self, pr: u64, comments: Vec<PrComment>) {
        self.comments.lock().unwrap().insert(pr, comments);
    }

    /// Set the reviews of a PR
    pub fn set_reviews(&self, pr: u64, reviews: Vec<PrReview>) {
        self.reviews.lock().unwrap().insert(pr, reviews);
    }

    /// Set the changed files of a PR
    pub fn set_changed_files(&self, pr: u64, paths: &[&str]) {
        let files = paths
            .iter()
            .map(|p| ChangedFile {
                path: (*p).to_string(),
                previous_path: None,
            })
            .collect();
        self.files.lock().unwrap().insert(pr, files);
    }

    /// Serve `content` for `path` from every repository
    pub fn set_repo_file(&self, path: &str, content: &str) {
        self.repo_files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.to_string());
    }

    // === Call inspection ===

    pub fn upsert_calls(&self) -> Vec<TeamUpsert> {
        self.upsert_calls.lock().unwrap().clone()
    }

    pub fn add_member_calls(&self) -> Vec<AddMemberCall> {
        self.add_member_calls.lock().unwrap().clone()
    }

    pub fn remove_member_calls(&self) -> Vec<RemoveMemberCall> {
        self.remove_member_calls.lock().unwrap().clone()
    }

    pub fn membership_checks(&self) -> Vec<(String, String)> {
        self.membership_checks.lock().unwrap().clone()
    }

    pub fn assignee_calls(&self) -> Vec<PrMutationCall> {
        self.assignee_calls.lock().unwrap().clone()
    }

    pub fn reviewer_calls(&self) -> Vec<PrMutationCall> {
        self.reviewer_calls.lock().unwrap().clone()
    }

    pub fn label_calls(&self) -> Vec<PrMutationCall> {
        self.label_calls.lock().unwrap().clone()
    }

    /// Current members of a team, by name or slug
    pub fn team_members(&self, name: &str) -> Vec<String> {
        self.members
            .lock()
            .unwrap()
            .get(&slug(name))
            .cloned()
            .unwrap_or_default()
    }

    /// Id of an existing team, by name or slug
    pub fn find_team_id(&self, name: &str) -> Option<u64> {
        self.teams.lock().unwrap().get(&slug(name)).map(|t| t.id)
    }

    /// Logins added to `team`
    pub fn added_to(&self, team: &str) -> Vec<String> {
        self.add_member_calls()
            .into_iter()
            .filter(|c| c.team == slug(team))
            .map(|c| c.username)
            .collect()
    }

    // === Assertion helpers ===

    /// Assert nothing on GitHub was changed
    pub fn assert_no_mutations(&self) {
        assert!(self.upsert_calls().is_empty(), "unexpected team upserts");
        assert!(self.add_member_calls().is_empty(), "unexpected member additions");
        assert!(self.remove_member_calls().is_empty(), "unexpected member removals");
        assert!(self.assignee_calls().is_empty(), "unexpected assignees");
        assert!(self.reviewer_calls().is_empty(), "unexpected review requests");
        assert!(self.label_calls().is_empty(), "unexpected labels");
    }

    /// Assert the exact sequence of upserted team names
    pub fn assert_upserted(&self, expected: &[&str]) {
        let names: Vec<String> = self.upsert_calls().into_iter().map(|u| u.name).collect();
        assert_eq!(names, expected, "upserted teams mismatch");
    }

    fn pr(&self, number: u64) -> Result<PullRequest> {
        self.prs
            .lock()
            .unwrap()
            .get(&number)
            .cloned()
            .ok_or_else(|| Error::GitHubApi(format!("pull request #{number} not found")))
    }
}

fn slug(name: &str) -> String {
    name.to_ascii_lowercase().replace(' ', "-")
}

fn injected(slot: &Mutex<Option<String>>) -> Result<()> {
    match slot.lock().unwrap().as_ref() {
        Some(msg) => Err(Error::Platform(msg.clone())),
        None => Ok(()),
    }
}

#[async_trait]
impl PlatformService for MockPlatformService {
    async fn find_team(&self, _org: &str, name: &str) -> Result<Option<RemoteTeam>> {
        let teams = self.teams.lock().unwrap();
        Ok(teams
            .values()
            .find(|t| t.name == name || t.slug == slug(name))
            .cloned())
    }

    async fn upsert_team(&self, _org: &str, team: &TeamUpsert) -> Result<RemoteTeam> {
        injected(&self.error_on_upsert)?;
        self.upsert_calls.lock().unwrap().push(team.clone());

        let key = slug(&team.name);
        let mut teams = self.teams.lock().unwrap();
        if let Some(existing) = teams.get(&key) {
            return Ok(existing.clone());
        }
        let created = RemoteTeam {
            id: self.next_team_id.fetch_add(1, Ordering::SeqCst),
            name: team.name.clone(),
            slug: key.clone(),
        };
        teams.insert(key.clone(), created.clone());
        self.members.lock().unwrap().entry(key).or_default();
        Ok(created)
    }

    async fn list_team_members(&self, _org: &str, team_slug: &str) -> Result<Vec<String>> {
        Ok(self.team_members(team_slug))
    }

    async fn add_team_member(
        &self,
        _org: &str,
        team_slug: &str,
        username: &str,
        role: MembershipRole,
    ) -> Result<()> {
        injected(&self.error_on_add_member)?;
        self.add_member_calls.lock().unwrap().push(AddMemberCall {
            team: team_slug.to_string(),
            username: username.to_string(),
            role,
        });
        let mut members = self.members.lock().unwrap();
        let list = members.entry(team_slug.to_string()).or_default();
        if !list.iter().any(|m| m.eq_ignore_ascii_case(username)) {
            list.push(username.to_string());
        }
        Ok(())
    }

    async fn remove_team_member(&self, _org: &str, team_slug: &str, username: &str) -> Result<()> {
        self.remove_member_calls
            .lock()
            .unwrap()
            .push(RemoveMemberCall {
                team: team_slug.to_string(),
                username: username.to_string(),
            });
        if let Some(list) = self.members.lock().unwrap().get_mut(team_slug) {
            list.retain(|m| !m.eq_ignore_ascii_case(username));
        }
        Ok(())
    }

    async fn is_team_member(&self, _org: &str, team_slug: &str, username: &str) -> Result<bool> {
        self.membership_checks
            .lock()
            .unwrap()
            .push((team_slug.to_string(), username.to_string()));
        Ok(self
            .team_members(team_slug)
            .iter()
            .any(|m| m.eq_ignore_ascii_case(username)))
    }

    async fn list_open_prs(&self, _org: &str, _repo: &str) -> Result<Vec<PullRequest>> {
        let mut open: Vec<PullRequest> = self
            .prs
            .lock()
            .unwrap()
            .values()
            .filter(|pr| pr.state == PrState::Open)
            .cloned()
            .collect();
        open.sort_by_key(|pr| pr.number);
        Ok(open)
    }

    async fn get_pr(&self, pr: &PrRef) -> Result<PullRequest> {
        injected(&self.error_on_get_pr)?;
        self.pr(pr.number)
    }

    async fn list_pr_comments(&self, pr: &PrRef) -> Result<Vec<PrComment>> {
        Ok(self
            .comments
            .lock()
            .unwrap()
            .get(&pr.number)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_pr_reviews(&self, pr: &PrRef) -> Result<Vec<PrReview>> {
        Ok(self
            .reviews
            .lock()
            .unwrap()
            .get(&pr.number)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_changed_files(&self, pr: &PrRef) -> Result<Vec<ChangedFile>> {
        Ok(self
            .files
            .lock()
            .unwrap()
            .get(&pr.number)
            .cloned()
            .unwrap_or_default())
    }

    async fn add_assignees(&self, pr: &PrRef, assignees: &[String]) -> Result<()> {
        self.assignee_calls.lock().unwrap().push(PrMutationCall {
            pr: pr.number,
            values: assignees.to_vec(),
        });
        if let Some(stored) = self.prs.lock().unwrap().get_mut(&pr.number) {
            stored.assignees.extend_from_slice(assignees);
        }
        Ok(())
    }

    async fn request_reviewers(&self, pr: &PrRef, reviewers: &[String]) -> Result<()> {
        self.reviewer_calls.lock().unwrap().push(PrMutationCall {
            pr: pr.number,
            values: reviewers.to_vec(),
        });
        if let Some(stored) = self.prs.lock().unwrap().get_mut(&pr.number) {
            stored.requested_reviewers.extend_from_slice(reviewers);
        }
        Ok(())
    }

    async fn add_labels(&self, pr: &PrRef, labels: &[String]) -> Result<()> {
        self.label_calls.lock().unwrap().push(PrMutationCall {
            pr: pr.number,
            values: labels.to_vec(),
        });
        if let Some(stored) = self.prs.lock().unwrap().get_mut(&pr.number) {
            stored.labels.extend_from_slice(labels);
        }
        Ok(())
    }

    async fn fetch_file(&self, _org: &str, _repo: &str, path: &str) -> Result<Option<String>> {
        Ok(self.repo_files.lock().unwrap().get(path).cloned())
    }

    async fn list_dir(&self, _org: &str, _repo: &str, path: &str) -> Result<Option<Vec<String>>> {
        let prefix = format!("{}/", path.trim_end_matches('/'));
        let mut files: Vec<String> = self
            .repo_files
            .lock()
            .unwrap()
            .keys()
            .filter(|p| p.strip_prefix(&prefix).is_some_and(|rest| !rest.contains('/')))
            .cloned()
            .collect();
        if files.is_empty() {
            return Ok(None);
        }
        files.sort();
        Ok(Some(files))
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// Open PR #`number` in `unikraft/unikraft`, authored by `dave`
pub fn make_pr(number: u64) -> PullRequest {
    PullRequest {
        number,
        title: format!("lib/lwip: Change {number}"),
        body: None,
        author: "dave".to_string(),
        state: PrState::Open,
        is_draft: false,
        mergeable: Some(true),
        labels: Vec::new(),
        assignees: Vec::new(),
        requested_reviewers: Vec::new(),
        base_ref: "staging".to_string(),
        head_ref: format!("change-{number}"),
        html_url: format!("https://github.com/unikraft/unikraft/pull/{number}"),
        commits: Some(1),
    }
}

/// Reference to PR #`number` in `unikraft/unikraft`
pub fn pr_ref(number: u64) -> PrRef {
    PrRef::new("unikraft", "unikraft", number)
}

/// Issue comment by `author`
pub fn comment(id: u64, author: &str, body: &str) -> PrComment {
    PrComment {
        id,
        author: author.to_string(),
        body: body.to_string(),
    }
}

/// Submitted review by `author`
pub fn review(id: u64, author: &str, body: &str, state: ReviewState) -> PrReview {
    PrReview {
        id,
        author: author.to_string(),
        body: body.to_string(),
        state,
    }
}
