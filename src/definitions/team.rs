//! Team definitions and the per-run team registry

use super::read_yaml_dir;
use super::repo::Repository;
use super::user::User;
use crate::error::{Error, Result};
use crate::types::TeamPrivacy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::warn;

/// Kind of team, used as a name prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamType {
    /// Special interest group (`sig-*`)
    Sig,
    /// Maintainers sub-team (`maintainers-*`)
    Maintainers,
    /// Reviewers sub-team (`reviewers-*`)
    Reviewers,
    /// Unprefixed team
    Misc,
}

impl TeamType {
    /// All prefixed kinds
    pub const PREFIXED: [Self; 3] = [Self::Sig, Self::Maintainers, Self::Reviewers];

    /// Prefix token
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sig => "sig",
            Self::Maintainers => "maintainers",
            Self::Reviewers => "reviewers",
            Self::Misc => "misc",
        }
    }
}

impl fmt::Display for TeamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How reviewers are picked for a team's pull requests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeReviewAlgorithm {
    /// Round robin
    #[serde(rename = "rr")]
    RoundRobin,
    /// Least workload first
    #[default]
    #[serde(rename = "lb")]
    LoadBalance,
}

/// Code review settings of a team
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeReview {
    /// Reviewers to request per PR
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_reviewers: Option<u32>,
    /// Selection algorithm
    pub algorithm: CodeReviewAlgorithm,
    /// Users never picked as assignee or reviewer
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub never_assign: Vec<User>,
    /// Do not notify the whole team
    pub dont_notify_team: bool,
    /// Include members of child teams
    pub include_child_teams: bool,
    /// Remove the team review request after assignment
    pub remove_review_request: bool,
    /// Count existing members toward the total
    pub count_existing_members: bool,
}

/// A team definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    /// Short name, type prefix removed on load
    pub name: String,
    /// Kind of team; inferred from the name prefix when absent
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub team_type: Option<TeamType>,
    /// Privacy on GitHub
    #[serde(default)]
    pub privacy: TeamPrivacy,
    /// Name of the parent team
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    /// Description
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Code review settings
    #[serde(default)]
    pub code_review: CodeReview,
    /// Maintainers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub maintainers: Vec<User>,
    /// Reviewers
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reviewers: Vec<User>,
    /// Other members
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<User>,
    /// Repositories owned by the team
    #[serde(rename = "repos", default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<Repository>,
}

impl Team {
    /// Create an empty team definition; the name may carry a type prefix
    pub fn named(name: &str) -> Self {
        let mut team = Self {
            name: name.to_string(),
            team_type: None,
            privacy: TeamPrivacy::default(),
            parent: None,
            description: String::new(),
            code_review: CodeReview::default(),
            maintainers: Vec::new(),
            reviewers: Vec::new(),
            members: Vec::new(),
            repositories: Vec::new(),
        };
        team.normalize();
        team
    }

    /// Split a type prefix off `name`, and normalize nested repositories.
    ///
    /// A declared type only strips its own prefix; without one, any known
    /// prefix sets the type.
    pub fn normalize(&mut self) {
        match self.team_type {
            Some(TeamType::Misc) => {}
            Some(kind) => {
                if let Some(short) = self.name.strip_prefix(&format!("{kind}-")) {
                    self.name = short.to_string();
                }
            }
            None => {
                for kind in TeamType::PREFIXED {
                    if let Some(short) = self.name.strip_prefix(&format!("{kind}-")) {
                        self.name = short.to_string();
                        self.team_type = Some(kind);
                        break;
                    }
                }
            }
        }
        self.parent = self.parent.as_deref().map(|p| strip_org(p).to_string());
        for repo in &mut self.repositories {
            repo.normalize();
        }
    }

    /// Effective kind; `misc` when neither stated nor prefixed
    pub fn kind(&self) -> TeamType {
        self.team_type.unwrap_or(TeamType::Misc)
    }

    /// Name as it appears on GitHub
    pub fn full_name(&self) -> String {
        match self.kind() {
            TeamType::Misc => self.name.clone(),
            kind => format!("{kind}-{}", self.name),
        }
    }

    /// Name of the derived sub-team for `kind` (`maintainers-<short>`)
    pub fn sub_team_name(&self, kind: TeamType) -> String {
        format!("{kind}-{}", self.name)
    }

    /// Whether `name` refers to this team, with or without prefix or `@org/`
    pub fn name_equals(&self, name: &str) -> bool {
        let name = strip_org(name);
        self.name == name
            || self.full_name() == name
            || TeamType::PREFIXED
                .iter()
                .any(|kind| format!("{kind}-{}", self.name) == name)
    }

    /// Maintainer logins
    pub fn maintainer_logins(&self) -> Vec<String> {
        logins(&self.maintainers)
    }

    /// Reviewer logins
    pub fn reviewer_logins(&self) -> Vec<String> {
        logins(&self.reviewers)
    }

    /// Direct member logins: maintainers, reviewers and members, deduplicated
    pub fn member_logins(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for user in self
            .maintainers
            .iter()
            .chain(&self.reviewers)
            .chain(&self.members)
        {
            if !out.iter().any(|u| u.eq_ignore_ascii_case(&user.github)) {
                out.push(user.github.clone());
            }
        }
        out
    }

    /// Whether `login` must never be assigned to this team's PRs
    pub fn never_assigns(&self, login: &str) -> bool {
        self.code_review.never_assign.iter().any(|u| u.is(login))
    }

    /// Whether the team declares ownership of repository `name`
    pub fn owns_repo(&self, name: &str) -> bool {
        self.repositories.iter().any(|r| r.name_equals(name))
    }

    /// Check required fields
    pub fn validate(&self, source: &Path) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::definition(source, "team name is required"));
        }
        for user in self
            .maintainers
            .iter()
            .chain(&self.reviewers)
            .chain(&self.members)
        {
            if user.github.trim().is_empty() {
                let who = if user.name.is_empty() {
                    "a user".to_string()
                } else {
                    format!("user '{}'", user.name)
                };
                return Err(Error::definition(
                    source,
                    format!("{who} in team {} has no github handle", self.full_name()),
                ));
            }
        }
        Ok(())
    }
}

fn logins(users: &[User]) -> Vec<String> {
    users.iter().map(|u| u.github.clone()).collect()
}

/// Strip an `@org/` prefix from a team reference
pub fn strip_org(name: &str) -> &str {
    name.strip_prefix('@')
        .and_then(|n| n.split_once('/').map(|(_, team)| team))
        .unwrap_or(name)
}

/// All teams of a run with resolved parent links.
///
/// Teams are stored in an arena; parents are indices into it.
#[derive(Debug, Clone, Default)]
pub struct TeamSet {
    teams: Vec<Team>,
    parents: Vec<Option<usize>>,
}

impl TeamSet {
    /// Build a set and link every team to its parent
    pub fn new(teams: Vec<Team>) -> Self {
        let mut set = Self {
            parents: vec![None; teams.len()],
            teams,
        };
        set.link_parents();
        set
    }

    fn link_parents(&mut self) {
        for idx in 0..self.teams.len() {
            let Some(parent) = self.teams[idx].parent.clone() else {
                continue;
            };
            match self.find_index(&parent) {
                Some(p) if p != idx => self.parents[idx] = Some(p),
                Some(_) => {
                    warn!(team = %self.teams[idx].full_name(), "team lists itself as parent");
                }
                None => {
                    warn!(
                        team = %self.teams[idx].full_name(),
                        parent = %parent,
                        "parent team not defined locally, assuming it exists remotely"
                    );
                }
            }
        }
    }

    /// Number of teams
    pub fn len(&self) -> usize {
        self.teams.len()
    }

    /// Whether there are no teams
    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Team at `idx`
    pub fn get(&self, idx: usize) -> &Team {
        &self.teams[idx]
    }

    /// Iterate over all teams
    pub fn iter(&self) -> impl Iterator<Item = &Team> {
        self.teams.iter()
    }

    /// Resolved parent index of the team at `idx`
    pub fn parent_of(&self, idx: usize) -> Option<usize> {
        self.parents[idx]
    }

    /// Index of the team called `name` (prefix and `@org/` tolerant)
    pub fn find_index(&self, name: &str) -> Option<usize> {
        self.teams.iter().position(|t| t.name_equals(name))
    }

    /// Team called `name`
    pub fn find(&self, name: &str) -> Option<&Team> {
        self.find_index(name).map(|i| &self.teams[i])
    }
}

/// Load, validate and normalize every team definition in `dir`
pub fn load_teams_from_dir(dir: &Path) -> Result<TeamSet> {
    let mut teams = Vec::new();
    for (path, mut team) in read_yaml_dir::<Team>(dir)? {
        team.normalize();
        team.validate(&path)?;
        if teams.iter().any(|t: &Team| t.full_name() == team.full_name()) {
            return Err(Error::definition(
                &path,
                format!("duplicate team {}", team.full_name()),
            ));
        }
        teams.push(team);
    }
    Ok(TeamSet::new(teams))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_prefix_is_split_into_type() {
        let team = Team::named("sig-net");
        assert_eq!(team.name, "net");
        assert_eq!(team.kind(), TeamType::Sig);
        assert_eq!(team.full_name(), "sig-net");
        assert_eq!(team.sub_team_name(TeamType::Maintainers), "maintainers-net");
        assert_eq!(team.sub_team_name(TeamType::Reviewers), "reviewers-net");
    }

    #[test]
    fn test_misc_team_is_not_prefixed() {
        let team = Team::named("release");
        assert_eq!(team.kind(), TeamType::Misc);
        assert_eq!(team.full_name(), "release");
    }

    #[test]
    fn test_name_equals_tolerates_org_and_prefix() {
        let team = Team::named("sig-net");
        assert!(team.name_equals("net"));
        assert!(team.name_equals("sig-net"));
        assert!(team.name_equals("@unikraft/sig-net"));
        assert!(team.name_equals("maintainers-net"));
        assert!(!team.name_equals("sig-netdev"));
    }

    #[test]
    fn test_member_logins_are_deduplicated() {
        let mut team = Team::named("sig-net");
        team.maintainers = vec![User::with_github("alice")];
        team.reviewers = vec![User::with_github("bob"), User::with_github("Alice")];
        team.members = vec![User::with_github("carol")];

        assert_eq!(team.member_logins(), ["alice", "bob", "carol"]);
    }

    #[test]
    fn test_validate_rejects_user_without_handle() {
        let mut team = Team::named("sig-net");
        team.reviewers = vec![User {
            name: "Bob".to_string(),
            ..User::default()
        }];

        let err = team.validate(Path::new("sig-net.yaml")).unwrap_err();
        assert!(err.to_string().contains("Bob"));
    }

    #[test]
    fn test_every_parent_is_linked() {
        let mut lib = Team::named("sig-lib");
        lib.parent = Some("sig-root".to_string());
        let mut net = Team::named("sig-net");
        net.parent = Some("@unikraft/sig-lib".to_string());
        let mut orphan = Team::named("sig-orphan");
        orphan.parent = Some("sig-missing".to_string());
        let root = Team::named("sig-root");

        let set = TeamSet::new(vec![lib, net, orphan, root]);

        assert_eq!(set.parent_of(0), Some(3));
        assert_eq!(set.parent_of(1), Some(0));
        assert_eq!(set.parent_of(2), None);
        assert_eq!(set.parent_of(3), None);
    }

    #[test]
    fn test_load_teams_from_dir() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("sig-net.yaml"),
            r"
name: sig-net
description: Networking
maintainers:
  - name: Alice
    github: alice
reviewers:
  - github: bob
repos:
  - name: lib-lwip
code_review:
  never_assign:
    - github: carol
",
        )
        .unwrap();

        let set = load_teams_from_dir(temp.path()).unwrap();
        assert_eq!(set.len(), 1);
        let team = set.get(0);
        assert_eq!(team.full_name(), "sig-net");
        assert!(team.owns_repo("lwip"));
        assert!(team.owns_repo("lib-lwip"));
        assert!(team.never_assigns("Carol"));
        assert_eq!(team.maintainer_logins(), ["alice"]);
    }

    #[test]
    fn test_declared_type_strips_matching_prefix() {
        for (yaml, full, short) in [
            ("name: sig-net\ntype: sig\n", "sig-net", "net"),
            ("name: net\ntype: sig\n", "sig-net", "net"),
            ("name: maintainers-net\ntype: maintainers\n", "maintainers-net", "net"),
            ("name: reviewers-net\ntype: reviewers\n", "reviewers-net", "net"),
            ("name: sig-net\ntype: misc\n", "sig-net", "sig-net"),
        ] {
            let mut team: Team = serde_yaml::from_str(yaml).unwrap();
            team.normalize();
            assert_eq!(team.full_name(), full, "{yaml}");
            assert_eq!(team.name, short, "{yaml}");
        }
    }

    #[test]
    fn test_declared_type_keeps_sub_team_names_single_prefixed() {
        let mut team: Team = serde_yaml::from_str("name: sig-net\ntype: sig\n").unwrap();
        team.normalize();

        assert_eq!(team.sub_team_name(TeamType::Maintainers), "maintainers-net");
        assert!(team.name_equals("net"));
        assert!(team.name_equals("sig-net"));
        assert!(team.name_equals("@unikraft/sig-net"));
        assert!(!team.name_equals("sig-sig-net"));
    }

    #[test]
    fn test_load_team_with_declared_type() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("sig-net.yaml"),
            "name: sig-net\ntype: sig\nrepos:\n  - name: lib-lwip\n    type: lib\n",
        )
        .unwrap();

        let set = load_teams_from_dir(temp.path()).unwrap();
        let team = set.get(0);
        assert_eq!(team.full_name(), "sig-net");
        assert_eq!(team.repositories[0].full_name(), "lib-lwip");
        assert!(set.find("sig-net").is_some());
    }

    #[test]
    fn test_load_rejects_duplicates() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("a.yaml"), "name: sig-net\n").unwrap();
        fs::write(temp.path().join("b.yaml"), "name: net\ntype: sig\n").unwrap();

        assert!(load_teams_from_dir(temp.path()).is_err());
    }
}
