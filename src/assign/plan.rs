//! Assignment planning - pure functions
//!
//! Works out which teams are responsible for a pull request, which users
//! may be picked, and who gets picked. No I/O happens here: workload and
//! CODEOWNERS are gathered beforehand by the caller.

use crate::codeowners::{CodeOwners, team_owners};
use crate::definitions::{Team, TeamSet};
use crate::error::{Error, Result};
use crate::types::{ChangedFile, PullRequest};
use crate::workload::WorkloadTracker;
use std::fmt;
use tracing::debug;

/// How many users to pick per role
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignOptions {
    /// Maintainers assigned when the PR has no assignee
    pub num_maintainers: usize,
    /// Reviewers requested when the PR has no review activity
    pub num_reviewers: usize,
}

impl Default for AssignOptions {
    fn default() -> Self {
        Self {
            num_maintainers: 1,
            num_reviewers: 1,
        }
    }
}

/// Users eligible for each role
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidatePools {
    /// Possible assignees
    pub maintainers: Vec<String>,
    /// Possible reviewers
    pub reviewers: Vec<String>,
}

/// What the assignment step will do to a PR
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentPlan {
    /// Users to add as assignees
    pub assignees: Vec<String>,
    /// Users to request a review from
    pub reviewers: Vec<String>,
}

impl AssignmentPlan {
    /// Whether the PR needs no change
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assignees.is_empty() && self.reviewers.is_empty()
    }
}

impl fmt::Display for AssignmentPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let list = |users: &[String]| {
            if users.is_empty() {
                "-".to_string()
            } else {
                users.join(", ")
            }
        };
        write!(
            f,
            "assignees: {}; reviewers: {}",
            list(&self.assignees),
            list(&self.reviewers)
        )
    }
}

/// Teams responsible for a PR in `repo`.
///
/// Teams declaring the repository come first, in definition order, then
/// teams named by CODEOWNERS for any old or new path of the changed files.
pub fn candidate_teams<'a>(
    teams: &'a TeamSet,
    repo: &str,
    codeowners: Option<&CodeOwners>,
    files: &[ChangedFile],
) -> Vec<&'a Team> {
    let mut found: Vec<&Team> = teams.iter().filter(|t| t.owns_repo(repo)).collect();

    if let Some(codeowners) = codeowners {
        for path in files.iter().flat_map(ChangedFile::paths) {
            for owner in team_owners(codeowners.owners_of(path)) {
                let Some(team) = teams.find(owner) else {
                    debug!(owner, path, "CODEOWNERS team not defined locally");
                    continue;
                };
                if !found.iter().any(|t| t.full_name() == team.full_name()) {
                    debug!(team = %team.full_name(), path, "adding team from CODEOWNERS");
                    found.push(team);
                }
            }
        }
    }

    found
}

/// Eligible maintainers and reviewers of `teams`.
///
/// The author, duplicates and users a team never assigns are left out.
pub fn candidate_pools(teams: &[&Team], author: &str) -> CandidatePools {
    let mut pools = CandidatePools::default();

    for team in teams {
        let eligible = |login: &str| !login.eq_ignore_ascii_case(author) && !team.never_assigns(login);
        for login in team.maintainer_logins() {
            if eligible(&login) {
                push_unique(&mut pools.maintainers, &login);
            }
        }
        for login in team.reviewer_logins() {
            if eligible(&login) {
                push_unique(&mut pools.reviewers, &login);
            }
        }
    }

    pools
}

fn push_unique(list: &mut Vec<String>, login: &str) {
    if !list.iter().any(|l| l.eq_ignore_ascii_case(login)) {
        list.push(login.to_string());
    }
}

/// Decide assignees and reviewers for `pr` (PURE - no I/O).
///
/// Maintainers are picked only when the PR has no assignee, reviewers
/// only when it has neither reviews nor pending review requests. Anyone
/// assigned, before or now, is never also picked as reviewer. Picks
/// update the trackers so later PRs in the same run see the new load.
pub fn plan_assignment(
    pr: &PullRequest,
    has_reviews: bool,
    pools: &CandidatePools,
    maintainers: &mut WorkloadTracker,
    reviewers: &mut WorkloadTracker,
    options: AssignOptions,
) -> Result<AssignmentPlan> {
    let mut plan = AssignmentPlan::default();

    if pr.assignees.is_empty() && options.num_maintainers > 0 {
        if pools.maintainers.is_empty() {
            return Err(Error::NoCandidates {
                role: "maintainer",
                pr: format!("#{}", pr.number),
            });
        }
        plan.assignees = maintainers.pop_many(&pools.maintainers, options.num_maintainers);
    }

    if !has_reviews && pr.requested_reviewers.is_empty() && options.num_reviewers > 0 {
        let pool: Vec<&String> = pools
            .reviewers
            .iter()
            .filter(|r| {
                !pr.assignees
                    .iter()
                    .chain(&plan.assignees)
                    .any(|a| a.eq_ignore_ascii_case(r))
            })
            .collect();
        if pool.is_empty() {
            return Err(Error::NoCandidates {
                role: "reviewer",
                pr: format!("#{}", pr.number),
            });
        }
        plan.reviewers = reviewers.pop_many(&pool, options.num_reviewers);
    }

    Ok(plan)
}
