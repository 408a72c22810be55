//! Per-user workload tracking for least-stressed assignment

use crate::types::PullRequest;
use std::collections::HashMap;

/// Count of open pull requests each user is currently assigned to.
///
/// Counts start from a scan of open PRs and grow as the run hands out
/// new assignments. Logins are compared case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadTracker {
    counts: HashMap<String, u32>,
}

impl WorkloadTracker {
    /// Empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker seeded with explicit counts
    pub fn from_counts<I, S>(counts: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        Self {
            counts: counts
                .into_iter()
                .map(|(user, count)| (key(user.as_ref()), count))
                .collect(),
        }
    }

    /// Make sure `user` is tracked, starting at zero
    pub fn ensure(&mut self, user: &str) {
        self.counts.entry(key(user)).or_insert(0);
    }

    /// Add one unit of work to `user`
    pub fn record(&mut self, user: &str) {
        *self.counts.entry(key(user)).or_insert(0) += 1;
    }

    /// Current count of `user` (zero when untracked)
    pub fn count(&self, user: &str) -> u32 {
        self.counts.get(&key(user)).copied().unwrap_or(0)
    }

    /// Number of tracked users
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no user is tracked
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Pick the candidate with the lowest count, bump it, and return it.
    ///
    /// Unknown candidates start at zero. Ties go to the login that sorts
    /// first. Returns `None` for an empty candidate list.
    pub fn pop_least_stressed<S: AsRef<str>>(&mut self, candidates: &[S]) -> Option<String> {
        for candidate in candidates {
            self.ensure(candidate.as_ref());
        }

        let chosen = candidates
            .iter()
            .map(|c| c.as_ref())
            .min_by(|a, b| {
                self.count(a)
                    .cmp(&self.count(b))
                    .then_with(|| key(a).cmp(&key(b)))
            })?
            .to_string();

        self.record(&chosen);
        Some(chosen)
    }

    /// Pop up to `n` distinct candidates, least stressed first
    pub fn pop_many<S: AsRef<str>>(&mut self, candidates: &[S], n: usize) -> Vec<String> {
        let mut pool: Vec<&str> = candidates.iter().map(|c| c.as_ref()).collect();
        let mut picked = Vec::new();

        while picked.len() < n {
            let Some(user) = self.pop_least_stressed(&pool) else {
                break;
            };
            pool.retain(|c| !c.eq_ignore_ascii_case(&user));
            picked.push(user);
        }
        picked
    }

    /// Build maintainer and reviewer trackers from open pull requests.
    ///
    /// Assignees count as maintainer work, requested reviewers as
    /// reviewer work.
    pub fn scan<'a, I>(prs: I) -> (Self, Self)
    where
        I: IntoIterator<Item = &'a PullRequest>,
    {
        let mut maintainers = Self::new();
        let mut reviewers = Self::new();
        for pr in prs {
            for assignee in &pr.assignees {
                maintainers.record(assignee);
            }
            for reviewer in &pr.requested_reviewers {
                reviewers.record(reviewer);
            }
        }
        (maintainers, reviewers)
    }
}

fn key(user: &str) -> String {
    user.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PrState;

    fn pr(assignees: &[&str], reviewers: &[&str]) -> PullRequest {
        PullRequest {
            number: 1,
            title: "t".to_string(),
            body: None,
            author: "someone".to_string(),
            state: PrState::Open,
            is_draft: false,
            mergeable: Some(true),
            labels: Vec::new(),
            assignees: assignees.iter().map(ToString::to_string).collect(),
            requested_reviewers: reviewers.iter().map(ToString::to_string).collect(),
            base_ref: "staging".to_string(),
            head_ref: "feature".to_string(),
            html_url: String::new(),
            commits: None,
        }
    }

    #[test]
    fn test_picks_least_loaded() {
        let mut tracker = WorkloadTracker::from_counts([("alice", 2), ("bob", 0)]);
        assert_eq!(tracker.pop_least_stressed(&["alice", "bob"]).as_deref(), Some("bob"));
        assert_eq!(tracker.count("bob"), 1);
        assert_eq!(tracker.count("alice"), 2);
    }

    #[test]
    fn test_ties_break_by_name() {
        let mut tracker = WorkloadTracker::new();
        assert_eq!(tracker.pop_least_stressed(&["carol", "alice", "bob"]).as_deref(), Some("alice"));
        assert_eq!(tracker.pop_least_stressed(&["carol", "alice", "bob"]).as_deref(), Some("bob"));
        assert_eq!(tracker.pop_least_stressed(&["carol", "alice", "bob"]).as_deref(), Some("carol"));
    }

    #[test]
    fn test_unknown_candidates_start_at_zero() {
        let mut tracker = WorkloadTracker::from_counts([("alice", 1)]);
        assert_eq!(tracker.pop_least_stressed(&["alice", "zed"]).as_deref(), Some("zed"));
    }

    #[test]
    fn test_empty_candidates() {
        let mut tracker = WorkloadTracker::new();
        let none: [&str; 0] = [];
        assert_eq!(tracker.pop_least_stressed(&none), None);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_counts_never_decrease() {
        let mut tracker = WorkloadTracker::from_counts([("alice", 3)]);
        let before = tracker.count("alice");
        tracker.pop_least_stressed(&["alice"]);
        assert_eq!(tracker.count("alice"), before + 1);
    }

    #[test]
    fn test_pop_many_is_distinct() {
        let mut tracker = WorkloadTracker::from_counts([("alice", 0), ("bob", 5)]);
        let picked = tracker.pop_many(&["alice", "bob"], 2);
        assert_eq!(picked, ["alice", "bob"]);

        let mut small = WorkloadTracker::new();
        assert_eq!(small.pop_many(&["alice"], 3), ["alice"]);
    }

    #[test]
    fn test_scan_counts_assignees_and_reviewers() {
        let prs = vec![pr(&["alice"], &["bob"]), pr(&["alice", "carol"], &[])];
        let (maintainers, reviewers) = WorkloadTracker::scan(&prs);

        assert_eq!(maintainers.count("alice"), 2);
        assert_eq!(maintainers.count("carol"), 1);
        assert_eq!(reviewers.count("bob"), 1);
        assert_eq!(reviewers.count("alice"), 0);
    }
}
