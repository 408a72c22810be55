//! Merge policy: configuration, defaults, and compiled form

use crate::error::{Error, Result};
use crate::types::PrState;
use regex::Regex;

/// Default pattern recognizing an approval trailer in a comment or review
pub const DEFAULT_APPROVER_PATTERN: &str = r"Approved-by: (?P<approved_by>.*>)";

/// Default pattern recognizing a review trailer in a comment or review
pub const DEFAULT_REVIEWER_PATTERN: &str = r"Reviewed-by: (?P<reviewed_by>.*>)";

/// Review states a policy may filter on, in canonical form
pub const KNOWN_REVIEW_STATES: [&str; 5] =
    ["approve", "request_changes", "comment", "dismiss", "pending"];

/// Canonical form of a PR or review state token.
///
/// `APPROVED`, `approve` and `approved` all become `approve`; the same
/// folding applies to comments, change requests and dismissals.
pub fn canonical_state(token: &str) -> String {
    let lower = token.trim().to_ascii_lowercase().replace('-', "_");
    match lower.as_str() {
        "approve" | "approved" => "approve".to_string(),
        "comment" | "commented" => "comment".to_string(),
        "request_changes" | "changes_requested" => "request_changes".to_string(),
        "dismiss" | "dismissed" => "dismiss".to_string(),
        _ => lower,
    }
}

/// Conditions a pull request must satisfy to be merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePolicy {
    /// Allowed PR states; empty means `open` only
    pub states: Vec<String>,
    /// PR states that veto the merge
    pub ignore_states: Vec<String>,
    /// At least one of these labels must be present; empty means any
    pub labels: Vec<String>,
    /// Labels that veto the merge
    pub ignore_labels: Vec<String>,
    /// Reject PRs not known to be conflict-free
    pub require_no_conflicts: bool,
    /// Reject draft PRs
    pub require_non_draft: bool,
    /// Minimum qualifying approvals
    pub min_approvals: u32,
    /// Minimum qualifying reviews
    pub min_reviews: u32,
    /// Patterns marking an approval; named groups become captures
    pub approver_comments: Vec<String>,
    /// Patterns marking a review; named groups become captures
    pub reviewer_comments: Vec<String>,
    /// Source states an approval may come from (`comment` for issue comments)
    pub approve_states: Vec<String>,
    /// Source states a review may come from; empty means any
    pub review_states: Vec<String>,
    /// Teams whose members may approve
    pub approver_teams: Vec<String>,
    /// Teams whose members may review
    pub reviewer_teams: Vec<String>,
    /// PR assignees may approve
    pub respect_assignees: bool,
    /// Requested reviewers may review
    pub respect_reviewers: bool,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            states: Vec::new(),
            ignore_states: Vec::new(),
            labels: Vec::new(),
            ignore_labels: Vec::new(),
            require_no_conflicts: false,
            require_non_draft: false,
            min_approvals: 1,
            min_reviews: 1,
            approver_comments: vec![DEFAULT_APPROVER_PATTERN.to_string()],
            reviewer_comments: vec![DEFAULT_REVIEWER_PATTERN.to_string()],
            approve_states: vec!["approve".to_string()],
            review_states: Vec::new(),
            approver_teams: Vec::new(),
            reviewer_teams: Vec::new(),
            respect_assignees: true,
            respect_reviewers: true,
        }
    }
}

impl MergePolicy {
    /// Validate the policy and compile its patterns
    pub fn compile(&self) -> Result<CompiledPolicy> {
        let states = if self.states.is_empty() {
            vec![PrState::Open]
        } else {
            parse_pr_states(&self.states)?
        };
        let ignore_states = parse_pr_states(&self.ignore_states)?;

        let approve_states = parse_review_states(&self.approve_states)?;
        let review_states = parse_review_states(&self.review_states)?;

        let approver_patterns = compile_patterns(&self.approver_comments, DEFAULT_APPROVER_PATTERN)?;
        let reviewer_patterns = compile_patterns(&self.reviewer_comments, DEFAULT_REVIEWER_PATTERN)?;

        Ok(CompiledPolicy {
            policy: self.clone(),
            states,
            ignore_states,
            approve_states,
            review_states,
            approver_patterns,
            reviewer_patterns,
        })
    }
}

fn parse_pr_states(tokens: &[String]) -> Result<Vec<PrState>> {
    tokens
        .iter()
        .map(|t| match t.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(PrState::Open),
            "closed" => Ok(PrState::Closed),
            "merged" => Ok(PrState::Merged),
            other => Err(Error::Config(format!(
                "unknown pull request state '{other}' (expected open, closed or merged)"
            ))),
        })
        .collect()
}

fn parse_review_states(tokens: &[String]) -> Result<Vec<String>> {
    tokens
        .iter()
        .map(|t| {
            let canonical = canonical_state(t);
            if KNOWN_REVIEW_STATES.contains(&canonical.as_str()) {
                Ok(canonical)
            } else {
                Err(Error::Config(format!(
                    "unknown review state '{t}' (expected one of {})",
                    KNOWN_REVIEW_STATES.join(", ")
                )))
            }
        })
        .collect()
}

fn compile_patterns(patterns: &[String], default: &str) -> Result<Vec<Regex>> {
    if patterns.is_empty() {
        return Ok(vec![Regex::new(default)?]);
    }
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| Error::Config(format!("invalid pattern '{p}': {e}")))
        })
        .collect()
}

/// A validated policy with compiled patterns
#[derive(Debug, Clone)]
pub struct CompiledPolicy {
    /// Source policy
    pub policy: MergePolicy,
    states: Vec<PrState>,
    ignore_states: Vec<PrState>,
    approve_states: Vec<String>,
    review_states: Vec<String>,
    approver_patterns: Vec<Regex>,
    reviewer_patterns: Vec<Regex>,
}

impl CompiledPolicy {
    /// Allowed PR states after defaults
    pub fn allowed_states(&self) -> &[PrState] {
        &self.states
    }

    /// Whether a PR in `state` may be merged
    pub fn state_allowed(&self, state: PrState) -> bool {
        self.states.contains(&state) && !self.ignore_states.contains(&state)
    }

    /// Whether an approval from a source in `state` counts
    pub fn approve_state_allowed(&self, state: &str) -> bool {
        let state = canonical_state(state);
        self.approve_states.contains(&state)
    }

    /// Whether a review from a source in `state` counts
    pub fn review_state_allowed(&self, state: &str) -> bool {
        let state = canonical_state(state);
        self.review_states.is_empty() || self.review_states.contains(&state)
    }

    /// Approver patterns
    pub fn approver_patterns(&self) -> &[Regex] {
        &self.approver_patterns
    }

    /// Reviewer patterns
    pub fn reviewer_patterns(&self) -> &[Regex] {
        &self.reviewer_patterns
    }
}
