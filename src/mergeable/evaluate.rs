//! Mergeability evaluation - decides whether a PR satisfies a policy
//!
//! Policy failures are values ([`Verdict::Rejected`]), never errors. Only
//! collaborator failures (membership lookups) surface as `Err`.

use crate::error::Result;
use crate::mergeable::membership::{CachedMembership, TeamMembership};
use crate::mergeable::policy::CompiledPolicy;
use crate::platform::PlatformService;
use crate::types::{PrComment, PrRef, PrReview, PrState, PullRequest};
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Implied state of an issue comment, for the approve/review state filters
const COMMENT_STATE: &str = "comment";

/// Named captures extracted from approval and review trailers
pub type Captures = BTreeMap<String, Vec<String>>;

/// Why a pull request cannot be merged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// PR state is not allowed, or is ignored
    State {
        /// Current state
        state: PrState,
        /// States the policy allows
        allowed: Vec<PrState>,
    },
    /// None of the required labels is present
    MissingLabels {
        /// Labels the policy asks for
        wanted: Vec<String>,
    },
    /// A vetoing label is present
    IgnoredLabel(String),
    /// PR has merge conflicts
    Conflicts,
    /// GitHub has not finished computing mergeability
    MergeabilityUnknown,
    /// PR is a draft
    Draft,
    /// Not enough qualifying approvals or reviews
    InsufficientApprovals {
        /// Qualifying approvals found
        approvals: u32,
        /// Required approvals
        min_approvals: u32,
        /// Qualifying reviews found
        reviews: u32,
        /// Required reviews
        min_reviews: u32,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State { state, allowed } => {
                let allowed: Vec<&str> = allowed.iter().map(|s| s.as_str()).collect();
                write!(
                    f,
                    "pull request is {state}, expected one of: {}",
                    allowed.join(", ")
                )
            }
            Self::MissingLabels { wanted } => write!(
                f,
                "pull request does not have any of the requested labels: {}",
                wanted.join(", ")
            ),
            Self::IgnoredLabel(label) => write!(f, "pull request has ignored label '{label}'"),
            Self::Conflicts => f.write_str("pull request has conflicts"),
            Self::MergeabilityUnknown => {
                f.write_str("pull request mergeability is still being computed")
            }
            Self::Draft => f.write_str("pull request is a draft"),
            Self::InsufficientApprovals {
                approvals,
                min_approvals,
                reviews,
                min_reviews,
            } => write!(
                f,
                "pull request does not meet the minimum number approvers ({approvals}/{min_approvals}) and reviewers ({reviews}/{min_reviews})"
            ),
        }
    }
}

/// Outcome of an evaluation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// All conditions hold
    Mergeable,
    /// A condition failed
    Rejected(Rejection),
}

/// Full evaluation result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeEvaluation {
    /// Verdict
    #[serde(skip)]
    pub verdict: Verdict,
    /// Qualifying approvals counted
    pub approvals: u32,
    /// Qualifying reviews counted
    pub reviews: u32,
    /// Captured trailer values, keyed by group name
    pub captures: Captures,
}

impl MergeEvaluation {
    fn rejected(rejection: Rejection) -> Self {
        Self {
            verdict: Verdict::Rejected(rejection),
            approvals: 0,
            reviews: 0,
            captures: Captures::new(),
        }
    }

    /// Whether the PR may be merged
    pub const fn is_mergeable(&self) -> bool {
        matches!(self.verdict, Verdict::Mergeable)
    }

    /// Rejection reason, if any
    pub fn reason(&self) -> Option<String> {
        match &self.verdict {
            Verdict::Mergeable => None,
            Verdict::Rejected(r) => Some(r.to_string()),
        }
    }
}

/// Check PR state, labels, conflicts and draft status
pub fn precheck(pr: &PullRequest, policy: &CompiledPolicy) -> Option<Rejection> {
    let settings = &policy.policy;

    if !policy.state_allowed(pr.state) {
        return Some(Rejection::State {
            state: pr.state,
            allowed: policy.allowed_states().to_vec(),
        });
    }

    if !settings.labels.is_empty() && !settings.labels.iter().any(|l| pr.has_label(l)) {
        return Some(Rejection::MissingLabels {
            wanted: settings.labels.clone(),
        });
    }

    if let Some(label) = settings.ignore_labels.iter().find(|l| pr.has_label(l)) {
        return Some(Rejection::IgnoredLabel(label.clone()));
    }

    if settings.require_no_conflicts {
        match pr.mergeable {
            Some(true) => {}
            Some(false) => return Some(Rejection::Conflicts),
            None => return Some(Rejection::MergeabilityUnknown),
        }
    }

    if settings.require_non_draft && pr.is_draft {
        return Some(Rejection::Draft);
    }

    None
}

/// Collect named captures of every pattern match in `body`.
///
/// Returns `None` when no pattern matches.
fn match_patterns(patterns: &[Regex], body: &str) -> Option<Captures> {
    let mut found = Captures::new();
    let mut matched = false;

    for pattern in patterns {
        for caps in pattern.captures_iter(body) {
            matched = true;
            for name in pattern.capture_names().flatten() {
                if let Some(value) = caps.name(name) {
                    found
                        .entry(name.to_string())
                        .or_default()
                        .push(value.as_str().trim().to_string());
                }
            }
        }
    }

    matched.then_some(found)
}

fn merge_captures(into: &mut Captures, from: Captures) {
    for (name, values) in from {
        let slot = into.entry(name).or_default();
        for value in values {
            if !slot.contains(&value) {
                slot.push(value);
            }
        }
    }
}

async fn is_approver(
    pr: &PullRequest,
    author: &str,
    policy: &CompiledPolicy,
    membership: &dyn TeamMembership,
) -> Result<bool> {
    if policy.policy.respect_assignees && pr.is_assignee(author) {
        return Ok(true);
    }
    for team in &policy.policy.approver_teams {
        if membership.is_member(author, team).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

async fn is_reviewer(
    pr: &PullRequest,
    author: &str,
    policy: &CompiledPolicy,
    membership: &dyn TeamMembership,
) -> Result<bool> {
    let settings = &policy.policy;
    if settings.respect_reviewers
        && (settings.reviewer_teams.is_empty() || pr.is_requested_reviewer(author))
    {
        return Ok(true);
    }
    for team in &settings.reviewer_teams {
        if membership.is_member(author, team).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Evaluate a PR against a policy.
///
/// Comments count with the implied state `comment`, reviews with their own
/// state. Each comment or review counts at most once as approval and once
/// as review, whatever the number of captures it yields.
pub async fn evaluate(
    pr: &PullRequest,
    comments: &[PrComment],
    reviews: &[PrReview],
    policy: &CompiledPolicy,
    membership: &dyn TeamMembership,
) -> Result<MergeEvaluation> {
    if let Some(rejection) = precheck(pr, policy) {
        debug!(pr = pr.number, %rejection, "precheck failed");
        return Ok(MergeEvaluation::rejected(rejection));
    }

    let sources = comments
        .iter()
        .map(|c| (c.author.as_str(), c.body.as_str(), COMMENT_STATE))
        .chain(
            reviews
                .iter()
                .map(|r| (r.author.as_str(), r.body.as_str(), r.state.as_str())),
        );

    let mut approvals = 0;
    let mut review_count = 0;
    let mut captures = Captures::new();

    for (author, body, state) in sources {
        if let Some(found) = match_patterns(policy.approver_patterns(), body)
            && policy.approve_state_allowed(state)
            && is_approver(pr, author, policy, membership).await?
        {
            debug!(author, state, "counted approval");
            merge_captures(&mut captures, found);
            approvals += 1;
        }

        if let Some(found) = match_patterns(policy.reviewer_patterns(), body)
            && policy.review_state_allowed(state)
            && is_reviewer(pr, author, policy, membership).await?
        {
            debug!(author, state, "counted review");
            merge_captures(&mut captures, found);
            review_count += 1;
        }
    }

    let settings = &policy.policy;
    let verdict = if approvals >= settings.min_approvals && review_count >= settings.min_reviews {
        Verdict::Mergeable
    } else {
        Verdict::Rejected(Rejection::InsufficientApprovals {
            approvals,
            min_approvals: settings.min_approvals,
            reviews: review_count,
            min_reviews: settings.min_reviews,
        })
    };

    debug!(pr = pr.number, approvals, reviews = review_count, ?verdict, "evaluated");
    Ok(MergeEvaluation {
        verdict,
        approvals,
        reviews: review_count,
        captures,
    })
}

/// Fetch a PR with its comments and reviews and evaluate it.
///
/// Team membership is resolved in the PR's organization and cached for
/// this call.
pub async fn evaluate_pr(
    platform: &dyn PlatformService,
    pr_ref: &PrRef,
    policy: &CompiledPolicy,
) -> Result<(PullRequest, MergeEvaluation)> {
    let pr = platform.get_pr(pr_ref).await?;
    if let Some(rejection) = precheck(&pr, policy) {
        debug!(pr = %pr_ref, %rejection, "precheck failed");
        return Ok((pr, MergeEvaluation::rejected(rejection)));
    }

    let comments = platform.list_pr_comments(pr_ref).await?;
    let reviews = platform.list_pr_reviews(pr_ref).await?;
    debug!(pr = %pr_ref, comments = comments.len(), reviews = reviews.len(), "gathered feedback");

    let membership = CachedMembership::new(platform, &pr_ref.org);
    let evaluation = evaluate(&pr, &comments, &reviews, policy, &membership).await?;
    Ok((pr, evaluation))
}
