//! Mergeability evaluation
//!
//! A [`MergePolicy`] is compiled once into a [`CompiledPolicy`], then
//! [`evaluate`] checks a pull request and its comments and reviews against
//! it. Team membership is resolved through [`TeamMembership`].

mod evaluate;
mod membership;
mod policy;

pub use evaluate::{Captures, MergeEvaluation, Rejection, Verdict, evaluate, evaluate_pr, precheck};
pub use membership::{CachedMembership, TeamMembership};
pub use policy::{
    CompiledPolicy, DEFAULT_APPROVER_PATTERN, DEFAULT_REVIEWER_PATTERN, KNOWN_REVIEW_STATES,
    MergePolicy, canonical_state,
};
