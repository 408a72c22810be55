//! Pull-request assignment
//!
//! Picks the least-loaded maintainers and reviewers of the responsible
//! teams. Planning is pure ([`plan_assignment`]); [`assign_pr`] gathers
//! the inputs and applies the plan.

pub mod execute;
pub mod plan;

pub use execute::{
    AssignmentOutcome, assign_pr, execute_assignment, gather_workload, load_codeowners,
};
pub use plan::{
    AssignOptions, AssignmentPlan, CandidatePools, candidate_pools, candidate_teams,
    plan_assignment,
};
