//! Merge engine for approved pull requests
//!
//! Three-phase pattern shared with team sync and assignment:
//! 1. Gather - evaluate the PR and collect its patches (effectful)
//! 2. Plan - create `MergePlan` (pure, testable)
//! 3. Execute - run git and gh (effectful)

mod execute;
mod plan;

pub use execute::{Gh, MergeExecutionResult, REMOTE, execute_merge};
pub use plan::{
    ACTIONS_TESTED_BY, MERGE_LABEL, MERGED_LABEL, MergePlan, MergePlanOptions, MergeStep,
    create_merge_plan, merge_trailers,
};
