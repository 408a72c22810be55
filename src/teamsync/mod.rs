//! Team synchronization
//!
//! Pushes team definitions to GitHub:
//! - `sig-net` is upserted under its full name, linked to its parent
//! - direct membership is reconciled (removals first, then additions)
//! - `maintainers-net` and `reviewers-net` sub-teams are upserted under it

pub mod execute;
pub mod plan;

pub use execute::{SyncReport, TeamChange, TeamSyncOutcome, TeamSyncer};
pub use plan::{MembershipDelta, plan_membership, sync_order};
