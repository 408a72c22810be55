//! Assignment execution - effectful operations
//!
//! Gathers workload, CODEOWNERS and PR state from GitHub, runs the pure
//! planner, and applies the result.

use crate::assign::plan::{
    AssignOptions, AssignmentPlan, candidate_pools, candidate_teams, plan_assignment,
};
use crate::codeowners::{CODEOWNERS_PATHS, CodeOwners};
use crate::definitions::TeamSet;
use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::progress::ProgressCallback;
use crate::types::{PrRef, PrState};
use crate::workload::WorkloadTracker;
use std::path::Path;
use tracing::{debug, info};

/// Result of assigning one pull request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentOutcome {
    /// Teams considered responsible
    pub teams: Vec<String>,
    /// Chosen assignees and reviewers
    pub plan: AssignmentPlan,
    /// Whether the plan was written to GitHub
    pub applied: bool,
}

/// Load CODEOWNERS from a local checkout, or fetch it from the repository
pub async fn load_codeowners(
    platform: &dyn PlatformService,
    pr: &PrRef,
    checkout: Option<&Path>,
) -> Result<Option<CodeOwners>> {
    if let Some(root) = checkout {
        debug!(root = %root.display(), "reading CODEOWNERS from checkout");
        return CodeOwners::from_checkout(root);
    }

    for path in CODEOWNERS_PATHS {
        if let Some(content) = platform.fetch_file(&pr.org, &pr.repo, path).await? {
            debug!(path, "fetched CODEOWNERS");
            return CodeOwners::parse(&content).map(Some);
        }
    }
    debug!(repo = %pr.repo_slug(), "repository has no CODEOWNERS");
    Ok(None)
}

/// Build maintainer and reviewer workload from the repository's open PRs.
///
/// Every maintainer and reviewer defined in `teams` starts at zero.
pub async fn gather_workload(
    platform: &dyn PlatformService,
    teams: &TeamSet,
    org: &str,
    repo: &str,
) -> Result<(WorkloadTracker, WorkloadTracker)> {
    let open = platform.list_open_prs(org, repo).await?;
    let (mut maintainers, mut reviewers) = WorkloadTracker::scan(&open);

    for team in teams.iter() {
        for login in team.maintainer_logins() {
            maintainers.ensure(&login);
        }
        for login in team.reviewer_logins() {
            reviewers.ensure(&login);
        }
    }

    info!(
        repo,
        open_prs = open.len(),
        maintainers = maintainers.len(),
        reviewers = reviewers.len(),
        "computed workload"
    );
    Ok((maintainers, reviewers))
}

/// Apply an assignment plan, unless `dry_run`
pub async fn execute_assignment(
    platform: &dyn PlatformService,
    pr: &PrRef,
    plan: &AssignmentPlan,
    dry_run: bool,
) -> Result<bool> {
    if dry_run {
        info!(%pr, %plan, "dry run, not assigning");
        return Ok(false);
    }

    if !plan.assignees.is_empty() {
        debug!(%pr, assignees = ?plan.assignees, "adding assignees");
        platform.add_assignees(pr, &plan.assignees).await?;
    }
    if !plan.reviewers.is_empty() {
        debug!(%pr, reviewers = ?plan.reviewers, "requesting reviews");
        platform.request_reviewers(pr, &plan.reviewers).await?;
    }
    Ok(!plan.is_empty())
}

/// Assign maintainers and reviewers to a pull request.
///
/// The PR must be open. Candidates come from the teams owning the
/// repository and the teams CODEOWNERS names for the changed files.
pub async fn assign_pr(
    platform: &dyn PlatformService,
    teams: &TeamSet,
    pr_ref: &PrRef,
    codeowners: Option<&CodeOwners>,
    options: AssignOptions,
    dry_run: bool,
    progress: &dyn ProgressCallback,
) -> Result<AssignmentOutcome> {
    // =========================================================================
    // Phase 1: GATHER
    // =========================================================================

    let pr = platform.get_pr(pr_ref).await?;
    if pr.state != PrState::Open {
        return Err(Error::PrNotOpen(pr_ref.to_string()));
    }

    progress
        .on_message(&format!("Computing workload for {}", pr_ref.repo_slug()))
        .await;
    let (mut maintainers, mut reviewers) =
        gather_workload(platform, teams, &pr_ref.org, &pr_ref.repo).await?;

    let files = platform.list_changed_files(pr_ref).await?;
    let has_reviews = !platform.list_pr_reviews(pr_ref).await?.is_empty();

    // =========================================================================
    // Phase 2: PLAN
    // =========================================================================

    let responsible = candidate_teams(teams, &pr_ref.repo, codeowners, &files);
    let pools = candidate_pools(&responsible, &pr.author);
    debug!(
        teams = responsible.len(),
        maintainers = ?pools.maintainers,
        reviewers = ?pools.reviewers,
        "candidate pools"
    );

    let plan = plan_assignment(
        &pr,
        has_reviews,
        &pools,
        &mut maintainers,
        &mut reviewers,
        options,
    )?;
    info!(pr = %pr_ref, %plan, "planned assignment");

    // =========================================================================
    // Phase 3: EXECUTE
    // =========================================================================

    let applied = execute_assignment(platform, pr_ref, &plan, dry_run).await?;
    if applied {
        progress.on_message(&format!("Updated {pr_ref}: {plan}")).await;
    }

    Ok(AssignmentOutcome {
        teams: responsible.iter().map(|t| t.full_name()).collect(),
        plan,
        applied,
    })
}
