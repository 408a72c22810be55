//! Merge execution - effectful operations
//!
//! Runs a [`MergePlan`] through git and gh. Remote steps are skipped on a
//! dry run; best-effort steps only warn when they fail.

use crate::error::Result;
use crate::git::{CommandRunner, CommandSpec, Git};
use crate::merge::plan::{MergePlan, MergeStep};
use crate::progress::ProgressCallback;
use tracing::{info, warn};

/// Remote the clone pushes to
pub const REMOTE: &str = "origin";

/// Result of merge execution
#[derive(Debug, Clone, Default)]
pub struct MergeExecutionResult {
    /// Steps that ran successfully
    pub completed: Vec<String>,
    /// Remote steps skipped by a dry run
    pub skipped: Vec<String>,
    /// Best-effort steps that failed, with the error
    pub warnings: Vec<String>,
}

impl MergeExecutionResult {
    /// Check if every step ran without warnings
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.warnings.is_empty()
    }
}

/// Authenticated `gh` invocations against one repository
pub struct Gh<'a> {
    runner: &'a dyn CommandRunner,
    repo: String,
    cwd: std::path::PathBuf,
    token: Option<&'a str>,
}

impl<'a> Gh<'a> {
    /// `gh` targeting `repo` (`org/name`), run inside `cwd`
    pub fn new(
        runner: &'a dyn CommandRunner,
        repo: impl Into<String>,
        cwd: impl Into<std::path::PathBuf>,
        token: Option<&'a str>,
    ) -> Self {
        Self {
            runner,
            repo: repo.into(),
            cwd: cwd.into(),
            token,
        }
    }

    /// `gh <args> -R <repo>` with the token passed as `GH_TOKEN`
    pub fn command<I, S>(&self, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut command = CommandSpec::new("gh")
            .args(args)
            .args(["-R", self.repo.as_str()])
            .cwd(&self.cwd);
        if let Some(token) = self.token {
            command = command.env("GH_TOKEN", token).redact(token);
        }
        command
    }

    async fn run(&self, args: Vec<String>) -> Result<()> {
        self.runner.run_checked(&self.command(args)).await.map(drop)
    }
}

async fn run_step(step: &MergeStep, git: &Git<'_>, gh: &Gh<'_>) -> Result<()> {
    match step {
        MergeStep::Configure { key, value } => git.config(key, value).await,
        MergeStep::Checkout { branch } => git.checkout(branch).await,
        MergeStep::CreateTempBranch { branch } => git.checkout_new_branch(branch).await,
        MergeStep::PushTempBranch { branch } | MergeStep::PushBase { branch } => {
            git.push(REMOTE, branch).await
        }
        MergeStep::RetargetPr { number, base } => {
            gh.run(vec![
                "pr".into(),
                "edit".into(),
                number.to_string(),
                "--base".into(),
                base.clone(),
            ])
            .await
        }
        MergeStep::RebaseMerge { number, .. } => {
            gh.run(vec![
                "pr".into(),
                "merge".into(),
                number.to_string(),
                "--rebase".into(),
            ])
            .await
        }
        MergeStep::ApplyPatch { mbox, .. } => git.am(mbox).await,
        MergeStep::Relabel {
            number,
            remove,
            add,
        } => {
            gh.run(vec![
                "pr".into(),
                "edit".into(),
                number.to_string(),
                "--remove-label".into(),
                remove.clone(),
                "--add-label".into(),
                add.clone(),
            ])
            .await
        }
        MergeStep::CloseIssue { issue, pr } => {
            gh.run(vec![
                "issue".into(),
                "close".into(),
                issue.to_string(),
                "--reason".into(),
                "completed".into(),
                "--comment".into(),
                format!("This issue was closed by PR number #{pr} which was merged successfully."),
            ])
            .await
        }
        MergeStep::DeleteTempBranch { branch } => git.delete_remote_branch(REMOTE, branch).await,
    }
}

/// Execute the merge plan (EFFECTFUL)
///
/// Stops at the first failing step that is not best-effort. The temporary
/// branch is then left on the remote for inspection.
pub async fn execute_merge(
    plan: &MergePlan,
    git: &Git<'_>,
    gh: &Gh<'_>,
    dry_run: bool,
    progress: &dyn ProgressCallback,
) -> Result<MergeExecutionResult> {
    let mut result = MergeExecutionResult::default();

    for step in &plan.steps {
        let label = step.to_string();

        if dry_run && step.is_remote() {
            progress.on_message(&format!("would {label}")).await;
            result.skipped.push(label);
            continue;
        }

        progress.on_message(&label).await;
        match run_step(step, git, gh).await {
            Ok(()) => {
                info!(pr = %plan.pr, step = %label, "done");
                result.completed.push(label);
            }
            Err(e) if step.is_best_effort() => {
                warn!(pr = %plan.pr, step = %label, error = %e, "step failed, continuing");
                progress
                    .on_warning(&format!("could not {label}: {e}"))
                    .await;
                result.warnings.push(format!("{label}: {e}"));
            }
            Err(e) => {
                warn!(pr = %plan.pr, branch = %plan.temp_branch, "errors detected, keeping remote branch");
                return Err(e);
            }
        }
    }

    Ok(result)
}
