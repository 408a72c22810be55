//! Merge planning - pure functions for creating merge plans
//!
//! No I/O happens here: the evaluation, the PR's patches and the options
//! are passed in, and the result is an ordered list of git/gh steps.

use crate::mergeable::MergeEvaluation;
use crate::patch::{Patch, referenced_issues, trailers_from_captures};
use crate::types::PrRef;
use std::fmt;

/// Trailer added when merging from a GitHub Actions run
pub const ACTIONS_TESTED_BY: &str = "Tested-by: GitHub Actions <monkey+github-actions@unikraft.io>";

/// Label that requests a merge
pub const MERGE_LABEL: &str = "merge";

/// Label set once a PR was merged
pub const MERGED_LABEL: &str = "ci/merged";

/// A single step in the merge plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeStep {
    /// Set a repository-local git config value (committer identity)
    Configure {
        /// Config key, e.g. `user.name`
        key: String,
        /// Value
        value: String,
    },
    /// Check out a local branch
    Checkout {
        /// Branch name
        branch: String,
    },
    /// Create the temporary branch at the base and switch to it
    CreateTempBranch {
        /// Temporary branch name, `<base>-<N>`
        branch: String,
    },
    /// Push the temporary branch
    PushTempBranch {
        /// Temporary branch name
        branch: String,
    },
    /// Point the PR at the temporary branch
    RetargetPr {
        /// PR number
        number: u64,
        /// New base branch
        base: String,
    },
    /// Rebase-merge the PR on GitHub
    RebaseMerge {
        /// PR number
        number: u64,
        /// Branch merged into
        into: String,
    },
    /// Apply one generated patch with `git am --3way`
    ApplyPatch {
        /// Patch title (for display)
        title: String,
        /// Mailbox text including the merge trailers
        mbox: String,
    },
    /// Push the base branch
    PushBase {
        /// Base branch name
        branch: String,
    },
    /// Swap the merge request label for the merged label
    Relabel {
        /// PR number
        number: u64,
        /// Label removed
        remove: String,
        /// Label added
        add: String,
    },
    /// Close an issue referenced by the PR or its commits
    CloseIssue {
        /// Issue number
        issue: u64,
        /// PR that closed it
        pr: u64,
    },
    /// Remove the temporary branch from the remote
    DeleteTempBranch {
        /// Temporary branch name
        branch: String,
    },
}

impl MergeStep {
    /// Whether the step changes anything outside the local clone
    pub const fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::PushTempBranch { .. }
                | Self::RetargetPr { .. }
                | Self::RebaseMerge { .. }
                | Self::PushBase { .. }
                | Self::Relabel { .. }
                | Self::CloseIssue { .. }
                | Self::DeleteTempBranch { .. }
        )
    }

    /// Whether a failure is only logged instead of aborting the merge
    pub const fn is_best_effort(&self) -> bool {
        matches!(
            self,
            Self::Relabel { .. } | Self::CloseIssue { .. } | Self::DeleteTempBranch { .. }
        )
    }
}

impl fmt::Display for MergeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configure { key, value } => write!(f, "set {key} to {value}"),
            Self::Checkout { branch } => write!(f, "check out {branch}"),
            Self::CreateTempBranch { branch } => write!(f, "create branch {branch}"),
            Self::PushTempBranch { branch } => write!(f, "push branch {branch}"),
            Self::RetargetPr { number, base } => write!(f, "retarget PR #{number} to {base}"),
            Self::RebaseMerge { number, into } => {
                write!(f, "rebase-merge PR #{number} into {into}")
            }
            Self::ApplyPatch { title, .. } => write!(f, "apply patch: {title}"),
            Self::PushBase { branch } => write!(f, "push {branch}"),
            Self::Relabel {
                number,
                remove,
                add,
            } => write!(f, "relabel PR #{number}: {remove} -> {add}"),
            Self::CloseIssue { issue, pr } => write!(f, "close issue #{issue} (merged in #{pr})"),
            Self::DeleteTempBranch { branch } => write!(f, "delete remote branch {branch}"),
        }
    }
}

/// Options for merge planning
#[derive(Debug, Clone, Default)]
pub struct MergePlanOptions {
    /// Branch the PR lands on; the PR's own base when `None`
    pub base: Option<String>,
    /// Extra trailers appended to every commit
    pub trailers: Vec<String>,
    /// Do not turn evaluator captures into trailers
    pub no_auto_trailers: bool,
    /// Push the base branch, relabel and close issues afterwards
    pub push: bool,
    /// Committer name written to the clone's config
    pub committer_name: Option<String>,
    /// Committer email written to the clone's config
    pub committer_email: Option<String>,
    /// Running inside GitHub Actions
    pub under_actions: bool,
}

/// Merge plan - the functional core output
///
/// Created by [`create_merge_plan`] (pure) and run by
/// [`execute_merge`](super::execute_merge) (effectful).
#[derive(Debug, Clone)]
pub struct MergePlan {
    /// PR being merged
    pub pr: PrRef,
    /// Branch the patches land on
    pub base: String,
    /// Temporary branch, `<base>-<N>`
    pub temp_branch: String,
    /// Trailers appended to every patch
    pub trailers: Vec<String>,
    /// Issues closed after the push
    pub issues: Vec<u64>,
    /// Ordered steps
    pub steps: Vec<MergeStep>,
}

impl MergePlan {
    /// Number of patches applied
    #[must_use]
    pub fn patch_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, MergeStep::ApplyPatch { .. }))
            .count()
    }

    /// Steps that touch the remote
    pub fn remote_steps(&self) -> impl Iterator<Item = &MergeStep> {
        self.steps.iter().filter(|s| s.is_remote())
    }
}

/// Trailers appended to each merged commit, in order:
/// evaluator captures, user trailers, `GitHub-Closes`, and `Tested-by` under Actions
pub fn merge_trailers(
    pr: &PrRef,
    evaluation: Option<&MergeEvaluation>,
    options: &MergePlanOptions,
) -> Vec<String> {
    let mut trailers: Vec<String> = Vec::new();
    let mut push = |t: String| {
        if !trailers.contains(&t) {
            trailers.push(t);
        }
    };

    if !options.no_auto_trailers
        && let Some(evaluation) = evaluation
    {
        trailers_from_captures(&evaluation.captures)
            .into_iter()
            .for_each(&mut push);
    }
    options.trailers.iter().cloned().for_each(&mut push);
    push(format!("GitHub-Closes: #{}", pr.number));
    if options.under_actions {
        push(ACTIONS_TESTED_BY.to_string());
    }

    trailers
}

/// Create a merge plan (PURE - no I/O, easily testable)
///
/// `patches` are the PR's commits rebased onto the base, oldest first.
/// Issues referenced from `pr_body` or any commit message are closed once
/// the base was pushed.
#[must_use]
pub fn create_merge_plan(
    pr: &PrRef,
    pr_base: &str,
    pr_body: Option<&str>,
    patches: &[Patch],
    evaluation: Option<&MergeEvaluation>,
    options: &MergePlanOptions,
) -> MergePlan {
    let base = options.base.clone().unwrap_or_else(|| pr_base.to_string());
    let temp_branch = format!("{base}-{}", pr.number);
    let trailers = merge_trailers(pr, evaluation, options);

    let mut issues = referenced_issues(pr_body.unwrap_or_default());
    for patch in patches {
        for issue in referenced_issues(&patch.message) {
            if !issues.contains(&issue) {
                issues.push(issue);
            }
        }
    }

    let mut steps = Vec::new();

    if let Some(name) = &options.committer_name {
        steps.push(MergeStep::Configure {
            key: "user.name".to_string(),
            value: name.clone(),
        });
    }
    if let Some(email) = &options.committer_email {
        steps.push(MergeStep::Configure {
            key: "user.email".to_string(),
            value: email.clone(),
        });
    }

    steps.push(MergeStep::Checkout {
        branch: base.clone(),
    });
    steps.push(MergeStep::CreateTempBranch {
        branch: temp_branch.clone(),
    });
    steps.push(MergeStep::PushTempBranch {
        branch: temp_branch.clone(),
    });
    steps.push(MergeStep::RetargetPr {
        number: pr.number,
        base: temp_branch.clone(),
    });
    steps.push(MergeStep::RebaseMerge {
        number: pr.number,
        into: temp_branch.clone(),
    });
    steps.push(MergeStep::Checkout {
        branch: base.clone(),
    });

    for patch in patches {
        let mut patch = patch.clone();
        patch.add_trailers(&trailers);
        steps.push(MergeStep::ApplyPatch {
            title: patch.title.clone(),
            mbox: patch.to_mbox(),
        });
    }

    if options.push {
        steps.push(MergeStep::PushBase {
            branch: base.clone(),
        });
        steps.push(MergeStep::Relabel {
            number: pr.number,
            remove: MERGE_LABEL.to_string(),
            add: MERGED_LABEL.to_string(),
        });
        steps.extend(issues.iter().map(|&issue| MergeStep::CloseIssue {
            issue,
            pr: pr.number,
        }));
    }

    steps.push(MergeStep::DeleteTempBranch {
        branch: temp_branch.clone(),
    });

    MergePlan {
        pr: pr.clone(),
        base,
        temp_branch,
        trailers,
        issues,
        steps,
    }
}
