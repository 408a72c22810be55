//! `pr check mergeable` and `pr check patch`

use crate::cli::context::{CommandContext, resolve_pr_ref};
use crate::cli::style::{Stylize, check, cross, link};
use anstream::{print, println};
use clap::Args;
use governance::checkout::{CheckoutOptions, PrCheckout};
use governance::checkpatch::{Checkpatch, Note, Summary};
use governance::config::actions_workspace;
use governance::error::{Error, Result};
use governance::mergeable::{MergeEvaluation, MergePolicy, evaluate_pr};
use governance::output::{OutputFormat, Table};
use governance::types::PrRef;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Merge policy flags shared by `pr check mergeable` and `pr merge`
#[derive(Debug, Clone, Default, Args)]
pub struct PolicyArgs {
    /// Regular expression an approver writes; named groups become trailers
    #[arg(long, env = "GOVERN_APPROVER_COMMENTS", value_delimiter = ',')]
    pub approver_comments: Vec<String>,
    /// Teams whose members count as approvers
    #[arg(long, env = "GOVERN_APPROVER_TEAMS", value_delimiter = ',')]
    pub approver_teams: Vec<String>,
    /// Review states an approval may come from (`comment` for plain comments)
    #[arg(long, env = "GOVERN_APPROVE_STATES", value_delimiter = ',')]
    pub approve_states: Vec<String>,
    /// Reject the PR if it has any of these labels
    #[arg(long, env = "GOVERN_IGNORE_LABELS", value_delimiter = ',')]
    pub ignore_labels: Vec<String>,
    /// Reject the PR if it is in any of these states
    #[arg(long, env = "GOVERN_IGNORE_STATES", value_delimiter = ',')]
    pub ignore_states: Vec<String>,
    /// The PR must have one of these labels
    #[arg(long, env = "GOVERN_LABELS", value_delimiter = ',')]
    pub labels: Vec<String>,
    /// Minimum number of approvals
    #[arg(long, env = "GOVERN_MIN_APPROVALS", default_value_t = 1)]
    pub min_approvals: u32,
    /// Minimum number of reviews
    #[arg(long, env = "GOVERN_MIN_REVIEWS", default_value_t = 1)]
    pub min_reviews: u32,
    /// The PR must not have conflicts
    #[arg(long, env = "GOVERN_NO_CONFLICTS")]
    pub no_conflicts: bool,
    /// The PR must not be a draft
    #[arg(long, env = "GOVERN_NO_DRAFT")]
    pub no_draft: bool,
    /// Do not count assignees as approvers
    #[arg(long, env = "GOVERN_NO_RESPECT_ASSIGNEES")]
    pub no_respect_assignees: bool,
    /// Do not count requested reviewers as reviewers
    #[arg(long, env = "GOVERN_NO_RESPECT_REVIEWERS")]
    pub no_respect_reviewers: bool,
    /// Regular expression a reviewer writes; named groups become trailers
    #[arg(long, env = "GOVERN_REVIEWER_COMMENTS", value_delimiter = ',')]
    pub reviewer_comments: Vec<String>,
    /// Teams whose members count as reviewers
    #[arg(long, env = "GOVERN_REVIEWER_TEAMS", value_delimiter = ',')]
    pub reviewer_teams: Vec<String>,
    /// Review states a review may come from
    #[arg(long, env = "GOVERN_REVIEW_STATES", value_delimiter = ',')]
    pub review_states: Vec<String>,
    /// Allowed PR states (default: open)
    #[arg(long, env = "GOVERN_STATES", value_delimiter = ',')]
    pub states: Vec<String>,
}

impl PolicyArgs {
    /// Policy with unset lists falling back to the defaults
    pub fn to_policy(&self) -> MergePolicy {
        let defaults = MergePolicy::default();
        let or_default = |value: &[String], default: Vec<String>| {
            if value.is_empty() {
                default
            } else {
                value.to_vec()
            }
        };

        MergePolicy {
            states: self.states.clone(),
            ignore_states: self.ignore_states.clone(),
            labels: self.labels.clone(),
            ignore_labels: self.ignore_labels.clone(),
            require_no_conflicts: self.no_conflicts,
            require_non_draft: self.no_draft,
            min_approvals: self.min_approvals,
            min_reviews: self.min_reviews,
            approver_comments: or_default(&self.approver_comments, defaults.approver_comments),
            reviewer_comments: or_default(&self.reviewer_comments, defaults.reviewer_comments),
            approve_states: or_default(&self.approve_states, defaults.approve_states),
            review_states: self.review_states.clone(),
            approver_teams: self.approver_teams.clone(),
            reviewer_teams: self.reviewer_teams.clone(),
            respect_assignees: !self.no_respect_assignees,
            respect_reviewers: !self.no_respect_reviewers,
        }
    }
}

#[derive(Serialize)]
struct MergeReport<'a> {
    pr: String,
    mergeable: bool,
    reason: Option<String>,
    #[serde(flatten)]
    evaluation: &'a MergeEvaluation,
}

fn captures_table(evaluation: &MergeEvaluation) -> Table {
    let mut table = Table::new(["TRAILER", "VALUE"]);
    for (group, values) in &evaluation.captures {
        for value in values {
            table.push([group.as_str(), value.as_str()]);
        }
    }
    table
}

/// Run `pr check mergeable`
pub async fn run_check_mergeable(
    ctx: &CommandContext,
    policy: &MergePolicy,
    output: OutputFormat,
    args: &[String],
) -> Result<()> {
    let pr_ref = resolve_pr_ref(args)?;
    let compiled = policy.compile()?;
    let (pr, evaluation) = evaluate_pr(ctx.platform.as_ref(), &pr_ref, &compiled).await?;

    match output {
        OutputFormat::Json | OutputFormat::Yaml => {
            let report = MergeReport {
                pr: pr_ref.to_string(),
                mergeable: evaluation.is_mergeable(),
                reason: evaluation.reason(),
                evaluation: &evaluation,
            };
            let rendered = if output == OutputFormat::Json {
                serde_json::to_string_pretty(&report)? + "\n"
            } else {
                serde_yaml::to_string(&report)?
            };
            print!("{rendered}");
        }
        OutputFormat::Table | OutputFormat::Html => {
            let title = link(&pr_ref.to_string(), &pr.html_url);
            if evaluation.is_mergeable() {
                println!("{} {} is mergeable", check(), title.accent());
            } else {
                println!("{} {} is not mergeable", cross(), title.accent());
            }
            println!(
                "  {} {}/{}  {} {}/{}",
                "approvals:".muted(),
                evaluation.approvals,
                policy.min_approvals,
                "reviews:".muted(),
                evaluation.reviews,
                policy.min_reviews
            );
            let table = captures_table(&evaluation);
            if !table.is_empty() {
                println!();
                print!("{}", table.render(output)?);
            }
        }
    }

    match evaluation.reason() {
        Some(reason) => Err(Error::NotMergeable(reason)),
        None => Ok(()),
    }
}

/// Options for `pr check patch`
#[derive(Debug, Clone, Default, Args)]
pub struct PatchArgs {
    /// Use an existing checkpatch.pl script
    #[arg(long, env = "GOVERN_CHECKPATCH_SCRIPT")]
    pub checkpatch_script: Option<PathBuf>,
    /// Use an existing checkpatch configuration file
    #[arg(long, env = "GOVERN_CHECKPATCH_CONF")]
    pub checkpatch_conf: Option<PathBuf>,
    /// Branch the PR is rebased onto (default: the PR's base)
    #[arg(long, env = "GOVERN_BASE_BRANCH")]
    pub base: Option<String>,
}

/// Checkout options for a PR, reusing `GITHUB_WORKSPACE` under Actions
pub fn checkout_options(ctx: &CommandContext, workdir: &Path, base: Option<String>) -> CheckoutOptions {
    CheckoutOptions {
        workdir: workdir.to_path_buf(),
        existing: actions_workspace(),
        base,
        user: ctx.config.user.clone(),
        token: Some(ctx.token.clone()),
    }
}

fn place_config(checkout: &Path, conf: Option<&Path>) -> Result<()> {
    let target = checkout.join(".checkpatch.conf");
    if let Some(conf) = conf
        && conf != target
    {
        std::fs::copy(conf, &target).map_err(|e| {
            Error::Config(format!(
                "could not access checkpatch configuration at '{}': {e}",
                conf.display()
            ))
        })?;
    }
    if !target.is_file() {
        return Err(Error::Config(format!(
            "could not access checkpatch configuration at '{}'",
            target.display()
        )));
    }
    Ok(())
}

fn note_row(hash: &str, note: &Note) -> [String; 6] {
    [
        hash.to_string(),
        note.level.to_string(),
        note.note_type.clone(),
        format!("\"{}\"", note.message),
        note.file.clone(),
        note.line.to_string(),
    ]
}

/// Run `pr check patch`
pub async fn run_check_patch(
    ctx: &CommandContext,
    options: PatchArgs,
    output: OutputFormat,
    args: &[String],
) -> Result<()> {
    let pr_ref: PrRef = resolve_pr_ref(args)?;
    let pr = ctx.platform.get_pr(&pr_ref).await?;

    let workdir = ctx.config.workdir("governctl-pr-check-patch-")?;
    let checkout_opts = checkout_options(ctx, workdir.path(), options.base);
    let checkout = PrCheckout::prepare(&ctx.runner, &pr_ref, &pr, &checkout_opts).await?;

    let script = options
        .checkpatch_script
        .unwrap_or_else(|| Checkpatch::default_script(checkout.dir()));
    if !script.is_file() {
        return Err(Error::Config(format!(
            "could not access checkpatch script at '{}'",
            script.display()
        )));
    }
    place_config(checkout.dir(), options.checkpatch_conf.as_deref())?;

    let ignores: Vec<String> = checkout
        .patches
        .iter()
        .flat_map(governance::patch::Patch::checkpatch_ignores)
        .collect();
    let checkpatch = Checkpatch::new(script, checkout.dir()).with_ignores(ignores);

    let files = checkout.write_patches(&pr_ref, &workdir.path().join("patches"))?;
    let annotate = std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true");

    let mut table = Table::new(["COMMIT", "LEVEL", "TYPE", "MESSAGE", "FILE", "LINE"]);
    let mut all_notes = Vec::new();
    for (patch, file) in checkout.patches.iter().zip(&files) {
        info!(patch = %file.display(), title = %patch.title, "checking patch");
        let notes = checkpatch.check(&ctx.runner, file).await?;
        for note in &notes {
            table.push(note_row(patch.short_hash(), note));
            if annotate && let Some(annotation) = note.annotation() {
                println!("{annotation}");
            }
        }
        all_notes.extend(notes);
    }

    let summary = Summary::of(&all_notes);
    if summary.is_clean() {
        println!("{} checkpatch passed", check());
        return Ok(());
    }

    if !annotate {
        print!("{}", table.render(output)?);
    }
    summary.into_result()
}
