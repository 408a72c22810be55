//! Merge command - land an approved PR through a temporary branch

use crate::cli::CliProgress;
use crate::cli::check::{PolicyArgs, checkout_options};
use crate::cli::context::{CommandContext, resolve_pr_ref};
use crate::cli::style::{Stylize, check};
use anstream::println;
use clap::Args;
use dialoguer::Confirm;
use governance::checkout::PrCheckout;
use governance::config::under_github_actions;
use governance::error::{Error, Result};
use governance::merge::{
    Gh, MergeExecutionResult, MergePlan, MergePlanOptions, MergeStep, create_merge_plan,
    execute_merge,
};
use governance::mergeable::evaluate_pr;

/// Options for the merge command
#[derive(Debug, Clone, Default, Args)]
pub struct MergeArgs {
    /// Merge policy
    #[command(flatten)]
    pub policy: PolicyArgs,
    /// Branch the PR lands on (default: the PR's base)
    #[arg(long, env = "GOVERN_BASE")]
    pub base: Option<String>,
    /// Git committer name
    #[arg(long, short = 'n', env = "GOVERN_COMMITTER_NAME")]
    pub committer_name: Option<String>,
    /// Git committer email
    #[arg(long, short = 'e', env = "GOVERN_COMMITTER_EMAIL")]
    pub committer_email: Option<String>,
    /// Do not turn approval captures into trailers
    #[arg(long, env = "GOVERN_NO_AUTO_TRAILER_PATCH")]
    pub no_auto_trailer_patch: bool,
    /// Skip the mergeability check
    #[arg(long, env = "GOVERN_NO_CHECK_MERGEABLE")]
    pub no_check_mergeable: bool,
    /// Push the base branch after applying the patches
    #[arg(long, env = "GOVERN_PUSH")]
    pub push: bool,
    /// Extra trailer appended to every commit (repeatable)
    #[arg(long = "trailer", short = 't', env = "GOVERN_TRAILER", value_delimiter = ',')]
    pub trailers: Vec<String>,
    /// Preview the plan and prompt before executing
    #[arg(long)]
    pub confirm: bool,
}

/// Run the merge command
pub async fn run_merge(ctx: &CommandContext, args: MergeArgs, pr_args: &[String]) -> Result<()> {
    let dry_run = ctx.config.dry_run;

    // =========================================================================
    // Phase 1: GATHER - evaluate the PR and collect its patches
    // =========================================================================

    let pr_ref = resolve_pr_ref(pr_args)?;

    let evaluation = if args.no_check_mergeable {
        None
    } else {
        println!("{}", "Checking merge requirements...".muted());
        let policy = args.policy.to_policy().compile()?;
        let (_, evaluation) = evaluate_pr(ctx.platform.as_ref(), &pr_ref, &policy).await?;
        if let Some(reason) = evaluation.reason() {
            return Err(Error::NotMergeable(reason));
        }
        Some(evaluation)
    };

    let pr = ctx.platform.get_pr(&pr_ref).await?;
    let workdir = ctx.config.workdir("governctl-pr-merge-")?;
    let checkout_opts = checkout_options(ctx, workdir.path(), args.base.clone());
    let checkout = PrCheckout::prepare(&ctx.runner, &pr_ref, &pr, &checkout_opts).await?;

    // =========================================================================
    // Phase 2: PLAN - pure
    // =========================================================================

    let plan_options = MergePlanOptions {
        base: Some(checkout.base.clone()),
        trailers: args.trailers,
        no_auto_trailers: args.no_auto_trailer_patch,
        push: args.push,
        committer_name: args.committer_name,
        committer_email: args.committer_email,
        under_actions: under_github_actions(),
    };
    let plan = create_merge_plan(
        &pr_ref,
        &pr.base_ref,
        pr.body.as_deref(),
        &checkout.patches,
        evaluation.as_ref(),
        &plan_options,
    );

    // =========================================================================
    // Phase 3: EXECUTE
    // =========================================================================

    if dry_run || args.confirm {
        report_plan(&plan, dry_run);
    }

    if args.confirm && !dry_run {
        if !Confirm::new()
            .with_prompt("Proceed with merge?")
            .default(true)
            .interact()
            .map_err(|e| Error::Internal(format!("Failed to read confirmation: {e}")))?
        {
            println!("{}", "Aborted".muted());
            return Ok(());
        }
        println!();
    }

    println!(
        "{} {}",
        "Merging".emphasis(),
        format!("{pr_ref} ({} patch(es))", plan.patch_count()).accent()
    );

    let gh = Gh::new(
        &ctx.runner,
        pr_ref.repo_slug(),
        checkout.dir(),
        Some(ctx.token.as_str()),
    );
    let progress = CliProgress::compact();
    let result = execute_merge(&plan, &checkout.git, &gh, dry_run, &progress).await?;

    print_merge_summary(&plan, &result, dry_run);
    Ok(())
}

/// Print merge summary
fn print_merge_summary(plan: &MergePlan, result: &MergeExecutionResult, dry_run: bool) {
    println!();
    if dry_run {
        println!(
            "{} Dry run: {} step(s) run locally, {} remote step(s) skipped",
            check(),
            result.completed.len(),
            result.skipped.len()
        );
        println!("{}", "Run without --dry-run to execute.".muted());
        return;
    }

    println!("{} Merged {}", check(), plan.pr.to_string().accent());
    println!("   Trailers: {}", plan.trailers.join(", ").muted());
    if !result.warnings.is_empty() {
        println!("   {}", "Completed with warnings:".warn());
        for warning in &result.warnings {
            println!("     - {}", warning.muted());
        }
    }
}

/// Report what would be done
fn report_plan(plan: &MergePlan, dry_run: bool) {
    println!("{}:", "Merge plan".emphasis());
    println!();
    for step in &plan.steps {
        let marker = if dry_run && step.is_remote() {
            "- skip".muted()
        } else {
            "- run ".accent()
        };
        match step {
            MergeStep::ApplyPatch { title, .. } => {
                println!("  {marker} apply patch: {}", title.emphasis());
            }
            other => println!("  {marker} {other}"),
        }
    }
    println!();
    if !plan.trailers.is_empty() {
        println!("  {} {}", "trailers:".muted(), plan.trailers.join(", "));
        println!();
    }
}
