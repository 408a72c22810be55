//! `pr sync reviewers` - assign maintainers and reviewers by workload

use crate::cli::CliProgress;
use crate::cli::context::{CommandContext, resolve_pr_ref};
use crate::cli::style::{Stylize, check, spinner_style};
use anstream::println;
use governance::assign::{AssignOptions, assign_pr, load_codeowners};
use governance::error::Result;
use indicatif::ProgressBar;
use std::path::Path;
use std::time::Duration;

/// Run `pr sync reviewers`
pub async fn run_sync_reviewers(
    ctx: &CommandContext,
    options: AssignOptions,
    checkout: Option<&Path>,
    args: &[String],
) -> Result<()> {
    let pr_ref = resolve_pr_ref(args)?;
    let definitions = ctx.definitions()?;
    let codeowners = load_codeowners(ctx.platform.as_ref(), &pr_ref, checkout).await?;

    let spinner = (!ctx.config.no_render).then(|| {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style());
        spinner.set_message(format!("Assigning {}...", pr_ref.to_string().emphasis()));
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    });

    let progress = CliProgress::compact();
    let result = assign_pr(
        ctx.platform.as_ref(),
        &definitions.teams,
        &pr_ref,
        codeowners.as_ref(),
        options,
        ctx.config.dry_run,
        &progress,
    )
    .await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
    let outcome = result?;

    if outcome.plan.is_empty() {
        println!(
            "{} {} {}",
            check(),
            pr_ref.to_string().accent(),
            "already has assignees and reviewers".muted()
        );
        return Ok(());
    }

    let verb = if outcome.applied { "Updated" } else { "Would update" };
    println!("{} {} {}", check(), verb, pr_ref.to_string().accent());
    println!("  {} {}", "teams:".muted(), outcome.teams.join(", "));
    println!("  {}", outcome.plan);
    Ok(())
}
