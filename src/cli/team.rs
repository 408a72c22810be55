//! `team sync` - push team definitions to GitHub

use crate::cli::CliProgress;
use crate::cli::context::CommandContext;
use crate::cli::style::{Stylize, check};
use anstream::println;
use governance::error::Result;
use governance::teamsync::{SyncReport, TeamSyncer};

/// Run `team sync [TEAM...]`
pub async fn run_team_sync(ctx: &CommandContext, names: &[String]) -> Result<()> {
    let definitions = ctx.definitions()?;
    if definitions.teams.is_empty() {
        println!(
            "{}",
            format!("No teams defined in {}", ctx.config.teams_dir.display()).muted()
        );
        return Ok(());
    }

    let progress = CliProgress::compact();
    let mut syncer = TeamSyncer::new(
        ctx.platform.as_ref(),
        &definitions,
        &ctx.config.org,
        ctx.config.dry_run,
    );
    let report = syncer.sync(names, &progress).await?;

    print_report(&report, ctx.config.dry_run);
    Ok(())
}

fn print_report(report: &SyncReport, dry_run: bool) {
    println!();
    for outcome in &report.teams {
        println!("{}", outcome.team.emphasis());
        for change in &outcome.changes {
            let delta = change.delta.to_string();
            let delta = if change.delta.is_empty() {
                delta.muted()
            } else {
                delta.accent()
            };
            println!("  {}: {delta}", change.team);
        }
    }

    println!();
    let verb = if dry_run { "would apply" } else { "applied" };
    println!(
        "{} {} team(s) synced, {} {} membership change(s)",
        check(),
        report.teams.len(),
        verb,
        report.change_count()
    );
    if dry_run {
        println!("{}", "Run without --dry-run to execute.".muted());
    }
}
