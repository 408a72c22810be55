//! `pr sync labels` - label a PR by its changed files

use crate::cli::context::{CommandContext, resolve_pr_ref};
use crate::cli::style::{Stylize, check};
use anstream::println;
use governance::config::actions_workspace;
use governance::error::Result;
use governance::labeling::{load_labels, sync_labels};
use std::path::Path;

/// Run `pr sync labels`.
///
/// Labels come from the target repository: `checkout` when given, the
/// Actions workspace under GitHub Actions, or the contents API.
pub async fn run_sync_labels(
    ctx: &CommandContext,
    labels_dir: &Path,
    checkout: Option<&Path>,
    args: &[String],
) -> Result<()> {
    let pr_ref = resolve_pr_ref(args)?;
    let workspace = actions_workspace();
    let checkout = checkout.or(workspace.as_deref());
    let labels = load_labels(ctx.platform.as_ref(), &pr_ref, labels_dir, checkout).await?;

    let outcome = sync_labels(ctx.platform.as_ref(), &labels, &pr_ref, ctx.config.dry_run).await?;

    if outcome.added.is_empty() {
        println!("{} {} {}", check(), pr_ref.to_string().accent(), "labels up to date".muted());
    } else if outcome.applied {
        println!(
            "{} {} labelled {}",
            check(),
            pr_ref.to_string().accent(),
            outcome.added.join(", ").emphasis()
        );
    } else {
        println!(
            "{} {} {}",
            "Would label".warn(),
            pr_ref.to_string().accent(),
            outcome.added.join(", ").emphasis()
        );
    }
    Ok(())
}
