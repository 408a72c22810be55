//! Label sync for pull requests

use crate::definitions::{Label, load_labels_from_dir, parse_label_file, select_labels};
use crate::error::{Error, Result};
use crate::platform::PlatformService;
use crate::types::{ChangedFile, PrRef, PrState};
use std::path::Path;
use tracing::{debug, info};

/// Labels decided for one pull request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelOutcome {
    /// Labels whose rules matched a changed file
    pub matched: Vec<String>,
    /// Matched labels the PR did not have yet
    pub added: Vec<String>,
    /// Whether `added` was written to GitHub
    pub applied: bool,
}

/// Load the label definitions a repository carries in `labels_dir`.
///
/// With a local checkout the directory is read relative to it; otherwise
/// every YAML file in it is fetched from the PR's repository.
pub async fn load_labels(
    platform: &dyn PlatformService,
    pr_ref: &PrRef,
    labels_dir: &Path,
    checkout: Option<&Path>,
) -> Result<Vec<Label>> {
    if let Some(root) = checkout {
        debug!(root = %root.display(), dir = %labels_dir.display(), "reading labels from checkout");
        return load_labels_from_dir(&root.join(labels_dir));
    }

    let dir = labels_dir.to_string_lossy().replace('\\', "/");
    let Some(mut files) = platform.list_dir(&pr_ref.org, &pr_ref.repo, &dir).await? else {
        return Err(Error::definition(
            labels_dir,
            format!("definition directory not found in {}", pr_ref.repo_slug()),
        ));
    };
    files.retain(|f| f.ends_with(".yaml") || f.ends_with(".yml"));
    files.sort();

    let mut labels = Vec::new();
    for file in files {
        let Some(content) = platform.fetch_file(&pr_ref.org, &pr_ref.repo, &file).await? else {
            continue;
        };
        debug!(path = %file, "fetched label definitions");
        labels.extend(parse_label_file(Path::new(&file), &content)?);
    }
    Ok(labels)
}

/// Names of the labels triggered by `files`, in definition order.
///
/// Both the old and the new path of a renamed file are checked.
pub fn labels_for_files(labels: &[Label], repo: &str, files: &[ChangedFile]) -> Vec<String> {
    let paths: Vec<&str> = files.iter().flat_map(ChangedFile::paths).collect();
    select_labels(labels, repo, paths)
        .into_iter()
        .map(|l| l.name.clone())
        .collect()
}

/// Add the labels matching a PR's changed files
pub async fn sync_labels(
    platform: &dyn PlatformService,
    labels: &[Label],
    pr_ref: &PrRef,
    dry_run: bool,
) -> Result<LabelOutcome> {
    let pr = platform.get_pr(pr_ref).await?;
    if pr.state != PrState::Open {
        return Err(Error::PrNotOpen(pr_ref.to_string()));
    }

    let files = platform.list_changed_files(pr_ref).await?;
    debug!(pr = %pr_ref, files = files.len(), "matching labels");

    let matched = labels_for_files(labels, &pr_ref.repo, &files);
    let added: Vec<String> = matched
        .iter()
        .filter(|name| !pr.has_label(name))
        .cloned()
        .collect();

    let applied = if added.is_empty() {
        debug!(pr = %pr_ref, "labels up to date");
        false
    } else if dry_run {
        info!(pr = %pr_ref, labels = ?added, "dry run, not labelling");
        false
    } else {
        platform.add_labels(pr_ref, &added).await?;
        info!(pr = %pr_ref, labels = ?added, "added labels");
        true
    };

    Ok(LabelOutcome {
        matched,
        added,
        applied,
    })
}
