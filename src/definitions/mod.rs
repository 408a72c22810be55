//! Declarative definitions: teams, repositories, labels and users
//!
//! Definitions are YAML files, one record (or one `labels:` list) per file.
//! Everything is loaded and validated up front so that a broken definition
//! fails the run before any remote call is made.

pub mod label;
pub mod repo;
pub mod team;
pub mod user;

pub use label::{Label, LabelFile, load_labels_from_dir, parse_label_file, select_labels};
pub use repo::{PermissionLevel, RepoType, Repository, find_repo_by_name, load_repos_from_dir};
pub use team::{CodeReview, CodeReviewAlgorithm, Team, TeamSet, TeamType, load_teams_from_dir};
pub use user::{User, UserRole};

use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Read and parse every `*.yaml` / `*.yml` file directly inside `dir`,
/// sorted by file name.
pub(crate) fn read_yaml_dir<T: DeserializeOwned>(dir: &Path) -> Result<Vec<(PathBuf, T)>> {
    if !dir.is_dir() {
        return Err(Error::definition(dir, "definition directory not found"));
    }

    let mut paths: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| Error::definition(dir, format!("failed to read directory: {e}")))?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| e == "yaml" || e == "yml")
        })
        .collect();
    paths.sort();

    let mut out = Vec::with_capacity(paths.len());
    for path in paths {
        let content = fs::read_to_string(&path)
            .map_err(|e| Error::definition(&path, format!("failed to read: {e}")))?;
        let value = serde_yaml::from_str(&content)
            .map_err(|e| Error::definition(&path, format!("failed to parse: {e}")))?;
        debug!(path = %path.display(), "loaded definition");
        out.push((path, value));
    }
    Ok(out)
}

/// Team and repository definitions of an organization
#[derive(Debug, Clone, Default)]
pub struct Definitions {
    /// Teams with resolved parents
    pub teams: TeamSet,
    /// Repositories
    pub repos: Vec<Repository>,
}

impl Definitions {
    /// Load teams from `teams_dir` and, when it exists, repositories from `repos_dir`
    pub fn load(teams_dir: &Path, repos_dir: &Path) -> Result<Self> {
        let teams = load_teams_from_dir(teams_dir)?;
        let repos = if repos_dir.is_dir() {
            load_repos_from_dir(repos_dir)?
        } else {
            debug!(dir = %repos_dir.display(), "no repository definitions");
            Vec::new()
        };
        Ok(Self { teams, repos })
    }

    /// GitHub names of the repositories a team owns, resolved against repo definitions
    pub fn repo_full_names(&self, team: &Team) -> Vec<String> {
        team.repositories
            .iter()
            .map(|r| {
                find_repo_by_name(&self.repos, &r.full_name())
                    .unwrap_or(r)
                    .full_name()
            })
            .collect()
    }
}
