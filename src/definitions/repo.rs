//! Repository definitions

use super::read_yaml_dir;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Kind of repository, used as a name prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoType {
    /// Application (`app-*`)
    App,
    /// Library (`lib-*`)
    Lib,
    /// Platform (`plat-*`)
    Plat,
    /// The core repository, never prefixed
    Core,
    /// Anything else, never prefixed
    Misc,
}

impl RepoType {
    /// All kinds, in prefix-matching order
    pub const ALL: [Self; 5] = [Self::App, Self::Lib, Self::Plat, Self::Core, Self::Misc];

    /// Prefix token
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::App => "app",
            Self::Lib => "lib",
            Self::Plat => "plat",
            Self::Core => "core",
            Self::Misc => "misc",
        }
    }

    const fn is_prefixed(self) -> bool {
        !matches!(self, Self::Core | Self::Misc)
    }
}

impl fmt::Display for RepoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Access level a team is granted on a repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    /// Read
    Read,
    /// Triage
    Triage,
    /// Write
    Write,
    /// Maintain
    Maintain,
    /// Admin
    Admin,
}

/// A repository managed by the organization
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Short name, without type prefix
    pub name: String,
    /// Kind of repository
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub repo_type: Option<RepoType>,
    /// Clone URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Permission granted to owning teams
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permission: Option<PermissionLevel>,
}

impl Repository {
    /// Create a repository definition by name, splitting off a type prefix
    pub fn named(name: &str) -> Self {
        let mut repo = Self {
            name: name.to_string(),
            repo_type: None,
            origin: None,
            permission: None,
        };
        repo.normalize();
        repo
    }

    /// Move a type prefix in `name` (e.g. `lib-musl`) into `repo_type`.
    ///
    /// A declared prefixed type strips its own prefix from `name`.
    pub fn normalize(&mut self) {
        if let Some(kind) = self.repo_type {
            if kind.is_prefixed()
                && let Some(short) = self.name.strip_prefix(&format!("{kind}-"))
            {
                self.name = short.to_string();
            }
            return;
        }
        for kind in RepoType::ALL.into_iter().filter(|k| k.is_prefixed()) {
            if let Some(short) = self.name.strip_prefix(&format!("{kind}-")) {
                self.name = short.to_string();
                self.repo_type = Some(kind);
                return;
            }
        }
    }

    /// Name as it appears on GitHub
    pub fn full_name(&self) -> String {
        match self.repo_type {
            Some(kind) if kind.is_prefixed() => format!("{kind}-{}", self.name),
            _ => self.name.clone(),
        }
    }

    /// Whether `name` refers to this repository, with or without prefix
    pub fn name_equals(&self, name: &str) -> bool {
        if self.name == name || self.full_name() == name {
            return true;
        }
        RepoType::ALL
            .iter()
            .any(|kind| format!("{kind}-{}", self.name) == name)
    }

    /// Clone URL, defaulting to github.com
    pub fn origin_url(&self, org: &str) -> String {
        self.origin
            .clone()
            .unwrap_or_else(|| format!("https://github.com/{org}/{}.git", self.full_name()))
    }
}

/// Load every repository definition in `dir`
pub fn load_repos_from_dir(dir: &Path) -> Result<Vec<Repository>> {
    let mut repos = Vec::new();
    for (path, mut repo) in read_yaml_dir::<Repository>(dir)? {
        if repo.name.trim().is_empty() {
            return Err(Error::definition(&path, "repository name is required"));
        }
        repo.normalize();
        repos.push(repo);
    }
    Ok(repos)
}

/// Find a repository by either its short or full name
pub fn find_repo_by_name<'a>(repos: &'a [Repository], name: &str) -> Option<&'a Repository> {
    repos.iter().find(|r| r.name_equals(name))
}
