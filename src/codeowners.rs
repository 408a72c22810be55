//! CODEOWNERS parsing and path ownership lookup

use crate::definitions::label::compile_globs;
use crate::error::{Error, Result};
use globset::GlobSet;
use std::fs;
use std::path::Path;

/// Locations GitHub looks for a CODEOWNERS file, in priority order
pub const CODEOWNERS_PATHS: [&str; 3] = ["CODEOWNERS", ".github/CODEOWNERS", "docs/CODEOWNERS"];

#[derive(Debug)]
struct Rule {
    pattern: String,
    globs: GlobSet,
    owners: Vec<String>,
}

/// Parsed CODEOWNERS file; the last matching rule wins
#[derive(Debug, Default)]
pub struct CodeOwners {
    rules: Vec<Rule>,
}

impl CodeOwners {
    /// Parse CODEOWNERS content
    pub fn parse(content: &str) -> Result<Self> {
        let mut rules = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.split_once(" #").map_or(line, |(rule, _)| rule).trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let mut fields = line.split_whitespace();
            let Some(pattern) = fields.next() else {
                continue;
            };
            let owners: Vec<String> = fields.map(ToString::to_string).collect();

            let globs = compile_globs(&pattern_globs(pattern))
                .map_err(|e| Error::definition("CODEOWNERS", format!("line {}: {e}", lineno + 1)))?;

            rules.push(Rule {
                pattern: pattern.to_string(),
                globs,
                owners,
            });
        }
        Ok(Self { rules })
    }

    /// Read the first CODEOWNERS file found under `root`, if any
    pub fn from_checkout(root: &Path) -> Result<Option<Self>> {
        for candidate in CODEOWNERS_PATHS {
            let path = root.join(candidate);
            if path.is_file() {
                return Self::parse(&fs::read_to_string(&path)?).map(Some);
            }
        }
        Ok(None)
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether the file had no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Owners of `path` according to the last matching rule
    pub fn owners_of(&self, path: &str) -> &[String] {
        let path = path.trim_start_matches('/');
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.globs.is_match(path))
            .map(|rule| rule.owners.as_slice())
            .unwrap_or_default()
    }

    /// Pattern of the rule deciding ownership of `path`
    pub fn matching_pattern(&self, path: &str) -> Option<&str> {
        let path = path.trim_start_matches('/');
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.globs.is_match(path))
            .map(|rule| rule.pattern.as_str())
    }
}

/// Translate a gitignore-style CODEOWNERS pattern into globs
fn pattern_globs(pattern: &str) -> Vec<String> {
    if pattern == "*" {
        return vec!["**".to_string()];
    }

    let anchored = pattern.starts_with('/') || pattern.trim_end_matches('/').contains('/');
    let dir_only = pattern.ends_with('/');
    let body = pattern.trim_start_matches('/').trim_end_matches('/');
    let base = if anchored {
        body.to_string()
    } else {
        format!("**/{body}")
    };

    if dir_only {
        vec![format!("{base}/**")]
    } else if body.ends_with("/**") {
        vec![base]
    } else {
        vec![base.clone(), format!("{base}/**")]
    }
}

/// Team names referenced by `@org/team` owners
pub fn team_owners(owners: &[String]) -> impl Iterator<Item = &str> {
    owners
        .iter()
        .filter_map(|o| o.strip_prefix('@'))
        .filter_map(|o| o.split_once('/').map(|(_, team)| team))
}
