//! Label definitions and path-glob matching

use super::read_yaml_dir;
use crate::error::{Error, Result};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A label that can be applied to pull requests
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Label {
    /// Label name
    pub name: String,
    /// Description
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Hex color without `#`
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
    /// Repositories the label is limited to; empty means all
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub apply_on_pr_match_repos: Vec<String>,
    /// Path globs that trigger the label
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub apply_on_pr_match_paths: Vec<String>,
    /// Delay before applying; parsed but not enforced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_after: Option<String>,
    /// Delay before removing; parsed but not enforced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remove_after: Option<String>,
    /// Labels that keep this one from being removed
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub do_not_remove_if_labels_exist: Vec<String>,
    /// `apply_on_pr_match_paths`, compiled by [`Label::compile`]
    #[serde(skip)]
    path_globs: Option<GlobSet>,
}

/// On-disk layout of a label file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelFile {
    /// Labels declared in the file
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// Compile path globs into one set; `*` stays within one segment, `**`
/// crosses them
pub fn compile_globs<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            GlobBuilder::new(pattern.as_ref())
                .literal_separator(true)
                .build()?,
        );
    }
    Ok(builder.build()?)
}

impl Label {
    /// Compiled label `name` triggered by `paths` in any repository
    pub fn for_paths<S: AsRef<str>>(name: &str, paths: &[S]) -> Result<Self> {
        Self {
            name: name.to_string(),
            apply_on_pr_match_paths: paths.iter().map(|p| p.as_ref().to_string()).collect(),
            ..Self::default()
        }
        .compile()
    }

    /// Compile the path globs. Labels only match once compiled; the
    /// loaders compile every label they return.
    pub fn compile(mut self) -> Result<Self> {
        self.path_globs = Some(compile_globs(&self.apply_on_pr_match_paths)?);
        Ok(self)
    }

    /// Whether this label applies to a change of `path` in `repo`.
    ///
    /// A non-empty repository filter must contain `repo`. With no path
    /// patterns the label never applies.
    pub fn applies_to(&self, repo: &str, path: &str) -> bool {
        if !self.apply_on_pr_match_repos.is_empty()
            && !self.apply_on_pr_match_repos.iter().any(|r| r == repo)
        {
            return false;
        }

        self.path_globs
            .as_ref()
            .is_some_and(|globs| globs.is_match(path))
    }

    fn prepare(self, source: &Path) -> Result<Self> {
        if self.name.trim().is_empty() {
            return Err(Error::definition(source, "label name is required"));
        }
        let name = self.name.clone();
        self.compile()
            .map_err(|e| Error::definition(source, format!("label {name}: {e}")))
    }
}

/// Parse one label file fetched from elsewhere; `source` names it in errors
pub fn parse_label_file(source: &Path, content: &str) -> Result<Vec<Label>> {
    let file: LabelFile = serde_yaml::from_str(content)
        .map_err(|e| Error::definition(source, format!("failed to parse: {e}")))?;
    file.labels
        .into_iter()
        .map(|label| label.prepare(source))
        .collect()
}

/// Load every label file in `dir`, keeping file then declaration order
pub fn load_labels_from_dir(dir: &Path) -> Result<Vec<Label>> {
    let mut labels = Vec::new();
    for (path, file) in read_yaml_dir::<LabelFile>(dir)? {
        for label in file.labels {
            labels.push(label.prepare(&path)?);
        }
    }
    Ok(labels)
}

/// Labels triggered by `paths` in `repo`, each once and in definition order
pub fn select_labels<'a, I, S>(labels: &'a [Label], repo: &str, paths: I) -> Vec<&'a Label>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let paths: Vec<S> = paths.into_iter().collect();
    labels
        .iter()
        .filter(|label| paths.iter().any(|p| label.applies_to(repo, p.as_ref())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn label(repos: &[&str], paths: &[&str]) -> Label {
        Label {
            name: "area/net".to_string(),
            apply_on_pr_match_repos: repos.iter().map(ToString::to_string).collect(),
            apply_on_pr_match_paths: paths.iter().map(ToString::to_string).collect(),
            ..Label::default()
        }
        .compile()
        .unwrap()
    }

    #[test]
    fn test_double_star_crosses_directories() {
        let l = label(&[], &["lib/**/*.c"]);
        assert!(l.applies_to("unikraft", "lib/foo/bar.c"));
        assert!(l.applies_to("unikraft", "lib/foo/deep/bar.c"));
        assert!(!l.applies_to("unikraft", "lib/foo/bar.h"));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        let l = label(&[], &["lib/*.c"]);
        assert!(l.applies_to("unikraft", "lib/bar.c"));
        assert!(!l.applies_to("unikraft", "lib/foo/bar.c"));
    }

    #[test]
    fn test_repo_filter_excludes_other_repos() {
        let l = label(&["unikraft"], &["**"]);
        assert!(l.applies_to("unikraft", "README.md"));
        assert!(!l.applies_to("app-nginx", "README.md"));
    }

    #[test]
    fn test_empty_paths_never_apply() {
        let l = label(&[], &[]);
        assert!(!l.applies_to("unikraft", "lib/foo/bar.c"));

        let scoped = label(&["unikraft"], &[]);
        assert!(!scoped.applies_to("unikraft", "lib/foo/bar.c"));
    }

    #[test]
    fn test_select_labels_is_ordered_and_unique() {
        let net = label(&[], &["lib/lwip/**"]);
        let docs = Label {
            name: "area/docs".to_string(),
            apply_on_pr_match_paths: vec!["**/*.md".to_string()],
            ..Label::default()
        }
        .compile()
        .unwrap();
        let labels = vec![net, docs];

        let selected = select_labels(
            &labels,
            "unikraft",
            ["lib/lwip/a.c", "lib/lwip/b.c", "doc/guide.md"],
        );
        let names: Vec<&str> = selected.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["area/net", "area/docs"]);
    }

    #[test]
    fn test_uncompiled_label_never_applies() {
        let raw = Label {
            name: "area/net".to_string(),
            apply_on_pr_match_paths: vec!["**".to_string()],
            ..Label::default()
        };
        assert!(!raw.applies_to("unikraft", "README.md"));
        assert!(raw.compile().unwrap().applies_to("unikraft", "README.md"));
    }

    #[test]
    fn test_parse_label_file_compiles_patterns() {
        let yaml = r"
labels:
  - name: area/net
    color: 00ff00
    apply_on_pr_match_repos: [unikraft]
    apply_on_pr_match_paths: ['lib/**/*.c', 'drivers/net/**']
";
        let labels = parse_label_file(Path::new(".github/labels/net.yaml"), yaml).unwrap();

        let l = &labels[0];
        assert_eq!(l.name, "area/net");
        assert_eq!(l.color, "00ff00");
        assert_eq!(l.apply_on_pr_match_repos, ["unikraft"]);
        assert!(l.applies_to("unikraft", "lib/lwip/netif.c"));
        assert!(l.applies_to("unikraft", "drivers/net/virtio/rx.c"));
        assert!(!l.applies_to("unikraft", "lib/lwip/netif.h"));

        let rendered = serde_yaml::to_string(&LabelFile { labels }).unwrap();
        assert!(!rendered.contains("path_globs"));
        assert!(rendered.contains("drivers/net/**"));
    }

    #[test]
    fn test_parse_label_file_names_source_on_bad_glob() {
        let err = parse_label_file(
            Path::new(".github/labels/broken.yaml"),
            "labels:\n  - name: broken\n    apply_on_pr_match_paths: ['lib/[a']\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("broken.yaml"));
    }

    #[test]
    fn test_load_rejects_invalid_glob() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join("labels.yaml"),
            "labels:\n  - name: broken\n    apply_on_pr_match_paths: ['lib/[a']\n",
        )
        .unwrap();

        assert!(matches!(
            load_labels_from_dir(temp.path()),
            Err(Error::Definition { .. })
        ));
    }
}
