//! Commits as mailbox patches, with trailer handling

use crate::error::{Error, Result};
use crate::mergeable::Captures;
use chrono::{DateTime, FixedOffset};
use regex::Regex;
use std::sync::LazyLock;

/// Trailers split out of a commit message body
pub const KNOWN_TRAILERS: [&str; 4] = [
    "Signed-off-by",
    "Co-authored-by",
    "GitHub-Closes",
    "GitHub-Fixes",
];

/// Commit-message directive that disables checkpatch checks
pub const CHECKPATCH_IGNORE: &str = "Checkpatch-Ignore:";

/// Fixed date `git format-patch` writes on the mbox separator line
const MBOX_DATE: &str = "Mon Sep 17 00:00:00 2001";

static ISSUE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:Closes|Fixes|Resolves): #([0-9]+)").expect("issue reference pattern is valid")
});

/// One commit, ready to be rendered for `git am` or checkpatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    /// Commit hash
    pub hash: String,
    /// First line of the message
    pub title: String,
    /// Message body without title and known trailers
    pub message: String,
    /// Trailer lines, in order
    pub trailers: Vec<String>,
    /// Author name
    pub author_name: String,
    /// Author email
    pub author_email: String,
    /// Author date
    pub author_date: DateTime<FixedOffset>,
    /// `git show --stat` summary
    pub stat: String,
    /// Unified diff
    pub diff: String,
}

impl Patch {
    /// Build a patch from raw commit data; `date` is RFC 2822
    pub fn from_commit(
        hash: &str,
        raw_message: &str,
        author_name: &str,
        author_email: &str,
        date: &str,
        stat: &str,
        diff: &str,
    ) -> Result<Self> {
        let author_date = DateTime::parse_from_rfc2822(date.trim())
            .map_err(|e| Error::Patch(format!("invalid author date '{date}' on {hash}: {e}")))?;
        let (title, message, trailers) = split_message(raw_message);

        Ok(Self {
            hash: hash.trim().to_string(),
            title,
            message,
            trailers,
            author_name: author_name.to_string(),
            author_email: author_email.to_string(),
            author_date,
            stat: stat.to_string(),
            diff: diff.to_string(),
        })
    }

    /// First seven characters of the hash
    pub fn short_hash(&self) -> &str {
        self.hash.get(..7).unwrap_or(&self.hash)
    }

    /// Append trailers not already present
    pub fn add_trailers<S: AsRef<str>>(&mut self, trailers: &[S]) {
        for trailer in trailers {
            let trailer = trailer.as_ref();
            if !self.trailers.iter().any(|t| t == trailer) {
                self.trailers.push(trailer.to_string());
            }
        }
    }

    /// Render as a mailbox message accepted by `git am`.
    ///
    /// `---` inside the body is rewritten to `...`; `git am` would cut the
    /// message there otherwise.
    pub fn to_mbox(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("From {} {MBOX_DATE}\n", self.hash));
        out.push_str(&format!("From: {} <{}>\n", self.author_name, self.author_email));
        out.push_str(&format!("Date: {}\n", self.author_date.to_rfc2822()));
        out.push_str(&format!("Subject: [PATCH] {}\n\n", self.title));
        if !self.message.is_empty() {
            out.push_str(&self.message.replace("---", "..."));
            out.push_str("\n\n");
        }
        if !self.trailers.is_empty() {
            out.push_str(&self.trailers.join("\n"));
            out.push('\n');
        }
        out.push_str("---\n");
        out.push_str(&self.stat);
        out.push_str("\n\n");
        out.push_str(&self.diff);
        if !self.diff.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("-- \n2.39.2\n\n");
        out
    }

    /// File name for the patch of commit `index` (1-based) of a PR
    pub fn file_name(&self, repo: &str, pr: u64, index: usize) -> String {
        let slug: String = self
            .title
            .chars()
            .filter_map(|c| match c {
                ' ' | '/' => Some('-'),
                ':' | '.' | '?' | '`' | '\'' | '"' => None,
                c => Some(c),
            })
            .collect();
        format!("{repo}-pr-{pr}-{index}-{slug}.patch")
    }

    /// Check types disabled with `Checkpatch-Ignore: A, b`, upper-cased
    pub fn checkpatch_ignores(&self) -> Vec<String> {
        self.message
            .lines()
            .chain(self.trailers.iter().map(String::as_str))
            .filter_map(|line| line.trim().strip_prefix(CHECKPATCH_IGNORE))
            .flat_map(|list| list.split(','))
            .map(|t| t.trim().to_ascii_uppercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

/// Split a raw commit message into title, body and known trailers.
///
/// Trailing blank lines of the body are dropped.
pub fn split_message(raw: &str) -> (String, String, Vec<String>) {
    let mut lines = raw.lines();
    let title = lines.next().unwrap_or_default().trim().to_string();

    let mut body = Vec::new();
    let mut trailers = Vec::new();
    for line in lines {
        if is_known_trailer(line) {
            trailers.push(line.trim_end().to_string());
        } else {
            body.push(line);
        }
    }

    while body.first().is_some_and(|l| l.trim().is_empty()) {
        body.remove(0);
    }
    while body.last().is_some_and(|l| l.trim().is_empty()) {
        body.pop();
    }

    (title, body.join("\n"), trailers)
}

fn is_known_trailer(line: &str) -> bool {
    let lower = line.to_ascii_lowercase();
    KNOWN_TRAILERS
        .iter()
        .any(|t| lower.starts_with(&format!("{}:", t.to_ascii_lowercase())))
}

/// Trailer key for a capture group name: `approved_by` -> `Approved-by`
pub fn trailer_name(group: &str) -> String {
    let mut chars = group.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    let rest: String = chars.collect();
    format!("{}{}", first.to_ascii_uppercase(), rest.replace('_', "-"))
}

/// Trailers for every captured value, in group-name order
pub fn trailers_from_captures(captures: &Captures) -> Vec<String> {
    captures
        .iter()
        .flat_map(|(group, values)| {
            let name = trailer_name(group);
            values.iter().map(move |v| format!("{name}: {v}"))
        })
        .collect()
}

/// Issue numbers referenced as `Closes: #N`, `Fixes: #N` or `Resolves: #N`
pub fn referenced_issues(text: &str) -> Vec<u64> {
    let mut issues = Vec::new();
    for caps in ISSUE_REF.captures_iter(text) {
        if let Some(n) = caps.get(1).and_then(|m| m.as_str().parse().ok())
            && !issues.contains(&n)
        {
            issues.push(n);
        }
    }
    issues
}

#[cfg(test)]
mod tests {
    use super::*;

    const MESSAGE: &str = "lib/lwip: Fix checksum offload\n\nThe checksum was computed twice.\n---\nNot a separator.\n\nCheckpatch-Ignore: long_line, CamelCase\nSigned-off-by: Jane Doe <jane@example.com>\nGitHub-Fixes: #12\n";

    fn patch() -> Patch {
        Patch::from_commit(
            "0123456789abcdef",
            MESSAGE,
            "Jane Doe",
            "jane@example.com",
            "Tue, 14 Mar 2023 10:00:00 +0100",
            " lib/lwip/netif.c | 2 +-",
            "diff --git a/lib/lwip/netif.c b/lib/lwip/netif.c\n",
        )
        .unwrap()
    }

    #[test]
    fn test_split_message_extracts_known_trailers() {
        let p = patch();
        assert_eq!(p.title, "lib/lwip: Fix checksum offload");
        assert_eq!(
            p.trailers,
            ["Signed-off-by: Jane Doe <jane@example.com>", "GitHub-Fixes: #12"]
        );
        assert!(p.message.starts_with("The checksum"));
        assert!(p.message.ends_with("CamelCase"));
    }

    #[test]
    fn test_mbox_rewrites_triple_dashes_in_body() {
        let mut p = patch();
        p.add_trailers(&["Approved-by: Alice <alice@example.com>"]);
        let mbox = p.to_mbox();

        assert!(mbox.starts_with(
            "From 0123456789abcdef Mon Sep 17 00:00:00 2001\nFrom: Jane Doe <jane@example.com>\n"
        ));
        assert!(mbox.contains("Date: Tue, 14 Mar 2023 10:00:00 +0100\n"));
        assert!(mbox.contains("Subject: [PATCH] lib/lwip: Fix checksum offload\n"));
        assert!(mbox.contains("twice.\n...\nNot a separator."));
        assert!(mbox.contains("GitHub-Fixes: #12\nApproved-by: Alice <alice@example.com>\n---\n"));
        assert_eq!(mbox.matches("\n---\n").count(), 1);
    }

    #[test]
    fn test_add_trailers_skips_duplicates() {
        let mut p = patch();
        p.add_trailers(&["GitHub-Fixes: #12", "Tested-by: GitHub Actions"]);
        assert_eq!(p.trailers.len(), 3);
    }

    #[test]
    fn test_checkpatch_ignores() {
        assert_eq!(patch().checkpatch_ignores(), ["LONG_LINE", "CAMELCASE"]);
    }

    #[test]
    fn test_captures_become_trailers() {
        let mut captures = Captures::new();
        captures.insert(
            "approved_by".to_string(),
            vec!["Alice <a@example.com>".to_string(), "Bob <b@example.com>".to_string()],
        );
        captures.insert("reviewed_by".to_string(), vec!["Carol <c@example.com>".to_string()]);

        assert_eq!(
            trailers_from_captures(&captures),
            [
                "Approved-by: Alice <a@example.com>",
                "Approved-by: Bob <b@example.com>",
                "Reviewed-by: Carol <c@example.com>",
            ]
        );
    }

    #[test]
    fn test_referenced_issues() {
        let text = "Closes: #3\nFixes: #10 and Resolves: #3\nSee #99";
        assert_eq!(referenced_issues(text), [3, 10]);
    }

    #[test]
    fn test_referenced_issues_in_trailers_and_body() {
        let mut p = patch();
        p.add_trailers(&["Resolves: #41"]);
        let text = format!("{}\n{}\nCloses: #40", p.message, p.trailers.join("\n"));
        assert_eq!(referenced_issues(&text), [12, 41, 40]);
        assert!(referenced_issues("closes: #1\nCloses #2").is_empty());
    }

    #[test]
    fn test_file_name() {
        assert_eq!(
            patch().file_name("unikraft", 1000, 1),
            "unikraft-pr-1000-1-lib-lwip-Fix-checksum-offload.patch"
        );
        assert_eq!(patch().short_hash(), "0123456");
    }

    #[test]
    fn test_invalid_date_is_a_patch_error() {
        let err = Patch::from_commit("abc", "title", "a", "b", "yesterday", "", "").unwrap_err();
        assert!(matches!(err, Error::Patch(_)));
    }
}
