//! checkpatch.pl runner and output parser

use crate::error::{Error, Result};
use crate::git::{CommandRunner, CommandSpec};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Severity of a checkpatch note
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoteLevel {
    /// `WARNING:` line
    Warning,
    /// `ERROR:` line
    Error,
}

impl NoteLevel {
    /// Lowercase name, also the GitHub Actions command
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for NoteLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding reported by checkpatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    /// Severity
    pub level: NoteLevel,
    /// Check type, e.g. `LONG_LINE`
    #[serde(rename = "type")]
    pub note_type: String,
    /// Message text
    pub message: String,
    /// File the note refers to, empty for commit-message notes
    pub file: String,
    /// Line in `file`, zero when unknown
    pub line: u32,
    /// Quoted source lines
    pub excerpt: Vec<String>,
}

impl Note {
    /// GitHub Actions workflow command annotating the PR, when the note has a location
    pub fn annotation(&self) -> Option<String> {
        if self.file.is_empty() || self.line == 0 {
            return None;
        }
        Some(format!(
            "::{} file={},line={},title={}::{}",
            self.level, self.file, self.line, self.note_type, self.message
        ))
    }
}

fn open_note(level: NoteLevel, rest: &str, line: &str) -> Result<Note> {
    let Some((note_type, message)) = rest.split_once(':') else {
        return Err(Error::Checkpatch(format!(
            "malformed line '{line}': expected ':'"
        )));
    };
    Ok(Note {
        level,
        note_type: note_type.to_string(),
        message: message.trim().to_string(),
        file: String::new(),
        line: 0,
        excerpt: Vec::new(),
    })
}

/// `#<N>: FILE: <path>:<line>:` -> (path, line)
fn parse_location(line: &str) -> Result<(String, u32)> {
    let parts: Vec<&str> = line.split(": ").collect();
    let [_, _, location] = parts[..] else {
        return Err(Error::Checkpatch(format!(
            "malformed location: expected '#<DIGITS>: FILE: <FILE>:<LINE>:' but got '{line}'"
        )));
    };
    let fields: Vec<&str> = location.split(':').collect();
    let [file, number, _] = fields[..] else {
        return Err(Error::Checkpatch(format!(
            "malformed location: expected '<FILE>:<LINE>:' but got '{line}'"
        )));
    };
    let number = number.parse().map_err(|e| {
        Error::Checkpatch(format!("invalid line number '{number}' in '{line}': {e}"))
    })?;
    Ok((file.to_string(), number))
}

/// Parse checkpatch output into notes.
///
/// `WARNING:`/`ERROR:` lines open a note, the first `FILE` line after it
/// sets its location, other non-empty lines are kept as excerpt, and
/// `total:` ends the report.
pub fn parse_output(output: &str) -> Result<Vec<Note>> {
    let mut notes: Vec<Note> = Vec::new();

    for line in output.lines() {
        if let Some(rest) = line.strip_prefix("WARNING:") {
            notes.push(open_note(NoteLevel::Warning, rest, line)?);
        } else if let Some(rest) = line.strip_prefix("ERROR:") {
            notes.push(open_note(NoteLevel::Error, rest, line)?);
        } else if line.starts_with("total:") {
            break;
        } else if let Some(note) = notes.last_mut() {
            if note.file.is_empty() && line.contains("FILE") {
                let (file, number) = parse_location(line)?;
                note.file = file;
                note.line = number;
            } else if !line.is_empty() {
                note.excerpt.push(line.to_string());
            }
        }
    }

    Ok(notes)
}

/// Counts of notes per level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Error notes
    pub errors: usize,
    /// Warning notes
    pub warnings: usize,
}

impl Summary {
    /// Tally `notes`
    pub fn of<'a>(notes: impl IntoIterator<Item = &'a Note>) -> Self {
        notes.into_iter().fold(Self::default(), |mut acc, note| {
            match note.level {
                NoteLevel::Error => acc.errors += 1,
                NoteLevel::Warning => acc.warnings += 1,
            }
            acc
        })
    }

    /// Whether nothing was reported
    pub const fn is_clean(self) -> bool {
        self.errors == 0 && self.warnings == 0
    }

    /// `Ok` when clean, [`Error::PatchCheckFailed`] otherwise
    pub fn into_result(self) -> Result<()> {
        if self.is_clean() {
            Ok(())
        } else {
            Err(Error::PatchCheckFailed {
                errors: self.errors,
                warnings: self.warnings,
            })
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "checkpatch failed with {} errors and {} warnings",
            self.errors, self.warnings
        )
    }
}

/// A configured checkpatch.pl invocation
#[derive(Debug, Clone)]
pub struct Checkpatch {
    script: PathBuf,
    workdir: PathBuf,
    ignores: Vec<String>,
}

impl Checkpatch {
    /// Path of the script inside a Unikraft-style checkout
    pub fn default_script(checkout: &Path) -> PathBuf {
        checkout.join("support").join("scripts").join("checkpatch.pl")
    }

    /// Run `script` from `workdir`, where `.checkpatch.conf` is picked up
    pub fn new(script: impl Into<PathBuf>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            workdir: workdir.into(),
            ignores: Vec::new(),
        }
    }

    /// Skip the given check types
    #[must_use]
    pub fn with_ignores<I, S>(mut self, ignores: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for ignore in ignores {
            let ignore = ignore.into();
            if !self.ignores.contains(&ignore) {
                self.ignores.push(ignore);
            }
        }
        self
    }

    /// Command line for checking `patch_file`
    pub fn command(&self, patch_file: &Path) -> CommandSpec {
        let mut command = CommandSpec::new(self.script.display().to_string())
            .args([
                "--color=never",
                "--show-types",
                "--no-tree",
                "--strict",
                "--max-line-length=80",
            ])
            .arg(patch_file.display().to_string())
            .cwd(&self.workdir);
        if !self.ignores.is_empty() {
            command = command.arg("--ignore").arg(self.ignores.join(","));
        }
        command
    }

    /// Check one patch file; the exit status is ignored
    pub async fn check(&self, runner: &dyn CommandRunner, patch_file: &Path) -> Result<Vec<Note>> {
        let command = self.command(patch_file);
        info!(command = %command, "running checkpatch");
        let output = runner.run(&command).await?;
        debug!(status = ?output.status, "checkpatch finished");
        parse_output(&output.stdout)
    }
}
