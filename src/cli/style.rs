//! Terminal styling helpers

use indicatif::ProgressStyle;
use owo_colors::{OwoColorize, Stream};
use std::fmt;

/// Check mark used in summaries
pub const CHECK: &str = "✓";

/// Cross used for failures
pub const CROSS: &str = "✗";

/// Semantic colours for CLI output, applied only when stdout supports them
pub trait Stylize {
    /// Secondary information
    fn muted(&self) -> String;
    /// Names of things: teams, branches, users
    fn accent(&self) -> String;
    /// Headings
    fn emphasis(&self) -> String;
    /// Successful outcomes
    fn success(&self) -> String;
    /// Recoverable problems
    fn warn(&self) -> String;
    /// Failures
    fn error(&self) -> String;
}

impl<T: fmt::Display> Stylize for T {
    fn muted(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.dimmed())
            .to_string()
    }

    fn accent(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.cyan())
            .to_string()
    }

    fn emphasis(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.bold())
            .to_string()
    }

    fn success(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.green())
            .to_string()
    }

    fn warn(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.yellow())
            .to_string()
    }

    fn error(&self) -> String {
        self.if_supports_color(Stream::Stdout, |t| t.red())
            .to_string()
    }
}

/// Green check mark
pub fn check() -> String {
    CHECK.success()
}

/// Red cross
pub fn cross() -> String {
    CROSS.error()
}

/// `text` as a terminal hyperlink to `url` where supported
pub fn link(text: &str, url: &str) -> String {
    if url.is_empty() || !supports_hyperlinks::on(supports_hyperlinks::Stream::Stdout) {
        return text.to_string();
    }
    terminal_link::Link::new(text, url).to_string()
}

/// Spinner used while waiting on GitHub
pub fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
}
