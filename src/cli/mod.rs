//! Command implementations for `governctl`

pub mod check;
pub mod context;
pub mod labels;
pub mod merge;
pub mod reviewers;
pub mod style;
pub mod team;

use anstream::println;
use async_trait::async_trait;
use governance::progress::ProgressCallback;
use style::Stylize;

/// Prints orchestrator progress to stdout
#[derive(Debug, Clone, Copy)]
pub struct CliProgress {
    indent: &'static str,
}

impl CliProgress {
    /// One indented line per message
    pub const fn compact() -> Self {
        Self { indent: "  " }
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_message(&self, message: &str) {
        println!("{}{}", self.indent, message.muted());
    }

    async fn on_warning(&self, message: &str) {
        println!("{}{} {}", self.indent, "warning:".warn(), message);
    }
}
