//! Scripted command runner for git/gh tests

#![allow(dead_code)]

use async_trait::async_trait;
use governance::error::Result;
use governance::git::{CommandOutput, CommandRunner, CommandSpec};
use std::sync::Mutex;

/// Records every command and fails those matching a configured fragment.
///
/// Matching is done on the redacted command line, so tests can also check
/// that secrets never reach it.
#[derive(Default)]
pub struct MockRunner {
    calls: Mutex<Vec<CommandSpec>>,
    failures: Mutex<Vec<(String, String)>>,
    stdout: Mutex<Vec<(String, String)>>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail commands whose line contains `fragment`, with `stderr`
    pub fn fail_when(&self, fragment: &str, stderr: &str) {
        self.failures
            .lock()
            .unwrap()
            .push((fragment.to_string(), stderr.to_string()));
    }

    /// Answer commands whose line contains `fragment` with `stdout`
    pub fn reply_when(&self, fragment: &str, stdout: &str) {
        self.stdout
            .lock()
            .unwrap()
            .push((fragment.to_string(), stdout.to_string()));
    }

    /// Every command run so far
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.lock().unwrap().clone()
    }

    /// Redacted command lines run so far
    pub fn lines(&self) -> Vec<String> {
        self.calls().iter().map(ToString::to_string).collect()
    }

    /// Commands run for `program`
    pub fn calls_to(&self, program: &str) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }
}

#[async_trait]
impl CommandRunner for MockRunner {
    async fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        self.calls.lock().unwrap().push(command.clone());
        let line = command.to_string();

        if let Some((_, stderr)) = self
            .failures
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| line.contains(fragment.as_str()))
        {
            return Ok(CommandOutput {
                status: Some(1),
                stdout: String::new(),
                stderr: stderr.clone(),
            });
        }

        let stdout = self
            .stdout
            .lock()
            .unwrap()
            .iter()
            .find(|(fragment, _)| line.contains(fragment.as_str()))
            .map(|(_, out)| out.clone())
            .unwrap_or_default();
        Ok(CommandOutput::ok(stdout))
    }
}
