//! governance: automation for a GitHub organization's governance
//!
//! The library behind `governctl`. It keeps teams, reviewers, labels and
//! merges of an organization in line with declarative YAML definitions:
//!
//! - [`teamsync`] walks the team hierarchy parent-first and reconciles
//!   GitHub teams and their `maintainers-`/`reviewers-` sub-teams
//! - [`assign`] picks the least-loaded maintainers and reviewers for a PR
//! - [`labeling`] adds labels whose path globs match a PR's changed files
//! - [`mergeable`] decides whether a PR satisfies a merge policy and
//!   extracts trailer values from approval comments
//! - [`checkpatch`] and [`merge`] lint and land a PR's commits through
//!   `git` and `gh`
//!
//! GitHub is reached only through [`platform::PlatformService`] and external
//! processes only through [`git::CommandRunner`], so every orchestrator can
//! be driven by mocks.

pub mod assign;
pub mod auth;
pub mod checkout;
pub mod checkpatch;
pub mod codeowners;
pub mod config;
pub mod definitions;
pub mod error;
pub mod git;
pub mod labeling;
pub mod merge;
pub mod mergeable;
pub mod output;
pub mod patch;
pub mod platform;
pub mod progress;
pub mod teamsync;
pub mod types;
pub mod workload;
