//! Integration tests for governctl

#![allow(deprecated)] // cargo_bin is the standard way to test CLI binaries

mod common;

use assert_cmd::Command;
use governance::checkout::{CheckoutOptions, PrCheckout};
use governance::git::{Git, SystemRunner};
use governance::merge::{Gh, MergePlanOptions, create_merge_plan, execute_merge};
use governance::progress::NoProgress;
use governance::types::PrRef;
use predicates::prelude::*;
use std::path::Path;
use std::process::Command as StdCommand;
use tempfile::TempDir;

fn governctl() -> Command {
    let mut cmd = Command::cargo_bin("governctl").unwrap();
    for var in ["GITHUB_ACTIONS", "GITHUB_TOKEN", "GH_TOKEN", "RUST_LOG"] {
        cmd.env_remove(var);
    }
    cmd
}

// =============================================================================
// CLI Tests
// =============================================================================

#[test]
fn test_cli_help() {
    governctl()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("GitHub organization"))
        .stdout(predicate::str::contains("team"))
        .stdout(predicate::str::contains("pr"));
}

#[test]
fn test_cli_version() {
    governctl()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_pr_help_lists_subcommands() {
    governctl()
        .args(["pr", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("merge"));
}

#[test]
fn test_merge_help_shows_policy_flags() {
    governctl()
        .args(["pr", "merge", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--approver-teams"))
        .stdout(predicate::str::contains("--no-check-mergeable"))
        .stdout(predicate::str::contains("--trailer"));
}

#[test]
fn test_invalid_pr_ref() {
    governctl()
        .args(["--github-token", "ghp_test", "pr", "check", "mergeable", "not-a-ref"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid pull request reference"));
}

#[test]
fn test_unknown_output_format() {
    governctl()
        .args([
            "--github-token",
            "ghp_test",
            "pr",
            "check",
            "mergeable",
            "--output",
            "xml",
            "unikraft/unikraft/1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("xml"));
}

#[test]
fn test_invalid_endpoint_is_a_config_error() {
    governctl()
        .args([
            "--github-token",
            "ghp_test",
            "--github-endpoint",
            "not a url",
            "team",
            "sync",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn test_team_sync_without_definitions_fails() {
    let temp = TempDir::new().unwrap();
    governctl()
        .current_dir(temp.path())
        .args(["--github-token", "ghp_test", "team", "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("definition directory not found"));
}

#[test]
fn test_team_sync_with_empty_definitions() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir(temp.path().join("teams")).unwrap();
    governctl()
        .current_dir(temp.path())
        .args(["--github-token", "ghp_test", "--no-render", "team", "sync"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No teams defined"));
}

#[test]
fn test_malformed_team_definition_names_the_file() {
    let temp = TempDir::new().unwrap();
    let teams = temp.path().join("teams");
    std::fs::create_dir(&teams).unwrap();
    std::fs::write(teams.join("sig-net.yaml"), "name: net\nmaintainers:\n  - name: Nobody\n")
        .unwrap();

    governctl()
        .current_dir(temp.path())
        .args(["--github-token", "ghp_test", "--dry-run", "team", "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("sig-net.yaml"));
}

// =============================================================================
// Checkout and Merge Flow Tests (local git only)
// =============================================================================

fn git(dir: &Path, args: &[&str]) {
    let output = StdCommand::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn configure_identity(dir: &Path) {
    git(dir, &["config", "user.name", "Test User"]);
    git(dir, &["config", "user.email", "test@unikraft.org"]);
    git(dir, &["config", "commit.gpgsign", "false"]);
}

fn commit_file(dir: &Path, file: &str, content: &str, message: &str) {
    std::fs::write(dir.join(file), content).unwrap();
    git(dir, &["add", file]);
    git(dir, &["commit", "-q", "-m", message]);
}

/// Bare remote with a `staging` branch and a two-commit PR at `refs/pull/7/head`.
/// `staging` moves on after the PR branched off, so the PR needs a rebase.
fn remote_with_pr() -> TempDir {
    let remote = TempDir::new().unwrap();
    git(remote.path(), &["init", "-q", "--bare"]);

    let seed = TempDir::new().unwrap();
    git(seed.path(), &["init", "-q"]);
    configure_identity(seed.path());
    let remote_path = remote.path().display().to_string();
    git(seed.path(), &["remote", "add", "origin", &remote_path]);

    git(seed.path(), &["checkout", "-q", "-b", "staging"]);
    commit_file(seed.path(), "README.md", "Unikraft\n", "Initial commit");
    git(seed.path(), &["push", "-q", "origin", "staging"]);

    git(seed.path(), &["checkout", "-q", "-b", "feature"]);
    commit_file(
        seed.path(),
        "netif.c",
        "int netif;\n",
        "lib/lwip: Add netif\n\nCloses: #3\n\nSigned-off-by: Test User <test@unikraft.org>",
    );
    commit_file(
        seed.path(),
        "netif.c",
        "int netif;\nint netif_up;\n",
        "lib/lwip: Track netif state\n\nSigned-off-by: Test User <test@unikraft.org>",
    );
    git(seed.path(), &["push", "-q", "origin", "HEAD:refs/pull/7/head"]);

    git(seed.path(), &["checkout", "-q", "staging"]);
    commit_file(seed.path(), "NOTES", "notes\n", "Add notes");
    git(seed.path(), &["push", "-q", "origin", "staging"]);

    remote
}

fn pull_request() -> governance::types::PullRequest {
    let mut pr = common::make_pr(7);
    pr.base_ref = "staging".to_string();
    pr.commits = Some(2);
    pr
}

#[tokio::test]
async fn test_checkout_rebases_pr_and_collects_patches() {
    let remote = remote_with_pr();
    let work = TempDir::new().unwrap();
    let remote_path = remote.path().display().to_string();
    let clone_path = work.path().display().to_string();
    git(
        work.path(),
        &["clone", "-q", "--branch", "staging", &remote_path, &clone_path],
    );
    configure_identity(work.path());

    let runner = SystemRunner;
    let pr_ref = PrRef::new("unikraft", "unikraft", 7);
    let options = CheckoutOptions {
        workdir: work.path().to_path_buf(),
        existing: Some(work.path().to_path_buf()),
        ..CheckoutOptions::default()
    };
    let checkout = PrCheckout::prepare(&runner, &pr_ref, &pull_request(), &options)
        .await
        .unwrap();

    assert_eq!(checkout.base, "staging");
    let titles: Vec<&str> = checkout.patches.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, ["lib/lwip: Add netif", "lib/lwip: Track netif state"]);
    assert!(checkout.patches[1].diff.contains("+int netif_up;"));

    let files = checkout
        .write_patches(&pr_ref, &work.path().join("patches"))
        .unwrap();
    assert_eq!(files.len(), 2);
    assert!(files[0].ends_with("unikraft-pr-7-1-lib-lwip-Add-netif.patch"));
}

#[tokio::test]
async fn test_dry_run_merge_applies_patches_locally() {
    let remote = remote_with_pr();
    let work = TempDir::new().unwrap();
    let remote_path = remote.path().display().to_string();
    let clone_path = work.path().display().to_string();
    git(
        work.path(),
        &["clone", "-q", "--branch", "staging", &remote_path, &clone_path],
    );
    configure_identity(work.path());

    let runner = SystemRunner;
    let pr_ref = PrRef::new("unikraft", "unikraft", 7);
    let options = CheckoutOptions {
        workdir: work.path().to_path_buf(),
        existing: Some(work.path().to_path_buf()),
        ..CheckoutOptions::default()
    };
    let checkout = PrCheckout::prepare(&runner, &pr_ref, &pull_request(), &options)
        .await
        .unwrap();

    let plan = create_merge_plan(
        &pr_ref,
        "staging",
        None,
        &checkout.patches,
        None,
        &MergePlanOptions {
            trailers: vec!["Approved-by: Alice <alice@unikraft.org>".to_string()],
            push: true,
            ..MergePlanOptions::default()
        },
    );
    assert_eq!(plan.issues, [3]);

    let gh = Gh::new(&runner, pr_ref.repo_slug(), checkout.dir(), None);
    let result = execute_merge(&plan, &checkout.git, &gh, true, &NoProgress)
        .await
        .unwrap();
    assert!(result.warnings.is_empty());
    assert_eq!(result.skipped.len(), plan.remote_steps().count());

    let log = StdCommand::new("git")
        .args(["log", "-2", "--format=%B", "staging"])
        .current_dir(work.path())
        .output()
        .unwrap();
    let log = String::from_utf8_lossy(&log.stdout);
    assert!(log.contains("lib/lwip: Track netif state"));
    assert!(log.contains("Approved-by: Alice <alice@unikraft.org>"));
    assert!(log.contains("GitHub-Closes: #7"));

    // Nothing reached the remote
    let remote_git = Git::new(&runner, remote.path());
    let remote_log = remote_git.rev_list("staging").await.unwrap();
    assert_eq!(remote_log.len(), 2);
}
