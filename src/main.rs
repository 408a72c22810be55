//! governctl - governance automation for a GitHub organization

mod cli;

use anstream::eprintln;
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use cli::check::{PatchArgs, PolicyArgs};
use cli::context::CommandContext;
use cli::merge::MergeArgs;
use cli::style::Stylize;
use governance::assign::AssignOptions;
use governance::config::{DEFAULT_ORG, GovernConfig};
use governance::output::OutputFormat;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "governctl")]
#[command(about = "Keep a GitHub organization's teams, reviewers, labels and merges in line")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Plan and report without changing anything on GitHub
    #[arg(long, global = true, env = "GOVERN_DRY_RUN")]
    dry_run: bool,

    /// GitHub organization
    #[arg(long, global = true, env = "GOVERN_GITHUB_ORG", default_value = DEFAULT_ORG)]
    github_org: String,

    /// GitHub user, used for authenticated clones
    #[arg(long, global = true, env = "GOVERN_GITHUB_USER")]
    github_user: Option<String>,

    /// GitHub token (falls back to GITHUB_TOKEN, GH_TOKEN, then `gh auth token`)
    #[arg(long, global = true, env = "GOVERN_GITHUB_TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// GitHub API endpoint
    #[arg(long, global = true, env = "GOVERN_GITHUB_ENDPOINT")]
    github_endpoint: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, global = true, env = "GOVERN_GITHUB_SKIP_SSL")]
    github_skip_ssl: bool,

    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, env = "GOVERN_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Plain output without colours or spinners
    #[arg(long, global = true, env = "GOVERN_NO_RENDER")]
    no_render: bool,

    /// Repository definitions directory
    #[arg(long, global = true, env = "GOVERN_REPOS_DIR", default_value = "repos")]
    repos_dir: PathBuf,

    /// Team definitions directory
    #[arg(long, global = true, env = "GOVERN_TEAMS_DIR", default_value = "teams")]
    teams_dir: PathBuf,

    /// Working directory to keep clones and patches in
    #[arg(long, global = true, env = "GOVERN_TEMP_DIR")]
    temp_dir: Option<PathBuf>,
}

impl GlobalArgs {
    fn config(&self) -> GovernConfig {
        GovernConfig {
            org: self.github_org.clone(),
            user: self.github_user.clone(),
            token: self.github_token.clone(),
            endpoint: self.github_endpoint.clone(),
            skip_ssl: self.github_skip_ssl,
            dry_run: self.dry_run,
            no_render: self.no_render,
            repos_dir: self.repos_dir.clone(),
            teams_dir: self.teams_dir.clone(),
            temp_dir: self.temp_dir.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Manage teams
    Team {
        #[command(subcommand)]
        command: TeamCommands,
    },
    /// Work on pull requests
    Pr {
        #[command(subcommand)]
        command: PrCommands,
    },
}

#[derive(Subcommand)]
enum TeamCommands {
    /// Push team definitions and memberships to GitHub
    Sync {
        /// Teams to sync (default: all)
        teams: Vec<String>,
    },
}

#[derive(Subcommand)]
enum PrCommands {
    /// Update a pull request from the definitions
    Sync {
        #[command(subcommand)]
        command: PrSyncCommands,
    },
    /// Check a pull request
    Check {
        #[command(subcommand)]
        command: PrCheckCommands,
    },
    /// Merge a pull request
    Merge {
        #[command(flatten)]
        args: MergeArgs,
        /// ORG/REPO/ID, a PR URL, or a repository URL and ID
        #[arg(num_args = 0..=2)]
        pr: Vec<String>,
    },
}

#[derive(Subcommand)]
enum PrSyncCommands {
    /// Add labels matching the changed files
    Labels {
        /// Label definitions directory
        #[arg(long, env = "GOVERN_LABELS_DIR", default_value = ".github/labels")]
        labels_dir: PathBuf,
        /// Local checkout of the PR's repository to read labels from
        #[arg(long, env = "GOVERN_REPO")]
        repo: Option<PathBuf>,
        /// ORG/REPO/ID, a PR URL, or a repository URL and ID
        #[arg(num_args = 0..=2)]
        pr: Vec<String>,
    },
    /// Assign maintainers and request reviewers by workload
    Reviewers {
        /// Number of maintainers to assign
        #[arg(long, env = "GOVERN_NUM_MAINTAINERS", default_value_t = 1)]
        num_maintainers: usize,
        /// Number of reviewers to request
        #[arg(long, env = "GOVERN_NUM_REVIEWERS", default_value_t = 1)]
        num_reviewers: usize,
        /// Local checkout to read CODEOWNERS from
        #[arg(long, env = "GOVERN_REPO")]
        repo: Option<PathBuf>,
        /// ORG/REPO/ID, a PR URL, or a repository URL and ID
        #[arg(num_args = 0..=2)]
        pr: Vec<String>,
    },
}

#[derive(Subcommand)]
enum PrCheckCommands {
    /// Check whether a pull request satisfies the merge policy
    Mergeable {
        #[command(flatten)]
        policy: PolicyArgs,
        /// Output format: table, json, yaml, html
        #[arg(long, short = 'o', env = "GOVERN_OUTPUT", default_value = "table")]
        output: OutputFormat,
        /// ORG/REPO/ID, a PR URL, or a repository URL and ID
        #[arg(num_args = 0..=2)]
        pr: Vec<String>,
    },
    /// Run checkpatch against a pull request
    Patch {
        #[command(flatten)]
        args: PatchArgs,
        /// Output format: table, json, yaml, html
        #[arg(long, short = 'o', env = "GOVERN_OUTPUT", default_value = "table")]
        output: OutputFormat,
        /// ORG/REPO/ID, a PR URL, or a repository URL and ID
        #[arg(num_args = 0..=2)]
        pr: Vec<String>,
    },
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.global.config();
    if config.no_render {
        owo_colors::set_override(false);
    }
    let ctx = CommandContext::new(config)
        .await
        .context("failed to set up GitHub access")?;

    let result = match cli.command {
        Commands::Team {
            command: TeamCommands::Sync { teams },
        } => cli::team::run_team_sync(&ctx, &teams).await,
        Commands::Pr { command } => match command {
            PrCommands::Sync {
                command: PrSyncCommands::Labels {
                    labels_dir,
                    repo,
                    pr,
                },
            } => cli::labels::run_sync_labels(&ctx, &labels_dir, repo.as_deref(), &pr).await,
            PrCommands::Sync {
                command:
                    PrSyncCommands::Reviewers {
                        num_maintainers,
                        num_reviewers,
                        repo,
                        pr,
                    },
            } => {
                let options = AssignOptions {
                    num_maintainers,
                    num_reviewers,
                };
                cli::reviewers::run_sync_reviewers(&ctx, options, repo.as_deref(), &pr).await
            }
            PrCommands::Check {
                command: PrCheckCommands::Mergeable { policy, output, pr },
            } => cli::check::run_check_mergeable(&ctx, &policy.to_policy(), output, &pr).await,
            PrCommands::Check {
                command: PrCheckCommands::Patch { args, output, pr },
            } => cli::check::run_check_patch(&ctx, args, output, &pr).await,
            PrCommands::Merge { args, pr } => cli::merge::run_merge(&ctx, args, &pr).await,
        },
    };
    Ok(result?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.global.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".error());
            ExitCode::FAILURE
        }
    }
}
