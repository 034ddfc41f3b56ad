//! CLI argument parsing with clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mergesweep_core::RepoSlug;

use crate::commands::ConfigCommands;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// mergesweep - Delete branches whose pull requests have been merged
#[derive(Parser)]
#[command(name = "mergesweep")]
#[command(version = VERSION)]
#[command(about = "Delete git branches whose pull requests have been merged")]
#[command(long_about = "mergesweep finds branches whose GitHub pull requests were merged and deletes them, locally, on the remote, or both.\n\nA branch is only deleted when it is not checked out, not protected, still points at the commit the pull request merged, and (locally) has no unpushed commits. Squash and rebase merges are handled.\n\nGitHub access goes through the gh CLI, so `gh auth login` must have been run.")]
pub struct Cli {
    /// Increase output verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Config file to use instead of the discovered one
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Delete remote head branches of merged pull requests
    #[command(long_about = "Delete remote head branches of merged pull requests.\n\nOnly pull requests opened from the repository itself are considered; fork branches are never touched. A branch that received new commits after the merge is kept.")]
    Remote {
        #[command(flatten)]
        target: SweepArgs,
    },

    /// Delete local branches whose pull requests were merged
    #[command(long_about = "Delete local branches whose pull requests were merged.\n\nBranches are force-deleted (git branch -D) because squash and rebase merges leave no ancestry. Branches with unpushed commits are kept.")]
    Local {
        #[command(flatten)]
        target: SweepArgs,
    },

    /// Clean up remote branches, then local branches
    ///
    /// Fails only when both phases fail.
    All {
        #[command(flatten)]
        target: SweepArgs,
    },

    /// Show or create configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Arguments shared by the sweep subcommands
#[derive(clap::Args, Debug, Clone)]
pub struct SweepArgs {
    /// Repository as owner/repo (defaults to the origin remote)
    #[arg(value_name = "OWNER/REPO", value_parser = parse_repo_slug)]
    pub repo: Option<RepoSlug>,

    /// Show what would be deleted without deleting anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Delete without asking for confirmation
    #[arg(short, long)]
    pub force: bool,
}

fn parse_repo_slug(value: &str) -> Result<RepoSlug, String> {
    value.parse().map_err(|e: mergesweep_core::SweepError| e.to_string())
}

/// Get the command args for use in the application
pub fn parse() -> Cli {
    Cli::parse()
}
