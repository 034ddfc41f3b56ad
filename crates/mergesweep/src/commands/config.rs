//! Implementation of `mergesweep config show` and `mergesweep config init`

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Subcommand;
use mergesweep_core::{CONFIG_FILE_NAME, Config, GitCli, GitRunner, ProtectedBranchProvider};
use owo_colors::OwoColorize;

use super::GlobalOptions;
use crate::colors::COLORS;
use crate::output::{ConfigData, JsonResponse, print_json};

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the effective configuration and where it came from
    Show,

    /// Write a config file with the default settings
    ///
    /// Writes .mergesweep.json at the repository root, or the --config path.
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn repository_root(cwd: &Path) -> Option<PathBuf> {
    // A missing git binary just means no repository-level config
    GitCli::new(cwd).repository_root().ok().flatten()
}

/// Run `config show`
pub fn run_config_show(global: &GlobalOptions) -> anyhow::Result<i32> {
    let cwd = env::current_dir().context("cannot read current directory")?;
    let root = repository_root(&cwd);
    let (config, source) = Config::discover(global.config.as_deref(), root.as_deref())?;
    let protected = config.effective_protected_branches();

    // Compile now so bad patterns surface here too
    config.protected()?;

    if global.json {
        print_json(&JsonResponse::ok(
            "config show",
            ConfigData {
                path: source.map(|p| p.display().to_string()),
                effective_protected_branches: protected,
                config,
            },
        ))?;
        return Ok(0);
    }
    if global.quiet {
        return Ok(0);
    }

    match &source {
        Some(path) => println!("Config: {}", path.display()),
        None => println!("Config: {}", "built-in defaults".style(COLORS.active)),
    }
    println!("Protected branches:");
    for entry in &protected {
        println!("  {}", entry);
    }
    println!("  {}", "release/*, release-*, hotfix/* (always)".dimmed());
    match config.max_pull_requests {
        Some(max) => println!("Max pull requests: {}", max),
        None => println!("Max pull requests: unlimited"),
    }
    println!("Batch size: {}", config.batch_size);
    println!("Page size: {}", config.per_page);
    println!("Command timeout: {}s", config.timeout_secs);
    Ok(0)
}

/// Run `config init`
pub fn run_config_init(force: bool, global: &GlobalOptions) -> anyhow::Result<i32> {
    let path = match &global.config {
        Some(path) => path.clone(),
        None => {
            let cwd = env::current_dir().context("cannot read current directory")?;
            repository_root(&cwd).unwrap_or(cwd).join(CONFIG_FILE_NAME)
        }
    };

    if path.exists() && !force {
        bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }

    let config = Config::default();
    config
        .save(&path)
        .with_context(|| format!("cannot write {}", path.display()))?;

    if global.json {
        print_json(&JsonResponse::ok(
            "config init",
            ConfigData {
                path: Some(path.display().to_string()),
                effective_protected_branches: config.effective_protected_branches(),
                config,
            },
        ))?;
    } else if !global.quiet {
        println!(
            "{} {}",
            "Created".style(COLORS.success),
            path.display()
        );
    }
    Ok(0)
}
