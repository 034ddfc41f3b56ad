//! Implementation of `mergesweep remote`, `local` and `all`

use std::env;
use std::path::PathBuf;

use anyhow::Context;
use mergesweep_core::{
    Config, DeletionOrchestrator, GhCli, GitCli, GitRunner, InteractionAdapter, RepoSlug, RunOptions, SweepError,
    SweepSummary, phase_failed, resolve_repository,
};

use super::GlobalOptions;
use crate::interaction::CliAdapter;
use crate::output::{JsonIssue, JsonResponse, SweepData, print_json};

/// Which branch sets a sweep covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepTarget {
    Remote,
    Local,
    All,
}

impl SweepTarget {
    fn command(self) -> &'static str {
        match self {
            SweepTarget::Remote => "remote",
            SweepTarget::Local => "local",
            SweepTarget::All => "all",
        }
    }
}

/// Everything a sweep needs, resolved from the environment and config
struct SweepContext {
    git: GitCli,
    gh: GhCli,
    config: Config,
}

fn prepare(target: SweepTarget, global: &GlobalOptions) -> Result<SweepContext, SweepError> {
    let cwd = env::current_dir()?;
    let root: Option<PathBuf> = match GitCli::new(&cwd).repository_root() {
        Ok(root) => root,
        // Remote cleanup with an explicit repository works without git
        Err(SweepError::GitNotInstalled) if target == SweepTarget::Remote => None,
        Err(e) => return Err(e),
    };
    if target == SweepTarget::Local && root.is_none() {
        return Err(SweepError::RepositoryNotFound);
    }

    let (config, source) = Config::discover(global.config.as_deref(), root.as_deref())?;
    match &source {
        Some(path) => tracing::debug!(path = %path.display(), "using config file"),
        None => tracing::debug!("using built-in config"),
    }

    let gh = GhCli::default().with_timeout(config.timeout());
    if !gh.is_installed() {
        return Err(SweepError::GhNotInstalled);
    }
    let git = GitCli::new(root.unwrap_or(cwd)).with_timeout(config.timeout());

    Ok(SweepContext { git, gh, config })
}

/// Run a sweep
pub fn run_sweep(
    target: SweepTarget,
    repo: Option<RepoSlug>,
    dry_run: bool,
    force: bool,
    global: &GlobalOptions,
) -> anyhow::Result<i32> {
    let command = target.command();

    let prepared = prepare(target, global).and_then(|ctx| {
        let repo = resolve_repository(repo, &ctx.git)?;
        let protected = ctx.config.protected()?;
        Ok((ctx, repo, protected))
    });
    let (ctx, repo, protected) = match prepared {
        Ok(prepared) => prepared,
        Err(e) if global.json => return json_failure(command, None, &e),
        Err(e) => return Err(e).context(format!("cannot start {} cleanup", command)),
    };
    tracing::debug!(repository = %repo, dry_run, force, "starting sweep");

    let ui = CliAdapter::new().with_quiet(global.quiet || global.json);
    if !dry_run && !force && !ui.is_tty() {
        let e = SweepError::NonInteractive;
        if global.json {
            return json_failure(command, Some(&repo), &e);
        }
        return Err(e.into());
    }

    let options = RunOptions::from_config(&ctx.config, dry_run, force, global.verbose);
    let orchestrator = DeletionOrchestrator::new(
        &ctx.git,
        &ctx.gh,
        &ui,
        protected,
        repo.clone(),
        options,
    );

    match target {
        SweepTarget::Remote | SweepTarget::Local => {
            let result = if target == SweepTarget::Remote {
                orchestrator.run_remote()
            } else {
                orchestrator.run_local()
            };
            match result {
                Ok(summary) => {
                    let code = if summary.is_failure() { 1 } else { 0 };
                    if global.json {
                        print_json(&JsonResponse::ok(
                            command,
                            SweepData {
                                repository: Some(repo.to_string()),
                                runs: vec![summary],
                            },
                        ))?;
                    }
                    Ok(code)
                }
                Err(e) if global.json => json_failure(command, Some(&repo), &e),
                Err(e) => Err(e.into()),
            }
        }
        SweepTarget::All => {
            let outcome = orchestrator.run_all();
            let code = if outcome.succeeded() { 0 } else { 1 };
            if global.json {
                let mut runs: Vec<SweepSummary> = Vec::new();
                let mut issues = Vec::new();
                for (phase, result) in [("remote", &outcome.remote), ("local", &outcome.local)] {
                    match result {
                        Ok(summary) => runs.push(summary.clone()),
                        Err(e) => issues.push(JsonIssue::from(e).in_phase(phase)),
                    }
                }
                let data = SweepData {
                    repository: Some(repo.to_string()),
                    runs,
                };
                let response = if code == 0 {
                    JsonResponse::ok_with_issues(command, data, issues)
                } else {
                    JsonResponse::error(command, data, issues)
                };
                print_json(&response)?;
            } else if !outcome.succeeded() {
                ui.print_error("Both remote and local cleanup failed");
            }
            tracing::debug!(
                remote_failed = phase_failed(&outcome.remote),
                local_failed = phase_failed(&outcome.local),
                "combined run finished"
            );
            Ok(code)
        }
    }
}

fn json_failure(command: &str, repo: Option<&RepoSlug>, err: &SweepError) -> anyhow::Result<i32> {
    let response = JsonResponse::error(
        command,
        SweepData {
            repository: repo.map(ToString::to_string),
            runs: vec![],
        },
        vec![JsonIssue::from(err)],
    );
    print_json(&response)?;
    Ok(err.exit_code())
}
