//! Git command runner
//!
//! [`GitRunner`] is the narrow contract the orchestrator needs from a local
//! clone. [`GitCli`] implements it by invoking the `git` executable.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::SweepError;
use crate::process::{CommandOutput, describe, run_with_timeout};
use crate::types::{AheadBehind, Branch};

/// Default per-command timeout
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(30);

/// Operations the deletion engine needs from a local clone
pub trait GitRunner {
    /// Whether the working directory is inside a git work tree
    fn is_repository(&self) -> Result<bool, SweepError>;

    /// Top-level directory of the work tree, if inside one
    fn repository_root(&self) -> Result<Option<PathBuf>, SweepError>;

    /// All local branches (`refs/heads/*`)
    fn list_local_branches(&self) -> Result<Vec<Branch>, SweepError>;

    /// Name of the checked-out branch; empty on a detached HEAD
    fn current_branch_name(&self) -> Result<String, SweepError>;

    /// Ahead/behind counts against the upstream; `None` when no upstream is set
    fn ahead_behind(&self, branch: &str) -> Result<Option<AheadBehind>, SweepError>;

    /// Delete a local branch (`-D` when `force`, otherwise `-d`)
    fn delete_local_branch(&self, name: &str, force: bool) -> Result<(), SweepError>;

    /// URL of the `origin` remote, if configured
    fn origin_url(&self) -> Result<Option<String>, SweepError>;
}

/// `git` subprocess implementation of [`GitRunner`]
#[derive(Debug, Clone)]
pub struct GitCli {
    repo_root: PathBuf,
    timeout: Duration,
}

impl GitCli {
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            timeout: DEFAULT_GIT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn git(&self, args: &[&str]) -> Result<CommandOutput, SweepError> {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.repo_root).args(args);
        run_with_timeout(&mut cmd, self.timeout, |e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SweepError::GitNotInstalled
            } else {
                SweepError::GitCommand(format!("failed to run git: {}", e))
            }
        })
    }

    /// Run git and require a zero exit status
    fn git_checked(&self, args: &[&str]) -> Result<String, SweepError> {
        let output = self.git(args)?;
        if !output.success() {
            let mut cmd = Command::new("git");
            cmd.args(args);
            return Err(SweepError::GitCommand(format!(
                "'{}' failed with exit code {}: {}",
                describe(&cmd),
                output.exit_code(),
                output.stderr.trim()
            )));
        }
        Ok(output.stdout)
    }
}

const BRANCH_FORMAT: &str =
    "--format=%(refname:lstrip=2)%00%(objectname)%00%(HEAD)%00%(committerdate:iso-strict)";

impl GitRunner for GitCli {
    fn is_repository(&self) -> Result<bool, SweepError> {
        let output = self.git(&["rev-parse", "--is-inside-work-tree"])?;
        Ok(output.success() && output.stdout.trim() == "true")
    }

    fn repository_root(&self) -> Result<Option<PathBuf>, SweepError> {
        let output = self.git(&["rev-parse", "--show-toplevel"])?;
        if !output.success() {
            return Ok(None);
        }
        Ok(Some(PathBuf::from(output.stdout.trim())))
    }

    fn list_local_branches(&self) -> Result<Vec<Branch>, SweepError> {
        let stdout = self.git_checked(&["for-each-ref", BRANCH_FORMAT, "refs/heads/"])?;
        parse_branch_list(&stdout)
    }

    fn current_branch_name(&self) -> Result<String, SweepError> {
        let output = self.git(&["symbolic-ref", "--quiet", "HEAD"])?;
        if output.success() {
            let head = output.stdout.trim();
            Ok(head.strip_prefix("refs/heads/").unwrap_or(head).to_string())
        } else {
            // Detached HEAD
            Ok(String::new())
        }
    }

    fn ahead_behind(&self, branch: &str) -> Result<Option<AheadBehind>, SweepError> {
        let upstream = format!("{}@{{upstream}}", branch);
        let has_upstream = self
            .git(&["rev-parse", "--abbrev-ref", "--verify", "--quiet", &upstream])?
            .success();
        if !has_upstream {
            return Ok(None);
        }

        // Full ref on the local side so a tag with the same name cannot win
        let range = format!("refs/heads/{}...{}", branch, upstream);
        let stdout = self.git_checked(&["rev-list", "--left-right", "--count", &range])?;
        parse_ahead_behind(&stdout).map(Some)
    }

    fn delete_local_branch(&self, name: &str, force: bool) -> Result<(), SweepError> {
        let flag = if force { "-D" } else { "-d" };
        self.git_checked(&["branch", flag, name])?;
        Ok(())
    }

    fn origin_url(&self) -> Result<Option<String>, SweepError> {
        let output = self.git(&["remote", "get-url", "origin"])?;
        if !output.success() {
            return Ok(None);
        }
        let url = output.stdout.trim();
        Ok((!url.is_empty()).then(|| url.to_string()))
    }
}

fn malformed(detail: String) -> SweepError {
    SweepError::MalformedOutput {
        source_name: "git".to_string(),
        detail,
    }
}

/// Parse NUL-separated `for-each-ref` output (see [`BRANCH_FORMAT`])
pub fn parse_branch_list(stdout: &str) -> Result<Vec<Branch>, SweepError> {
    let mut branches = Vec::new();
    for line in stdout.lines().filter(|l| !l.trim().is_empty()) {
        let fields: Vec<&str> = line.split('\0').collect();
        let [name, sha, head, date] = fields.as_slice() else {
            return Err(malformed(format!("unexpected branch line: {:?}", line)));
        };

        if name.is_empty() || sha.is_empty() || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(malformed(format!("unexpected branch line: {:?}", line)));
        }

        let last_commit_date = DateTime::parse_from_rfc3339(date.trim())
            .ok()
            .map(|d| d.with_timezone(&Utc));

        branches.push(Branch {
            name: name.to_string(),
            sha: sha.to_string(),
            is_current: head.trim() == "*",
            last_commit_date,
        });
    }
    Ok(branches)
}

/// Parse `rev-list --left-right --count` output (`<ahead>\t<behind>`)
pub fn parse_ahead_behind(stdout: &str) -> Result<AheadBehind, SweepError> {
    let mut counts = stdout.split_whitespace().map(str::parse::<u32>);
    match (counts.next(), counts.next(), counts.next()) {
        (Some(Ok(ahead)), Some(Ok(behind)), None) => Ok(AheadBehind { ahead, behind }),
        _ => Err(malformed(format!(
            "unexpected ahead/behind output: {:?}",
            stdout.trim()
        ))),
    }
}
