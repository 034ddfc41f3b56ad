//! Pull-request source
//!
//! [`PullRequestSource`] is read access to a repository's closed pull
//! requests plus get/delete of branch refs. [`GhCli`] implements it on top of
//! `gh api`, conforming to the GitHub REST v3 JSON shapes.

use std::process::Command;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::SweepError;
use crate::process::{CommandOutput, run_with_timeout};
use crate::types::{PullRequest, Reference, RepoIdentity, RepoSlug};

/// GitHub's maximum page size for the pulls endpoint
pub const MAX_PER_PAGE: u32 = 100;

/// Remote access needed by the reconciler and the remote deletion path
pub trait PullRequestSource {
    /// One page (1-based) of closed pull requests, most recently updated first
    fn closed_pull_requests(
        &self,
        repo: &RepoSlug,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PullRequest>, SweepError>;

    /// Current state of `refs/heads/<head_ref>`, `None` when it no longer exists
    fn get_ref(&self, repo: &RepoSlug, head_ref: &str) -> Result<Option<Reference>, SweepError>;

    /// Delete `refs/heads/<head_ref>`
    fn delete_ref(&self, repo: &RepoSlug, head_ref: &str) -> Result<(), SweepError>;

    /// The repository's default branch, when it can be determined
    fn default_branch(&self, repo: &RepoSlug) -> Result<Option<String>, SweepError>;
}

/// Pull request as returned by `GET /repos/{owner}/{repo}/pulls`
#[derive(Debug, Clone, Deserialize)]
pub struct GhPullRequest {
    pub number: u64,
    pub id: u64,
    pub head: GhPullSide,
    pub base: GhPullSide,
    #[serde(default)]
    pub merge_commit_sha: Option<String>,
    #[serde(default)]
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// `head` / `base` object of a pull request
#[derive(Debug, Clone, Deserialize)]
pub struct GhPullSide {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub sha: String,
    /// Null when the repository was deleted
    #[serde(default)]
    pub repo: Option<GhRepository>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhRepository {
    pub name: String,
    pub owner: GhOwner,
    #[serde(default)]
    pub fork: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhOwner {
    pub login: String,
}

/// Object returned by `GET /repos/{owner}/{repo}/git/ref/{ref}`
#[derive(Debug, Clone, Deserialize)]
pub struct GhReference {
    #[serde(rename = "ref")]
    pub ref_name: String,
    pub object: GhObject,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GhObject {
    pub sha: String,
}

impl From<GhRepository> for RepoIdentity {
    fn from(repo: GhRepository) -> Self {
        RepoIdentity {
            owner: repo.owner.login,
            name: repo.name,
            fork: repo.fork,
        }
    }
}

impl TryFrom<GhPullRequest> for PullRequest {
    type Error = SweepError;

    fn try_from(pr: GhPullRequest) -> Result<Self, Self::Error> {
        let base_repo = pr.base.repo.map(RepoIdentity::from).ok_or_else(|| {
            malformed(format!("pull request #{} has no base repository", pr.number))
        })?;

        // GitHub reports a test-merge SHA on closed-unmerged PRs too
        let merge_commit_sha = if pr.merged_at.is_some() {
            pr.merge_commit_sha
        } else {
            None
        };

        Ok(PullRequest {
            number: pr.number,
            id: pr.id,
            head_ref: pr.head.ref_name,
            head_sha: pr.head.sha,
            head_repo: pr.head.repo.map(RepoIdentity::from),
            base_repo,
            merge_commit_sha,
            merged_at: pr.merged_at,
            updated_at: pr.updated_at,
        })
    }
}

fn malformed(detail: String) -> SweepError {
    SweepError::MalformedOutput {
        source_name: "gh".to_string(),
        detail,
    }
}

/// Parse one page of the pulls endpoint
pub fn parse_pull_request_page(json: &str) -> Result<Vec<PullRequest>, SweepError> {
    let page: Vec<GhPullRequest> = serde_json::from_str(json)
        .map_err(|e| malformed(format!("failed to parse pull request page: {}", e)))?;
    page.into_iter().map(PullRequest::try_from).collect()
}

/// Parse a get-ref response
///
/// The API answers a missing ref with a list of refs sharing the prefix (or
/// an object for a different ref); both mean the exact ref is gone.
pub fn parse_ref_response(json: &str, head_ref: &str) -> Result<Option<Reference>, SweepError> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| malformed(format!("failed to parse ref response: {}", e)))?;

    if value.is_array() {
        return Ok(None);
    }

    let reference: GhReference = serde_json::from_value(value)
        .map_err(|e| malformed(format!("failed to parse ref response: {}", e)))?;

    if reference.ref_name != format!("refs/heads/{}", head_ref) {
        return Ok(None);
    }

    Ok(Some(Reference {
        ref_name: reference.ref_name,
        sha: reference.object.sha,
    }))
}

/// Percent-encode a branch name for use in an API path, keeping `/`
pub fn encode_ref_path(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' | b'/' => {
                encoded.push(byte as char)
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// How a failed `gh api` call should be classified
#[derive(Debug, PartialEq, Eq)]
enum ApiFailure {
    NotFound,
    Auth,
    Other,
}

fn classify_failure(stderr: &str) -> ApiFailure {
    if stderr.contains("HTTP 404") || stderr.contains("Not Found") {
        ApiFailure::NotFound
    } else if stderr.contains("HTTP 401")
        || stderr.contains("Bad credentials")
        || stderr.contains("gh auth login")
        || (stderr.contains("HTTP 403") && !stderr.contains("rate limit"))
    {
        ApiFailure::Auth
    } else {
        ApiFailure::Other
    }
}

/// `gh` CLI wrapper
#[derive(Debug, Clone)]
pub struct GhCli {
    /// Path to the gh binary
    pub gh_path: String,
    timeout: Duration,
}

impl Default for GhCli {
    fn default() -> Self {
        Self {
            gh_path: "gh".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl GhCli {
    pub fn new(gh_path: impl Into<String>) -> Self {
        Self {
            gh_path: gh_path.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if gh CLI is installed
    pub fn is_installed(&self) -> bool {
        let mut cmd = Command::new(&self.gh_path);
        cmd.arg("--version");
        run_with_timeout(&mut cmd, self.timeout, SweepError::Io)
            .map(|o| o.success())
            .unwrap_or(false)
    }

    fn api(&self, args: &[&str]) -> Result<CommandOutput, SweepError> {
        let mut cmd = Command::new(&self.gh_path);
        cmd.arg("api")
            .args(["-H", "Accept: application/vnd.github+json"])
            .args(args);
        run_with_timeout(&mut cmd, self.timeout, |e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SweepError::GhNotInstalled
            } else {
                SweepError::GhCommand(format!("failed to run gh api: {}", e))
            }
        })
    }

    fn failure(&self, what: &str, output: &CommandOutput) -> SweepError {
        let stderr = output.stderr.trim().to_string();
        match classify_failure(&stderr) {
            ApiFailure::Auth => SweepError::AuthFailed { reason: stderr },
            _ => SweepError::GhCommand(format!(
                "{} failed with exit code {}: {}",
                what,
                output.exit_code(),
                stderr
            )),
        }
    }
}

impl PullRequestSource for GhCli {
    fn closed_pull_requests(
        &self,
        repo: &RepoSlug,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PullRequest>, SweepError> {
        let endpoint = format!(
            "repos/{}/{}/pulls?state=closed&sort=updated&direction=desc&per_page={}&page={}",
            repo.owner,
            repo.repo,
            per_page.clamp(1, MAX_PER_PAGE),
            page
        );
        let output = self.api(&[&endpoint])?;
        if !output.success() {
            return Err(self.failure("listing pull requests", &output));
        }
        parse_pull_request_page(&output.stdout)
    }

    fn get_ref(&self, repo: &RepoSlug, head_ref: &str) -> Result<Option<Reference>, SweepError> {
        let endpoint = format!(
            "repos/{}/{}/git/ref/heads/{}",
            repo.owner,
            repo.repo,
            encode_ref_path(head_ref)
        );
        let output = self.api(&[&endpoint])?;
        if !output.success() {
            if classify_failure(&output.stderr) == ApiFailure::NotFound {
                return Ok(None);
            }
            return Err(self.failure("looking up ref", &output));
        }
        parse_ref_response(&output.stdout, head_ref)
    }

    fn delete_ref(&self, repo: &RepoSlug, head_ref: &str) -> Result<(), SweepError> {
        let endpoint = format!(
            "repos/{}/{}/git/refs/heads/{}",
            repo.owner,
            repo.repo,
            encode_ref_path(head_ref)
        );
        let output = self.api(&["-X", "DELETE", &endpoint])?;
        if !output.success() {
            return Err(self.failure("deleting ref", &output));
        }
        Ok(())
    }

    fn default_branch(&self, repo: &RepoSlug) -> Result<Option<String>, SweepError> {
        let endpoint = format!("repos/{}/{}", repo.owner, repo.repo);
        let output = self.api(&[&endpoint, "--jq", ".default_branch"])?;
        if !output.success() {
            return Err(self.failure("reading repository", &output));
        }
        let name = output.stdout.trim();
        Ok((!name.is_empty() && name != "null").then(|| name.to_string()))
    }
}
