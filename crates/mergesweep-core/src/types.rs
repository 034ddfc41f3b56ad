//! Core data types for mergesweep

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::SweepError;

static OWNER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?$").expect("valid owner regex")
});

static REPO_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._-]+$").expect("valid repo regex"));

/// A local or remote branch, snapshotted for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    /// Short branch name (e.g. `feature/x`)
    pub name: String,
    /// Commit the ref currently points to
    pub sha: String,
    /// Whether this is the checked-out branch (local only)
    #[serde(default)]
    pub is_current: bool,
    /// Date of the tip commit, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_commit_date: Option<DateTime<Utc>>,
}

impl Branch {
    /// Create a non-current branch snapshot
    pub fn new(name: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sha: sha.into(),
            is_current: false,
            last_commit_date: None,
        }
    }

    /// Mark this branch as the checked-out one
    pub fn current(mut self) -> Self {
        self.is_current = true;
        self
    }
}

/// Owner/name identity of a repository as reported on a pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoIdentity {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub fork: bool,
}

impl RepoIdentity {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            fork: false,
        }
    }

    /// Same owner and name, compared case-insensitively like GitHub does
    pub fn same_repository(&self, other: &RepoIdentity) -> bool {
        self.owner.eq_ignore_ascii_case(&other.owner)
            && self.name.eq_ignore_ascii_case(&other.name)
    }
}

/// A closed pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub id: u64,
    /// Branch the PR was opened from
    pub head_ref: String,
    /// Head commit recorded on the PR
    pub head_sha: String,
    /// None when the head repository was deleted
    pub head_repo: Option<RepoIdentity>,
    pub base_repo: RepoIdentity,
    /// Present only when the PR was merged
    pub merge_commit_sha: Option<String>,
    pub merged_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl PullRequest {
    pub fn is_merged(&self) -> bool {
        self.merge_commit_sha.is_some()
    }

    /// Head and base live in the same repository (not a cross-fork PR)
    pub fn is_same_repository(&self) -> bool {
        self.head_repo
            .as_ref()
            .is_some_and(|head| head.same_repository(&self.base_repo))
    }
}

/// Live state of a git reference on the remote host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// Fully qualified name, e.g. `refs/heads/feature-x`
    pub ref_name: String,
    pub sha: String,
}

/// Commits a branch has that its upstream lacks, and vice versa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AheadBehind {
    pub ahead: u32,
    pub behind: u32,
}

/// A validated `owner/repo` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoSlug {
    pub owner: String,
    pub repo: String,
}

impl RepoSlug {
    pub fn new(owner: &str, repo: &str) -> Result<Self, SweepError> {
        let value = format!("{}/{}", owner, repo);
        if !OWNER_RE.is_match(owner) {
            return Err(SweepError::InvalidRepoSlug {
                value,
                reason: "owner must be alphanumeric with inner hyphens".to_string(),
            });
        }
        if !REPO_RE.is_match(repo) {
            return Err(SweepError::InvalidRepoSlug {
                value,
                reason: "repository name may only contain letters, digits, '.', '_' and '-'"
                    .to_string(),
            });
        }
        Ok(Self {
            owner: owner.to_string(),
            repo: repo.to_string(),
        })
    }

    /// Derive the slug from a remote URL
    ///
    /// Accepts `https://host/owner/repo(.git)`, `git@host:owner/repo(.git)`
    /// and `ssh://git@host/owner/repo(.git)`.
    pub fn from_remote_url(url: &str) -> Result<Self, SweepError> {
        let url = url.trim();
        let path = if let Some((_, rest)) = url.split_once("://") {
            rest.split_once('/').map(|(_, path)| path)
        } else if let Some((_, path)) = url.split_once(':') {
            Some(path)
        } else {
            None
        };

        let path = path
            .map(|p| p.trim_end_matches('/'))
            .map(|p| p.strip_suffix(".git").unwrap_or(p))
            .ok_or(SweepError::RepoNotDetected)?;

        match path.rsplit_once('/') {
            Some((owner, repo)) if !owner.contains('/') => RepoSlug::new(owner, repo),
            _ => Err(SweepError::RepoNotDetected),
        }
    }
}

impl FromStr for RepoSlug {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((owner, repo)) => RepoSlug::new(owner, repo),
            None => Err(SweepError::InvalidRepoSlug {
                value: s.to_string(),
                reason: "expected owner/repo".to_string(),
            }),
        }
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
