//! Branch safety evaluation
//!
//! Decides whether a single branch may be deleted. Rules run in a fixed
//! order and the first one that matches decides:
//!
//! 1. current branch
//! 2. protected name (configured list, then the release/hotfix convention)
//! 3. branch tip differs from the PR head
//! 4. PR closed without merging
//! 5. unpushed commits (local mode only)
//!
//! Evaluation is pure; callers fetch the ahead count only for branches that
//! pass rules 1-4.

use std::fmt;

use crate::protected::{ProtectedBranches, ProtectionKind};
use crate::types::{Branch, PullRequest};

/// Why a branch is not safe to delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyReason {
    CurrentBranch,
    ProtectedBranch,
    ReleaseBranch,
    ShaMismatch,
    NotMerged,
    UnpushedCommits(u32),
}

impl fmt::Display for SafetyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SafetyReason::CurrentBranch => write!(f, "current branch"),
            SafetyReason::ProtectedBranch => write!(f, "protected branch"),
            SafetyReason::ReleaseBranch => write!(f, "release/hotfix branch"),
            SafetyReason::ShaMismatch => write!(f, "SHA mismatch with PR head"),
            SafetyReason::NotMerged => write!(f, "PR was not merged"),
            SafetyReason::UnpushedCommits(1) => write!(f, "1 unpushed commit"),
            SafetyReason::UnpushedCommits(n) => write!(f, "{} unpushed commits", n),
        }
    }
}

/// Outcome of evaluating one branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyVerdict {
    pub safe: bool,
    /// Present exactly when `safe` is false
    pub reason: Option<SafetyReason>,
}

impl SafetyVerdict {
    pub fn safe() -> Self {
        Self {
            safe: true,
            reason: None,
        }
    }

    pub fn unsafe_because(reason: SafetyReason) -> Self {
        Self {
            safe: false,
            reason: Some(reason),
        }
    }
}

/// Evaluates branches against one effective configuration
#[derive(Debug, Clone)]
pub struct SafetyEvaluator {
    protected: ProtectedBranches,
    current_branch: String,
}

impl SafetyEvaluator {
    pub fn new(protected: ProtectedBranches, current_branch: impl Into<String>) -> Self {
        Self {
            protected,
            current_branch: current_branch.into(),
        }
    }

    pub fn protected(&self) -> &ProtectedBranches {
        &self.protected
    }

    pub fn current_branch(&self) -> &str {
        &self.current_branch
    }

    /// Classify `branch`
    ///
    /// `ahead_count` is the number of commits not on the upstream. `None`
    /// means unknown or no upstream and is treated as zero.
    pub fn evaluate(
        &self,
        branch: &Branch,
        matching_pr: Option<&PullRequest>,
        ahead_count: Option<u32>,
    ) -> SafetyVerdict {
        match self.first_violation(branch, matching_pr, ahead_count) {
            Some(reason) => SafetyVerdict::unsafe_because(reason),
            None => SafetyVerdict::safe(),
        }
    }

    fn first_violation(
        &self,
        branch: &Branch,
        matching_pr: Option<&PullRequest>,
        ahead_count: Option<u32>,
    ) -> Option<SafetyReason> {
        if branch.is_current || branch.name == self.current_branch {
            return Some(SafetyReason::CurrentBranch);
        }

        match self.protected.matches(&branch.name) {
            Some(ProtectionKind::Configured) => return Some(SafetyReason::ProtectedBranch),
            Some(ProtectionKind::ReleaseConvention) => return Some(SafetyReason::ReleaseBranch),
            None => {}
        }

        if let Some(pr) = matching_pr {
            if branch.sha != pr.head_sha {
                return Some(SafetyReason::ShaMismatch);
            }
            if !pr.is_merged() {
                return Some(SafetyReason::NotMerged);
            }
        }

        match ahead_count {
            Some(n) if n > 0 => Some(SafetyReason::UnpushedCommits(n)),
            _ => None,
        }
    }
}
