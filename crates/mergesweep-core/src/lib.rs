//! mergesweep-core: Core library for finding and deleting merged branches
//!
//! This crate holds the safety rules, the git and GitHub adapters, and the
//! orchestration that ties them together. Terminal interaction lives in the
//! binary behind [`InteractionAdapter`].

/// Core error types for mergesweep operations
pub mod error;

/// Core data types (Branch, PullRequest, RepoSlug, etc.)
pub mod types;

/// Protected branch lists and name patterns
pub mod protected;

/// Per-branch safety rules
pub mod safety;

/// Child process execution with timeouts
mod process;

/// Local git access
pub mod git;

/// GitHub access through the gh CLI
pub mod github;

/// Lazy pull request pagination
pub mod pagination;

/// Matching pull requests to branches
pub mod reconcile;

/// Configuration handling
pub mod config;

/// User interaction contract
pub mod interaction;

/// Scan, confirm, delete and report
pub mod orchestrator;

// Re-exports for convenience
pub use config::{CONFIG_FILE_NAME, Config, ProtectedBranchProvider};
pub use error::SweepError;
pub use git::{GitCli, GitRunner};
pub use github::{GhCli, PullRequestSource};
pub use interaction::{
    GateState, InteractionAdapter, InteractionError, InteractionResult, ProgressHandle,
    SelectionGate,
};
pub use orchestrator::{
    CombinedOutcome, DeletionOrchestrator, FailedBranch, RunOptions, SkippedBranch, SweepMode,
    SweepSummary, phase_failed, resolve_repository,
};
pub use pagination::PullRequestPages;
pub use protected::{
    DEFAULT_PROTECTED_BRANCHES, DEFAULTS_PLACEHOLDER, NamePattern, ProtectedBranches,
    expand_protected_branches,
};
pub use safety::{SafetyEvaluator, SafetyReason, SafetyVerdict};
pub use types::{AheadBehind, Branch, PullRequest, Reference, RepoIdentity, RepoSlug};
