//! Error types for mergesweep operations

use thiserror::Error;

/// Core error type for mergesweep operations
///
/// These are operational failures. Safety skips are not errors; see
/// [`crate::safety::SafetyReason`].
#[derive(Error, Debug)]
pub enum SweepError {
    // === Environment errors (E001-E004) ===
    /// E001: Not inside a git repository
    #[error("E001: Not a git repository (or any of the parent directories)")]
    RepositoryNotFound,

    /// E002: git executable not found
    #[error("E002: git not installed or not found on PATH")]
    GitNotInstalled,

    /// E003: gh executable not found
    #[error("E003: gh CLI not installed. Install from https://cli.github.com/")]
    GhNotInstalled,

    /// E004: GitHub authentication or authorization failure
    #[error(
        "E004: GitHub authentication failed: {reason}\n  Run `gh auth login` or set GH_TOKEN with `repo` scope"
    )]
    AuthFailed { reason: String },

    // === Collaborator errors (E010-E013) ===
    /// E010: git command failed
    #[error("E010: git command failed: {0}")]
    GitCommand(String),

    /// E011: gh command failed
    #[error("E011: gh command failed: {0}")]
    GhCommand(String),

    /// E012: Collaborator output could not be parsed
    #[error("E012: Malformed output from {source_name}: {detail}")]
    MalformedOutput { source_name: String, detail: String },

    /// E013: Subprocess did not finish in time
    #[error("E013: '{command}' timed out after {secs} seconds")]
    Timeout { command: String, secs: u64 },

    // === Input and configuration errors (E020-E023) ===
    /// E020: Invalid owner/repo argument
    #[error("E020: Invalid repository '{value}': {reason}")]
    InvalidRepoSlug { value: String, reason: String },

    /// E021: Repository could not be inferred from the clone
    #[error("E021: Could not determine owner/repo; pass it explicitly (e.g. `mergesweep local octo/widgets`)")]
    RepoNotDetected,

    /// E022: Protected branch pattern failed to compile
    #[error("E022: Invalid protected branch pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// E023: Configuration error
    #[error("E023: configuration error: {0}")]
    Config(String),

    // === Interaction errors (E030) ===
    /// E030: Confirmation required but stdin is not a terminal
    #[error("E030: Interactive confirmation needs a terminal; pass --force or --dry-run")]
    NonInteractive,

    // === IO and system errors ===
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SweepError {
    /// Get the error code (e.g., "E001", "E010")
    pub fn code(&self) -> &'static str {
        match self {
            SweepError::RepositoryNotFound => "E001",
            SweepError::GitNotInstalled => "E002",
            SweepError::GhNotInstalled => "E003",
            SweepError::AuthFailed { .. } => "E004",
            SweepError::GitCommand(_) => "E010",
            SweepError::GhCommand(_) => "E011",
            SweepError::MalformedOutput { .. } => "E012",
            SweepError::Timeout { .. } => "E013",
            SweepError::InvalidRepoSlug { .. } => "E020",
            SweepError::RepoNotDetected => "E021",
            SweepError::InvalidPattern { .. } => "E022",
            SweepError::Config(_) => "E023",
            SweepError::NonInteractive => "E030",
            SweepError::Io(_) => "E040",
            SweepError::Json(_) => "E041",
        }
    }

    /// Get the exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            SweepError::RepositoryNotFound => 3, // Nothing to operate on

            SweepError::GitNotInstalled | SweepError::GhNotInstalled => 5, // Missing tooling

            SweepError::AuthFailed { .. } => 6, // Needs user action

            SweepError::GitCommand(_)
            | SweepError::GhCommand(_)
            | SweepError::MalformedOutput { .. }
            | SweepError::Timeout { .. } => 1, // Collaborator failures

            SweepError::InvalidRepoSlug { .. } | SweepError::RepoNotDetected => 2, // Usage errors

            SweepError::InvalidPattern { .. } | SweepError::Config(_) => 4, // Configuration

            SweepError::NonInteractive => 2, // Usage error

            SweepError::Io(_) | SweepError::Json(_) => 1,
        }
    }

    /// Whether this error should abort the whole run rather than one branch
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SweepError::RepositoryNotFound
                | SweepError::GitNotInstalled
                | SweepError::GhNotInstalled
                | SweepError::AuthFailed { .. }
        )
    }
}
