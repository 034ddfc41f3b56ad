//! Protected branch resolution and matching
//!
//! The configured list may contain the [`DEFAULTS_PLACEHOLDER`] token, which
//! expands in place to [`DEFAULT_PROTECTED_BRANCHES`]. Entries are exact names,
//! globs (`*` matches any characters, `/` included) or regexes written as
//! `/.../`. Everything is compared case-insensitively.
//!
//! Independent of configuration, `release/…`, `release-…` and `hotfix/…`
//! branches are always protected.

use std::collections::HashSet;

use regex::Regex;

use crate::error::SweepError;

/// Token that expands to the built-in defaults
pub const DEFAULTS_PLACEHOLDER: &str = "$defaults";

/// Built-in protected list, used when nothing is configured
pub const DEFAULT_PROTECTED_BRANCHES: &[&str] = &[
    "main",
    "master",
    "develop",
    "dev",
    "staging",
    "production",
    "prod",
    "release/*",
    "release-*",
    "hotfix/*",
];

const RELEASE_CONVENTION_PREFIXES: &[&str] = &["release/", "release-", "hotfix/"];

/// How a branch name came to be protected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionKind {
    /// Matched an entry of the effective protected list
    Configured,
    /// Matched only the standing release/hotfix naming convention
    ReleaseConvention,
}

/// Expand the placeholder and remove duplicates, preserving first-seen order
///
/// An empty list means "defaults". Duplicate detection ignores case.
pub fn expand_protected_branches<S: AsRef<str>>(raw: &[S]) -> Vec<String> {
    if raw.is_empty() {
        return DEFAULT_PROTECTED_BRANCHES
            .iter()
            .map(|s| s.to_string())
            .collect();
    }

    let mut seen = HashSet::new();
    let mut expanded = Vec::new();
    let mut push_unique = |entry: &str| {
        if seen.insert(entry.to_lowercase()) {
            expanded.push(entry.to_string());
        }
    };

    for entry in raw {
        let entry = entry.as_ref().trim();
        if entry.is_empty() {
            continue;
        }
        if entry == DEFAULTS_PLACEHOLDER {
            for &default in DEFAULT_PROTECTED_BRANCHES {
                push_unique(default);
            }
        } else {
            push_unique(entry);
        }
    }

    expanded
}

/// Whether a branch follows the release/hotfix naming convention
pub fn is_release_convention(name: &str) -> bool {
    let lower = name.to_lowercase();
    RELEASE_CONVENTION_PREFIXES
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

/// One compiled entry of a protected list
#[derive(Debug, Clone)]
pub enum NamePattern {
    /// Lowercased exact name
    Exact(String),
    /// Glob or `/regex/`, compiled case-insensitively
    Pattern(Regex),
}

impl NamePattern {
    /// Compile an entry: `/regex/`, a glob containing `*`, or an exact name
    pub fn parse(entry: &str) -> Result<Self, SweepError> {
        let invalid = |reason: String| SweepError::InvalidPattern {
            pattern: entry.to_string(),
            reason,
        };

        if entry.len() >= 2 && entry.starts_with('/') && entry.ends_with('/') {
            let body = &entry[1..entry.len() - 1];
            if body.is_empty() {
                return Err(invalid("empty regex".to_string()));
            }
            return Regex::new(&format!("(?i){}", body))
                .map(NamePattern::Pattern)
                .map_err(|e| invalid(e.to_string()));
        }

        if entry.contains('*') {
            let body = entry
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            return Regex::new(&format!("(?i)^{}$", body))
                .map(NamePattern::Pattern)
                .map_err(|e| invalid(e.to_string()));
        }

        Ok(NamePattern::Exact(entry.to_lowercase()))
    }

    pub fn is_match(&self, name: &str) -> bool {
        match self {
            NamePattern::Exact(exact) => *exact == name.to_lowercase(),
            NamePattern::Pattern(re) => re.is_match(name),
        }
    }
}

/// Effective protected list, validated and compiled once
#[derive(Debug, Clone)]
pub struct ProtectedBranches {
    entries: Vec<String>,
    rules: Vec<NamePattern>,
}

impl ProtectedBranches {
    /// Compile an already-expanded list
    ///
    /// Fails on the first pattern that does not compile.
    pub fn compile<S: AsRef<str>>(effective: &[S]) -> Result<Self, SweepError> {
        let mut protected = Self {
            entries: Vec::with_capacity(effective.len()),
            rules: Vec::with_capacity(effective.len()),
        };
        for entry in effective {
            protected.push(entry.as_ref())?;
        }
        Ok(protected)
    }

    /// Expand a raw configured list and compile it
    pub fn from_configured<S: AsRef<str>>(raw: &[S]) -> Result<Self, SweepError> {
        Self::compile(&expand_protected_branches(raw))
    }

    /// The built-in defaults
    pub fn defaults() -> Self {
        Self::compile(DEFAULT_PROTECTED_BRANCHES).expect("built-in patterns compile")
    }

    /// Add one more exact name (e.g. the repository's default branch)
    ///
    /// Names already covered by an existing entry are not duplicated.
    pub fn with_exact(mut self, name: &str) -> Self {
        let lower = name.to_lowercase();
        let present = self
            .rules
            .iter()
            .any(|rule| matches!(rule, NamePattern::Exact(existing) if *existing == lower));
        if !present && !name.is_empty() {
            self.entries.push(name.to_string());
            self.rules.push(NamePattern::Exact(lower));
        }
        self
    }

    /// Effective entries in order
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Report whether and how `name` is protected
    pub fn matches(&self, name: &str) -> Option<ProtectionKind> {
        let configured = self.rules.iter().any(|rule| rule.is_match(name));

        if configured {
            Some(ProtectionKind::Configured)
        } else if is_release_convention(name) {
            Some(ProtectionKind::ReleaseConvention)
        } else {
            None
        }
    }

    pub fn is_protected(&self, name: &str) -> bool {
        self.matches(name).is_some()
    }

    fn push(&mut self, entry: &str) -> Result<(), SweepError> {
        let rule = NamePattern::parse(entry)?;
        self.entries.push(entry.to_string());
        self.rules.push(rule);
        Ok(())
    }
}

impl Default for ProtectedBranches {
    fn default() -> Self {
        Self::defaults()
    }
}
