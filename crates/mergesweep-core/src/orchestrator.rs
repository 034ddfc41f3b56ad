//! Deletion orchestration
//!
//! Drives one run: scan, reconcile, evaluate, confirm, delete, report. The
//! remote and local flows share partitioning, confirmation and execution;
//! `run_all` runs both and tolerates one of them failing.
//!
//! Dry-run performs every step except the mutating call and reports each
//! would-be deletion exactly where a live run reports a deletion.

use serde::Serialize;

use crate::config::Config;
use crate::error::SweepError;
use crate::git::GitRunner;
use crate::github::PullRequestSource;
use crate::interaction::{InteractionAdapter, InteractionError};
use crate::pagination::PullRequestPages;
use crate::protected::{NamePattern, ProtectedBranches};
use crate::reconcile::{match_local_branches, reconcile_local, reconcile_remote};
use crate::safety::{SafetyEvaluator, SafetyVerdict};
use crate::types::{Branch, PullRequest, RepoSlug};

/// Unsafe branches listed before collapsing into "and N more"
const UNSAFE_DISPLAY_LIMIT: usize = 20;

/// Which branch set a run operates on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMode {
    Remote,
    Local,
}

impl std::fmt::Display for SweepMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweepMode::Remote => write!(f, "remote"),
            SweepMode::Local => write!(f, "local"),
        }
    }
}

/// Per-run settings, passed explicitly rather than held globally
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Perform every step except the deletion itself
    pub dry_run: bool,
    /// Skip interactive confirmation
    pub force: bool,
    /// Report per-branch detail
    pub verbose: bool,
    pub batch_size: usize,
    pub per_page: u32,
    pub max_pull_requests: Option<usize>,
}

impl RunOptions {
    pub fn from_config(config: &Config, dry_run: bool, force: bool, verbose: bool) -> Self {
        Self {
            dry_run,
            force,
            verbose,
            batch_size: config.batch_size.max(1),
            per_page: config.per_page,
            max_pull_requests: config.max_pull_requests,
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&Config::default(), false, false, false)
    }
}

/// One branch of the deletion plan
#[derive(Debug, Clone)]
pub struct PlannedBranch {
    pub branch: Branch,
    pub verdict: SafetyVerdict,
    pub pull_request: Option<PullRequest>,
}

impl PlannedBranch {
    fn label(&self) -> String {
        match &self.pull_request {
            Some(pr) => format!("{} (PR #{})", self.branch.name, pr.number),
            None => self.branch.name.clone(),
        }
    }
}

/// Branch skipped as unsafe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedBranch {
    pub name: String,
    pub reason: String,
}

/// Branch whose deletion (or a check before it) failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedBranch {
    pub name: String,
    pub error: String,
}

/// Result of one mode's run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub mode: SweepMode,
    pub repository: String,
    pub dry_run: bool,
    pub cancelled: bool,
    /// Pull requests read from the source
    pub scanned_pull_requests: usize,
    /// The PR cap hid older history
    pub truncated: bool,
    /// Safe branches offered for deletion
    pub candidates: Vec<String>,
    /// Deleted branches, or branches that would be deleted in a dry run
    pub deleted: Vec<String>,
    pub failed: Vec<FailedBranch>,
    pub skipped: Vec<SkippedBranch>,
}

impl SweepSummary {
    fn new(mode: SweepMode, repo: &RepoSlug, dry_run: bool) -> Self {
        Self {
            mode,
            repository: repo.to_string(),
            dry_run,
            cancelled: false,
            scanned_pull_requests: 0,
            truncated: false,
            candidates: Vec::new(),
            deleted: Vec::new(),
            failed: Vec::new(),
            skipped: Vec::new(),
        }
    }

    /// Every attempted deletion failed
    pub fn is_failure(&self) -> bool {
        !self.failed.is_empty() && self.deleted.is_empty()
    }
}

/// Outcome of `run_all`: both phases, each captured independently
#[derive(Debug)]
pub struct CombinedOutcome {
    pub remote: Result<SweepSummary, SweepError>,
    pub local: Result<SweepSummary, SweepError>,
}

impl CombinedOutcome {
    /// Failure only when both phases failed
    pub fn succeeded(&self) -> bool {
        !phase_failed(&self.remote) || !phase_failed(&self.local)
    }

    /// Exactly one phase failed
    pub fn is_partial(&self) -> bool {
        phase_failed(&self.remote) != phase_failed(&self.local)
    }
}

/// A phase failed when it errored or none of its deletions succeeded
pub fn phase_failed(result: &Result<SweepSummary, SweepError>) -> bool {
    match result {
        Ok(summary) => summary.is_failure(),
        Err(_) => true,
    }
}

/// Use the explicit slug, or derive it from the clone's `origin` remote
pub fn resolve_repository(
    explicit: Option<RepoSlug>,
    git: &dyn GitRunner,
) -> Result<RepoSlug, SweepError> {
    if let Some(repo) = explicit {
        return Ok(repo);
    }
    if !git.is_repository()? {
        return Err(SweepError::RepositoryNotFound);
    }
    let url = git.origin_url()?.ok_or(SweepError::RepoNotDetected)?;
    RepoSlug::from_remote_url(&url)
}

/// Sequences a deletion run against injected collaborators
pub struct DeletionOrchestrator<'a> {
    git: &'a dyn GitRunner,
    source: &'a dyn PullRequestSource,
    ui: &'a dyn InteractionAdapter,
    protected: ProtectedBranches,
    repo: RepoSlug,
    options: RunOptions,
}

impl<'a> DeletionOrchestrator<'a> {
    pub fn new(
        git: &'a dyn GitRunner,
        source: &'a dyn PullRequestSource,
        ui: &'a dyn InteractionAdapter,
        protected: ProtectedBranches,
        repo: RepoSlug,
        options: RunOptions,
    ) -> Self {
        Self {
            git,
            source,
            ui,
            protected,
            repo,
            options,
        }
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Delete local branches whose pull requests were merged
    pub fn run_local(&self) -> Result<SweepSummary, SweepError> {
        let mut summary = SweepSummary::new(SweepMode::Local, &self.repo, self.options.dry_run);
        self.ui
            .print_header(&format!("Local branches merged into {}", self.repo));

        // Scanning
        if !self.git.is_repository()? {
            return Err(SweepError::RepositoryNotFound);
        }
        let branches = self.git.list_local_branches()?;
        if branches.is_empty() {
            self.ui.print_info("No local branches found");
            return Ok(summary);
        }
        let current = self.git.current_branch_name()?;

        // Reconciling
        let mut pages = self.pages();
        let merged = reconcile_local(&mut pages)?;
        summary.scanned_pull_requests = merged.scanned;
        summary.truncated = merged.truncated;
        if self.options.verbose {
            self.ui.print_info(&format!(
                "Scanned {} closed pull requests, {} merged head refs",
                merged.scanned,
                merged.len()
            ));
        }

        let matched = match_local_branches(&branches, &merged);
        if matched.is_empty() {
            self.ui
                .print_info("No local branches with merged pull requests");
            self.report(&summary);
            return Ok(summary);
        }

        // Partitioning; upstream state is only queried once the cheap rules pass
        let evaluator = SafetyEvaluator::new(self.protected.clone(), current);
        let mut plan = Vec::with_capacity(matched.len());
        for (branch, pr) in matched {
            let mut verdict = evaluator.evaluate(branch, Some(pr), None);
            if verdict.safe {
                match self.git.ahead_behind(&branch.name) {
                    Ok(counts) => {
                        if counts.is_none() && self.options.verbose {
                            self.ui.print_info(&format!(
                                "{}: no upstream configured, treating as pushed",
                                branch.name
                            ));
                        }
                        verdict = evaluator.evaluate(branch, Some(pr), counts.map(|c| c.ahead));
                    }
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        summary.failed.push(FailedBranch {
                            name: branch.name.clone(),
                            error: e.to_string(),
                        });
                        continue;
                    }
                }
            }
            plan.push(PlannedBranch {
                branch: branch.clone(),
                verdict,
                pull_request: Some(pr.clone()),
            });
        }

        self.execute(SweepMode::Local, plan, &mut summary)?;
        Ok(summary)
    }

    /// Delete head refs of merged pull requests on the remote
    pub fn run_remote(&self) -> Result<SweepSummary, SweepError> {
        let mut summary = SweepSummary::new(SweepMode::Remote, &self.repo, self.options.dry_run);
        self.ui
            .print_header(&format!("Remote branches of merged PRs in {}", self.repo));

        // Scanning and reconciling
        let mut pages = self.pages();
        let reconciled = reconcile_remote(&mut pages, self.source, &self.repo)?;
        summary.scanned_pull_requests = reconciled.scanned;
        summary.truncated = reconciled.truncated;
        for (name, error) in &reconciled.lookup_failures {
            self.ui.print_error(&format!("Could not check {}: {}", name, error));
            summary.failed.push(FailedBranch {
                name: name.clone(),
                error: error.clone(),
            });
        }

        if self.options.verbose {
            self.ui.print_info(&format!(
                "Scanned {} closed pull requests: {} cross-fork, {} head refs already deleted, {} moved since merge",
                reconciled.scanned,
                reconciled.cross_fork,
                reconciled.missing,
                reconciled.moved.len()
            ));
            for name in &reconciled.moved {
                self.ui
                    .print_info(&format!("  {}: branch has new commits since merge", name));
            }
        }

        if reconciled.candidates.is_empty() {
            self.ui
                .print_info(&format!("No merged branches to delete on {}", self.repo));
            self.report(&summary);
            return Ok(summary);
        }

        // The checked-out branch of a local clone, if there is one
        let current = match self.git.is_repository() {
            Ok(true) => self.git.current_branch_name().unwrap_or_default(),
            _ => String::new(),
        };

        let protected = match self.source.default_branch(&self.repo) {
            Ok(Some(default)) => self.protected.clone().with_exact(&default),
            Ok(None) => self.protected.clone(),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                self.ui
                    .print_warning(&format!("Could not read default branch: {}", e));
                self.protected.clone()
            }
        };

        let evaluator = SafetyEvaluator::new(protected, current);
        let plan = reconciled
            .candidates
            .into_iter()
            .map(|candidate| PlannedBranch {
                verdict: evaluator.evaluate(
                    &candidate.branch,
                    Some(&candidate.pull_request),
                    None,
                ),
                branch: candidate.branch,
                pull_request: Some(candidate.pull_request),
            })
            .collect();

        self.execute(SweepMode::Remote, plan, &mut summary)?;
        Ok(summary)
    }

    /// Remote phase, then local phase regardless of the remote outcome
    pub fn run_all(&self) -> CombinedOutcome {
        let remote = self.run_remote();
        if let Err(e) = &remote {
            self.ui.print_error(&format!("Remote cleanup failed: {}", e));
        }

        let local = self.run_local();
        if let Err(e) = &local {
            self.ui.print_error(&format!("Local cleanup failed: {}", e));
        }

        let outcome = CombinedOutcome { remote, local };
        if outcome.is_partial() {
            self.ui
                .print_warning("One phase failed; the other completed");
        }
        outcome
    }

    fn pages(&self) -> PullRequestPages<'_, dyn PullRequestSource + 'a> {
        PullRequestPages::new(self.source, &self.repo, self.options.per_page)
            .with_limit(self.options.max_pull_requests)
    }

    /// Partition, confirm, execute and report
    fn execute(
        &self,
        mode: SweepMode,
        plan: Vec<PlannedBranch>,
        summary: &mut SweepSummary,
    ) -> Result<(), SweepError> {
        let (safe, unsafe_entries): (Vec<PlannedBranch>, Vec<PlannedBranch>) =
            plan.into_iter().partition(|entry| entry.verdict.safe);

        summary
            .skipped
            .extend(unsafe_entries.iter().map(|entry| SkippedBranch {
                name: entry.branch.name.clone(),
                reason: entry
                    .verdict
                    .reason
                    .map(|r| r.to_string())
                    .unwrap_or_default(),
            }));
        summary
            .candidates
            .extend(safe.iter().map(|entry| entry.branch.name.clone()));
        self.report_unsafe(&unsafe_entries);

        if safe.is_empty() {
            self.ui.print_info("No branches are safe to delete");
            self.report(summary);
            return Ok(());
        }

        if self.ui.interrupted() {
            self.stop_interrupted(summary, safe.len());
            return Ok(());
        }

        // Confirming
        let selected: Vec<&PlannedBranch> = if self.options.dry_run || self.options.force {
            safe.iter().collect()
        } else {
            match self.confirm(&safe)? {
                Some(indices) => indices.into_iter().map(|i| &safe[i]).collect(),
                None => {
                    summary.cancelled = true;
                    self.ui.print_warning("Cancelled; no branches were deleted");
                    return Ok(());
                }
            }
        };

        if selected.is_empty() {
            self.ui.print_info("No branches selected");
            self.report(summary);
            return Ok(());
        }

        // Executing
        let verb = if self.options.dry_run {
            "Would delete"
        } else {
            "Deleting"
        };
        let batches: Vec<&[&PlannedBranch]> = selected.chunks(self.options.batch_size).collect();
        let batch_count = batches.len();
        let mut attempted = 0;

        for (index, batch) in batches.into_iter().enumerate() {
            let progress = self.ui.start_progress(
                &format!(
                    "{} {} {} branches (batch {}/{})",
                    verb,
                    batch.len(),
                    mode,
                    index + 1,
                    batch_count
                ),
                Some(batch.len() as u64),
            );
            let mut batch_ok = true;

            for entry in batch {
                if self.ui.interrupted() {
                    self.ui.end_progress(progress, false);
                    self.stop_interrupted(summary, selected.len() - attempted);
                    return Ok(());
                }
                attempted += 1;
                let name = &entry.branch.name;
                if self.options.dry_run {
                    self.ui
                        .print_info(&format!("Would delete {}", entry.label()));
                    summary.deleted.push(name.clone());
                } else {
                    match self.delete(mode, name) {
                        Ok(()) => {
                            self.ui.print_info(&format!("Deleted {}", entry.label()));
                            summary.deleted.push(name.clone());
                        }
                        Err(e) if e.is_fatal() => {
                            self.ui.end_progress(progress, false);
                            return Err(e);
                        }
                        Err(e) => {
                            tracing::warn!(branch = %name, error = %e, "deletion failed");
                            self.ui
                                .print_error(&format!("Failed to delete {}: {}", name, e));
                            summary.failed.push(FailedBranch {
                                name: name.clone(),
                                error: e.to_string(),
                            });
                            batch_ok = false;
                        }
                    }
                }
                self.ui.advance_progress(&progress, 1);
            }

            self.ui.end_progress(progress, batch_ok);
        }

        // Reporting
        self.report(summary);
        Ok(())
    }

    fn delete(&self, mode: SweepMode, name: &str) -> Result<(), SweepError> {
        match mode {
            // Squash and rebase merges leave no ancestry, so `-d` would refuse
            SweepMode::Local => self.git.delete_local_branch(name, true),
            SweepMode::Remote => self.source.delete_ref(&self.repo, name),
        }
    }

    /// Interactive selection; `None` means the user cancelled
    fn confirm(&self, safe: &[PlannedBranch]) -> Result<Option<Vec<usize>>, SweepError> {
        let mut visible: Vec<usize> = (0..safe.len()).collect();

        loop {
            self.ui.print_info(&format!("{} branches can be deleted:", visible.len()));
            for &i in &visible {
                self.ui.print_info(&format!("  {}", safe[i].label()));
            }

            let delete_all = format!("Delete all {} branches", visible.len());
            let options = [
                delete_all.as_str(),
                "Choose branches",
                "Filter by pattern",
                "Cancel",
            ];
            let choice = match self.ui.ask_select("What would you like to do?", &options) {
                Ok(choice) => choice,
                Err(e) => return interaction_outcome(e),
            };

            match choice {
                0 => return Ok(Some(visible)),
                1 => {
                    let labels: Vec<String> = visible.iter().map(|&i| safe[i].label()).collect();
                    let label_refs: Vec<&str> = labels.iter().map(String::as_str).collect();
                    return match self.ui.ask_multi_select(
                        "Select branches to delete",
                        &label_refs,
                        true,
                    ) {
                        Ok(chosen) => Ok(Some(
                            chosen
                                .into_iter()
                                .filter_map(|pos| visible.get(pos).copied())
                                .collect(),
                        )),
                        Err(e) => interaction_outcome(e),
                    };
                }
                2 => {
                    let input = match self
                        .ui
                        .ask_text("Pattern (glob like feature/*, or /regex/)", None)
                    {
                        Ok(input) => input,
                        Err(e) => return interaction_outcome(e),
                    };
                    let pattern = match filter_pattern(&input) {
                        Ok(pattern) => pattern,
                        Err(e) => {
                            self.ui.print_warning(&e.to_string());
                            continue;
                        }
                    };
                    let narrowed: Vec<usize> = visible
                        .iter()
                        .copied()
                        .filter(|&i| pattern.is_match(&safe[i].branch.name))
                        .collect();
                    if narrowed.is_empty() {
                        self.ui
                            .print_warning(&format!("No branches match '{}'", input.trim()));
                    } else {
                        visible = narrowed;
                    }
                }
                _ => return Ok(None),
            }
        }
    }

    fn report_unsafe(&self, unsafe_entries: &[PlannedBranch]) {
        if unsafe_entries.is_empty() {
            return;
        }
        self.ui.print_warning(&format!(
            "Skipping {} branches that are not safe to delete:",
            unsafe_entries.len()
        ));
        let limit = if self.options.verbose {
            unsafe_entries.len()
        } else {
            UNSAFE_DISPLAY_LIMIT
        };
        for entry in unsafe_entries.iter().take(limit) {
            let reason = entry.verdict.reason.map(|r| r.to_string()).unwrap_or_default();
            self.ui
                .print_info(&format!("  {}: {}", entry.branch.name, reason));
        }
        if unsafe_entries.len() > limit {
            self.ui
                .print_info(&format!("  ... and {} more", unsafe_entries.len() - limit));
        }
    }

    fn stop_interrupted(&self, summary: &mut SweepSummary, remaining: usize) {
        summary.cancelled = true;
        self.ui.print_warning(&format!("Interrupted; {} branches were left untouched", remaining));
        self.report(summary);
    }

    fn report_truncation(&self, summary: &SweepSummary) {
        if summary.truncated {
            self.ui.print_warning(&format!(
                "Only the {} most recently updated pull requests were checked; branches from older PRs were not considered",
                summary.scanned_pull_requests
            ));
        }
    }

    fn report(&self, summary: &SweepSummary) {
        if summary.dry_run {
            self.ui.print_success(&format!(
                "Dry run: would delete {} {} branches",
                summary.deleted.len(),
                summary.mode
            ));
        } else {
            self.ui.print_success(&format!(
                "Deleted {} {} branches",
                summary.deleted.len(),
                summary.mode
            ));
        }
        if !summary.failed.is_empty() {
            self.ui
                .print_error(&format!("{} branches failed", summary.failed.len()));
        }
        if !summary.skipped.is_empty() {
            self.ui.print_info(&format!(
                "{} branches skipped as unsafe",
                summary.skipped.len()
            ));
        }
        self.report_truncation(summary);
    }
}

/// A bare word filters by substring; globs and `/regex/` are used as given
fn filter_pattern(input: &str) -> Result<NamePattern, SweepError> {
    let input = input.trim();
    if input.contains('*') || (input.len() >= 2 && input.starts_with('/') && input.ends_with('/')) {
        NamePattern::parse(input)
    } else {
        NamePattern::parse(&format!("*{}*", input))
    }
}

fn interaction_outcome<T>(err: InteractionError) -> Result<Option<T>, SweepError> {
    match err {
        InteractionError::Cancelled => Ok(None),
        InteractionError::NonTty => Err(SweepError::NonInteractive),
        InteractionError::InvalidInput(msg) | InteractionError::Io(msg) => {
            Err(SweepError::Io(std::io::Error::other(msg)))
        }
    }
}
