//! Pull request to branch reconciliation
//!
//! Local mode indexes merged pull requests by head ref so each local branch
//! can be checked against the PR it came from. Remote mode is stricter: the
//! deletion target is the PR's own head ref, which must live in the base
//! repository and still point at the exact SHA recorded on the PR.
//!
//! When several merged PRs share a head ref, the one merged last wins; ties
//! and missing timestamps fall back to stream order (first seen wins).

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::SweepError;
use crate::github::PullRequestSource;
use crate::pagination::PullRequestPages;
use crate::types::{Branch, PullRequest, RepoSlug};

/// Merged pull requests keyed by head ref
#[derive(Debug, Default)]
pub struct MergedPullRequests {
    order: Vec<String>,
    by_head_ref: HashMap<String, PullRequest>,
    /// Pull requests read from the stream
    pub scanned: usize,
    /// The PR cap hid older pull requests
    pub truncated: bool,
}

impl MergedPullRequests {
    /// Index an already-materialised sequence of pull requests
    pub fn from_pull_requests<I>(prs: I) -> Self
    where
        I: IntoIterator<Item = PullRequest>,
    {
        let mut merged = Self::default();
        for pr in prs {
            merged.scanned += 1;
            merged.offer(pr);
        }
        merged
    }

    pub fn get(&self, head_ref: &str) -> Option<&PullRequest> {
        self.by_head_ref.get(head_ref)
    }

    pub fn len(&self) -> usize {
        self.by_head_ref.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_head_ref.is_empty()
    }

    /// Pull requests in first-seen head ref order
    pub fn iter(&self) -> impl Iterator<Item = &PullRequest> {
        self.order.iter().filter_map(|r| self.by_head_ref.get(r))
    }

    fn offer(&mut self, pr: PullRequest) {
        if !pr.is_merged() {
            tracing::trace!(number = pr.number, "skipping unmerged pull request");
            return;
        }
        match self.by_head_ref.entry(pr.head_ref.clone()) {
            Entry::Occupied(mut slot) => {
                if merged_later(&pr, slot.get()) {
                    tracing::debug!(
                        head_ref = %pr.head_ref,
                        kept = pr.number,
                        dropped = slot.get().number,
                        "newer merged pull request for head ref"
                    );
                    slot.insert(pr);
                }
            }
            Entry::Vacant(slot) => {
                self.order.push(pr.head_ref.clone());
                slot.insert(pr);
            }
        }
    }
}

fn merged_later(candidate: &PullRequest, existing: &PullRequest) -> bool {
    match (candidate.merged_at, existing.merged_at) {
        (Some(candidate), Some(existing)) => candidate > existing,
        (Some(_), None) => true,
        _ => false,
    }
}

/// Local mode: consume the stream into a head-ref index of merged PRs
pub fn reconcile_local<S>(
    pages: &mut PullRequestPages<'_, S>,
) -> Result<MergedPullRequests, SweepError>
where
    S: PullRequestSource + ?Sized,
{
    let mut merged = MergedPullRequests::default();
    for pr in pages.by_ref() {
        merged.scanned += 1;
        merged.offer(pr?);
    }
    merged.truncated = pages.truncated();
    Ok(merged)
}

/// Pair each local branch with its merged PR, dropping branches without one
pub fn match_local_branches<'b>(
    branches: &'b [Branch],
    merged: &'b MergedPullRequests,
) -> Vec<(&'b Branch, &'b PullRequest)> {
    branches
        .iter()
        .filter_map(|branch| merged.get(&branch.name).map(|pr| (branch, pr)))
        .collect()
}

/// A remote head ref eligible for deletion, with the PR that merged it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCandidate {
    /// Live state of the ref
    pub branch: Branch,
    pub pull_request: PullRequest,
}

/// Outcome of remote reconciliation
#[derive(Debug, Default)]
pub struct RemoteReconciliation {
    pub candidates: Vec<RemoteCandidate>,
    pub scanned: usize,
    pub truncated: bool,
    /// Merged PRs whose head lives in a fork
    pub cross_fork: usize,
    /// Head refs that no longer exist
    pub missing: usize,
    /// Head refs that moved past the merged SHA
    pub moved: Vec<String>,
    /// Head refs whose lookup failed (name, error)
    pub lookup_failures: Vec<(String, String)>,
}

/// Remote mode: select merged same-repository PRs whose head ref still
/// points at the merged SHA
///
/// Fatal errors (e.g. authentication) abort; other lookup failures are
/// recorded per ref and the rest continue.
pub fn reconcile_remote<S>(
    pages: &mut PullRequestPages<'_, S>,
    source: &S,
    repo: &RepoSlug,
) -> Result<RemoteReconciliation, SweepError>
where
    S: PullRequestSource + ?Sized,
{
    let mut outcome = RemoteReconciliation::default();
    let mut merged = MergedPullRequests::default();

    for pr in pages.by_ref() {
        let pr = pr?;
        outcome.scanned += 1;
        if pr.is_merged() && !pr.is_same_repository() {
            tracing::debug!(number = pr.number, "skipping cross-fork pull request");
            outcome.cross_fork += 1;
            continue;
        }
        merged.offer(pr);
    }
    outcome.truncated = pages.truncated();

    for pr in merged.iter() {
        let reference = match source.get_ref(repo, &pr.head_ref) {
            Ok(reference) => reference,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                tracing::warn!(head_ref = %pr.head_ref, error = %e, "ref lookup failed");
                outcome
                    .lookup_failures
                    .push((pr.head_ref.clone(), e.to_string()));
                continue;
            }
        };

        let Some(reference) = reference else {
            tracing::debug!(head_ref = %pr.head_ref, number = pr.number, "head ref already gone");
            outcome.missing += 1;
            continue;
        };

        if reference.sha != pr.head_sha {
            tracing::debug!(
                head_ref = %pr.head_ref,
                live = %reference.sha,
                merged = %pr.head_sha,
                "head ref moved since merge"
            );
            outcome.moved.push(pr.head_ref.clone());
            continue;
        }

        outcome.candidates.push(RemoteCandidate {
            branch: Branch::new(pr.head_ref.clone(), reference.sha),
            pull_request: pr.clone(),
        });
    }

    Ok(outcome)
}
