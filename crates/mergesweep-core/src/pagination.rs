//! Lazy, pull-based iteration over closed pull requests
//!
//! A page is fetched only when the previous one has been consumed, so memory
//! stays bounded by one page regardless of repository history. The stream is
//! exhausted by an empty or short page. An optional cap stops it early and
//! records that older pull requests were not seen.

use std::vec;

use crate::error::SweepError;
use crate::github::{MAX_PER_PAGE, PullRequestSource};
use crate::types::{PullRequest, RepoSlug};

pub struct PullRequestPages<'a, S: PullRequestSource + ?Sized> {
    source: &'a S,
    repo: &'a RepoSlug,
    per_page: u32,
    next_page: u32,
    buffer: vec::IntoIter<PullRequest>,
    exhausted: bool,
    limit: Option<usize>,
    yielded: usize,
    truncated: bool,
    limit_checked: bool,
    pages_fetched: u32,
}

impl<'a, S: PullRequestSource + ?Sized> PullRequestPages<'a, S> {
    pub fn new(source: &'a S, repo: &'a RepoSlug, per_page: u32) -> Self {
        Self {
            source,
            repo,
            per_page: per_page.clamp(1, MAX_PER_PAGE),
            next_page: 1,
            buffer: Vec::new().into_iter(),
            exhausted: false,
            limit: None,
            yielded: 0,
            truncated: false,
            limit_checked: false,
            pages_fetched: 0,
        }
    }

    /// Stop after `limit` pull requests
    pub fn with_limit(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// True when the cap stopped the stream before the source ran out
    pub fn truncated(&self) -> bool {
        self.truncated
    }

    /// Number of pull requests handed out so far
    pub fn consumed(&self) -> usize {
        self.yielded
    }

    pub fn pages_fetched(&self) -> u32 {
        self.pages_fetched
    }

    fn limit_reached(&self) -> bool {
        self.limit.is_some_and(|limit| self.yielded >= limit)
    }

    /// Peek past a full last page so an exactly-filled history is not truncated
    fn more_pages(&mut self) -> bool {
        if self.exhausted {
            return false;
        }
        self.exhausted = true;
        match self
            .source
            .closed_pull_requests(self.repo, self.next_page, self.per_page)
        {
            Ok(prs) => {
                self.pages_fetched += 1;
                !prs.is_empty()
            }
            Err(e) => {
                tracing::debug!(error = %e, "could not check for older pull requests");
                true
            }
        }
    }
}

impl<S: PullRequestSource + ?Sized> Iterator for PullRequestPages<'_, S> {
    type Item = Result<PullRequest, SweepError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.limit_reached() {
                if !self.limit_checked {
                    self.limit_checked = true;
                    self.truncated = !self.buffer.as_slice().is_empty() || self.more_pages();
                }
                return None;
            }

            if let Some(pr) = self.buffer.next() {
                self.yielded += 1;
                return Some(Ok(pr));
            }

            if self.exhausted {
                return None;
            }

            let page = self.next_page;
            match self
                .source
                .closed_pull_requests(self.repo, page, self.per_page)
            {
                Ok(prs) => {
                    tracing::debug!(page, count = prs.len(), "fetched pull request page");
                    self.pages_fetched += 1;
                    self.next_page += 1;
                    if prs.len() < self.per_page as usize {
                        self.exhausted = true;
                    }
                    self.buffer = prs.into_iter();
                }
                Err(e) => {
                    self.exhausted = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
