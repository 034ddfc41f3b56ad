//! Shared fakes for mergesweep-core integration tests
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use chrono::{DateTime, TimeZone, Utc};
use mergesweep_core::{
    AheadBehind, Branch, GitRunner, InteractionAdapter, InteractionError, InteractionResult,
    ProgressHandle, PullRequest, PullRequestSource, Reference, RepoIdentity, RepoSlug, SweepError,
};

pub fn repo() -> RepoSlug {
    RepoSlug::new("octo", "widgets").unwrap()
}

pub fn at(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

/// Merged same-repository PR
pub fn merged_pr(number: u64, head_ref: &str, head_sha: &str) -> PullRequest {
    let base = RepoIdentity::new("octo", "widgets");
    PullRequest {
        number,
        id: number * 1000,
        head_ref: head_ref.to_string(),
        head_sha: head_sha.to_string(),
        head_repo: Some(base.clone()),
        base_repo: base,
        merge_commit_sha: Some(format!("m{}", number)),
        merged_at: Some(at(number as i64)),
        updated_at: Some(at(number as i64)),
    }
}

pub fn closed_pr(number: u64, head_ref: &str, head_sha: &str) -> PullRequest {
    PullRequest {
        merge_commit_sha: None,
        merged_at: None,
        ..merged_pr(number, head_ref, head_sha)
    }
}

pub fn fork_pr(number: u64, head_ref: &str, head_sha: &str) -> PullRequest {
    let mut fork = RepoIdentity::new("someone", "widgets");
    fork.fork = true;
    PullRequest {
        head_repo: Some(fork),
        ..merged_pr(number, head_ref, head_sha)
    }
}

/// In-memory pull request host
#[derive(Default)]
pub struct FakeSource {
    pub prs: Vec<PullRequest>,
    pub refs: RefCell<HashMap<String, String>>,
    pub default_branch: Option<String>,
    pub page_requests: RefCell<Vec<(u32, u32)>>,
    pub ref_lookups: RefCell<Vec<String>>,
    pub deleted: RefCell<Vec<String>>,
    pub fail_page: Option<u32>,
    pub fail_delete: HashSet<String>,
    pub fail_lookup: HashSet<String>,
    pub auth_failure: bool,
}

impl FakeSource {
    pub fn with_prs(prs: Vec<PullRequest>) -> Self {
        Self {
            prs,
            ..Self::default()
        }
    }

    pub fn with_ref(self, name: &str, sha: &str) -> Self {
        self.refs
            .borrow_mut()
            .insert(name.to_string(), sha.to_string());
        self
    }

    pub fn deleted(&self) -> Vec<String> {
        self.deleted.borrow().clone()
    }
}

impl PullRequestSource for FakeSource {
    fn closed_pull_requests(
        &self,
        _repo: &RepoSlug,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PullRequest>, SweepError> {
        self.page_requests.borrow_mut().push((page, per_page));
        if self.auth_failure {
            return Err(SweepError::AuthFailed {
                reason: "HTTP 401: Bad credentials".to_string(),
            });
        }
        if self.fail_page == Some(page) {
            return Err(SweepError::GhCommand("HTTP 502".to_string()));
        }
        let start = ((page - 1) * per_page) as usize;
        Ok(self
            .prs
            .iter()
            .skip(start)
            .take(per_page as usize)
            .cloned()
            .collect())
    }

    fn get_ref(&self, _repo: &RepoSlug, head_ref: &str) -> Result<Option<Reference>, SweepError> {
        self.ref_lookups.borrow_mut().push(head_ref.to_string());
        if self.fail_lookup.contains(head_ref) {
            return Err(SweepError::GhCommand("HTTP 500".to_string()));
        }
        Ok(self.refs.borrow().get(head_ref).map(|sha| Reference {
            ref_name: format!("refs/heads/{}", head_ref),
            sha: sha.clone(),
        }))
    }

    fn delete_ref(&self, _repo: &RepoSlug, head_ref: &str) -> Result<(), SweepError> {
        if self.fail_delete.contains(head_ref) {
            return Err(SweepError::GhCommand("HTTP 422: Reference does not exist".to_string()));
        }
        self.refs.borrow_mut().remove(head_ref);
        self.deleted.borrow_mut().push(head_ref.to_string());
        Ok(())
    }

    fn default_branch(&self, _repo: &RepoSlug) -> Result<Option<String>, SweepError> {
        Ok(self.default_branch.clone())
    }
}

/// In-memory local clone
pub struct FakeGit {
    pub is_repo: bool,
    pub branches: RefCell<Vec<Branch>>,
    pub current: String,
    pub ahead: HashMap<String, u32>,
    pub no_upstream: HashSet<String>,
    pub origin: Option<String>,
    pub deleted: RefCell<Vec<(String, bool)>>,
    pub ahead_queries: RefCell<Vec<String>>,
    pub fail_delete: HashSet<String>,
}

impl FakeGit {
    pub fn new(current: &str, branches: Vec<Branch>) -> Self {
        let branches = branches
            .into_iter()
            .map(|b| if b.name == current { b.current() } else { b })
            .collect();
        Self {
            is_repo: true,
            branches: RefCell::new(branches),
            current: current.to_string(),
            ahead: HashMap::new(),
            no_upstream: HashSet::new(),
            origin: Some("git@github.com:octo/widgets.git".to_string()),
            deleted: RefCell::new(Vec::new()),
            ahead_queries: RefCell::new(Vec::new()),
            fail_delete: HashSet::new(),
        }
    }

    pub fn outside_repository() -> Self {
        Self {
            is_repo: false,
            origin: None,
            ..Self::new("", vec![])
        }
    }

    pub fn deleted_names(&self) -> Vec<String> {
        self.deleted.borrow().iter().map(|(n, _)| n.clone()).collect()
    }

    pub fn branch_names(&self) -> Vec<String> {
        self.branches.borrow().iter().map(|b| b.name.clone()).collect()
    }
}

impl GitRunner for FakeGit {
    fn is_repository(&self) -> Result<bool, SweepError> {
        Ok(self.is_repo)
    }

    fn repository_root(&self) -> Result<Option<PathBuf>, SweepError> {
        Ok(self.is_repo.then(|| PathBuf::from("/work/widgets")))
    }

    fn list_local_branches(&self) -> Result<Vec<Branch>, SweepError> {
        if !self.is_repo {
            return Err(SweepError::RepositoryNotFound);
        }
        Ok(self.branches.borrow().clone())
    }

    fn current_branch_name(&self) -> Result<String, SweepError> {
        Ok(self.current.clone())
    }

    fn ahead_behind(&self, branch: &str) -> Result<Option<AheadBehind>, SweepError> {
        self.ahead_queries.borrow_mut().push(branch.to_string());
        if self.no_upstream.contains(branch) {
            return Ok(None);
        }
        Ok(Some(AheadBehind {
            ahead: self.ahead.get(branch).copied().unwrap_or(0),
            behind: 0,
        }))
    }

    fn delete_local_branch(&self, name: &str, force: bool) -> Result<(), SweepError> {
        if self.fail_delete.contains(name) {
            return Err(SweepError::GitCommand(format!(
                "git branch -D {} failed: error: cannot lock ref",
                name
            )));
        }
        self.branches.borrow_mut().retain(|b| b.name != name);
        self.deleted.borrow_mut().push((name.to_string(), force));
        Ok(())
    }

    fn origin_url(&self) -> Result<Option<String>, SweepError> {
        Ok(self.origin.clone())
    }
}

/// Scripted answer for the next prompt
#[derive(Debug, Clone)]
pub enum Answer {
    Select(usize),
    MultiSelect(Vec<usize>),
    Text(String),
    Fail(InteractionError),
}

/// Records everything shown and replays scripted answers
#[derive(Default)]
pub struct ScriptedUi {
    answers: RefCell<VecDeque<Answer>>,
    pub prompts: RefCell<Vec<String>>,
    pub messages: RefCell<Vec<String>>,
    pub progress_ended: RefCell<Vec<bool>>,
    next_id: Cell<u64>,
    interrupt_on: Option<String>,
    interrupted: Cell<bool>,
}

impl ScriptedUi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answering(answers: Vec<Answer>) -> Self {
        let ui = Self::default();
        ui.answers.borrow_mut().extend(answers);
        ui
    }

    /// Behaves as if Ctrl+C was pressed right after a message containing `needle`
    pub fn interrupting_on(needle: &str) -> Self {
        Self {
            interrupt_on: Some(needle.to_string()),
            ..Self::default()
        }
    }

    pub fn lines(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages.borrow().iter().any(|m| m.contains(needle))
    }

    pub fn count(&self, needle: &str) -> usize {
        self.messages
            .borrow()
            .iter()
            .filter(|m| m.contains(needle))
            .count()
    }

    fn next_answer(&self, prompt: &str) -> Answer {
        self.prompts.borrow_mut().push(prompt.to_string());
        self.answers
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected prompt: {}", prompt))
    }

    fn record(&self, level: &str, message: &str) {
        let line = format!("{}: {}", level, message);
        if self
            .interrupt_on
            .as_deref()
            .is_some_and(|needle| line.contains(needle))
        {
            self.interrupted.set(true);
        }
        self.messages.borrow_mut().push(line);
    }
}

impl InteractionAdapter for ScriptedUi {
    fn ask_text(&self, prompt: &str, _default: Option<&str>) -> InteractionResult<String> {
        match self.next_answer(prompt) {
            Answer::Text(text) => Ok(text),
            Answer::Fail(e) => Err(e),
            other => panic!("expected text answer for {}, got {:?}", prompt, other),
        }
    }

    fn ask_select(&self, prompt: &str, options: &[&str]) -> InteractionResult<usize> {
        match self.next_answer(prompt) {
            Answer::Select(i) => {
                assert!(i < options.len());
                Ok(i)
            }
            Answer::Fail(e) => Err(e),
            other => panic!("expected select answer for {}, got {:?}", prompt, other),
        }
    }

    fn ask_multi_select(
        &self,
        prompt: &str,
        options: &[&str],
        _checked: bool,
    ) -> InteractionResult<Vec<usize>> {
        self.record("choices", &options.join(","));
        match self.next_answer(prompt) {
            Answer::MultiSelect(indices) => Ok(indices),
            Answer::Fail(e) => Err(e),
            other => panic!("expected multi-select answer for {}, got {:?}", prompt, other),
        }
    }

    fn start_progress(&self, message: &str, _total: Option<u64>) -> ProgressHandle {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        self.record("progress", message);
        ProgressHandle::new(id, message)
    }

    fn advance_progress(&self, _handle: &ProgressHandle, _delta: u64) {}

    fn end_progress(&self, _handle: ProgressHandle, success: bool) {
        self.progress_ended.borrow_mut().push(success);
    }

    fn print_info(&self, message: &str) {
        self.record("info", message);
    }

    fn print_warning(&self, message: &str) {
        self.record("warn", message);
    }

    fn print_error(&self, message: &str) {
        self.record("error", message);
    }

    fn print_success(&self, message: &str) {
        self.record("success", message);
    }

    fn print_header(&self, message: &str) {
        self.record("header", message);
    }

    fn interrupted(&self) -> bool {
        self.interrupted.get()
    }
}
