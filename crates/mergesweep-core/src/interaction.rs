//! User interaction contract
//!
//! The orchestrator talks to the user only through [`InteractionAdapter`], so
//! the terminal implementation lives in the binary and tests can script it.

use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;

/// Errors from an interaction
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InteractionError {
    /// User cancelled (Esc, Ctrl+C, or an explicit cancel choice)
    #[error("cancelled by user")]
    Cancelled,

    /// Prompt needs a terminal but stdin is not one
    #[error("not running in a terminal")]
    NonTty,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("terminal error: {0}")]
    Io(String),
}

pub type InteractionResult<T> = Result<T, InteractionError>;

/// Handle for a running progress indicator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressHandle {
    id: u64,
    message: String,
}

impl ProgressHandle {
    pub fn new(id: u64, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Terminal-agnostic prompts, progress and messages
pub trait InteractionAdapter {
    fn ask_text(&self, prompt: &str, default: Option<&str>) -> InteractionResult<String>;

    fn ask_select(&self, prompt: &str, options: &[&str]) -> InteractionResult<usize>;

    /// Checklist; every item starts checked when `checked` is true
    fn ask_multi_select(
        &self,
        prompt: &str,
        options: &[&str],
        checked: bool,
    ) -> InteractionResult<Vec<usize>>;

    /// Start a progress indicator; `total` gives a bar, `None` a spinner
    fn start_progress(&self, message: &str, total: Option<u64>) -> ProgressHandle;

    fn advance_progress(&self, handle: &ProgressHandle, delta: u64);

    fn end_progress(&self, handle: ProgressHandle, success: bool);

    fn print_info(&self, message: &str);

    fn print_warning(&self, message: &str);

    fn print_error(&self, message: &str);

    fn print_success(&self, message: &str);

    fn print_header(&self, message: &str);

    /// True once the user asked to stop while no prompt was open
    fn interrupted(&self) -> bool {
        false
    }
}

/// State of a [`SelectionGate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Pending,
    Confirmed,
    Cancelled,
}

const PENDING: u8 = 0;
const CONFIRMED: u8 = 1;
const CANCELLED: u8 = 2;

/// One-shot resolution shared by a prompt and a cancel signal
///
/// Whichever of [`confirm`](Self::confirm) and [`cancel`](Self::cancel) runs
/// first wins; the other becomes a no-op and returns `false`.
#[derive(Debug)]
pub struct SelectionGate {
    state: AtomicU8,
}

impl SelectionGate {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(PENDING),
        }
    }

    /// Resolve as confirmed; true if this call decided the outcome
    pub fn confirm(&self) -> bool {
        self.resolve(CONFIRMED)
    }

    /// Resolve as cancelled; true if this call decided the outcome
    pub fn cancel(&self) -> bool {
        self.resolve(CANCELLED)
    }

    pub fn state(&self) -> GateState {
        match self.state.load(Ordering::SeqCst) {
            CONFIRMED => GateState::Confirmed,
            CANCELLED => GateState::Cancelled,
            _ => GateState::Pending,
        }
    }

    fn resolve(&self, to: u8) -> bool {
        self.state
            .compare_exchange(PENDING, to, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl Default for SelectionGate {
    fn default() -> Self {
        Self::new()
    }
}
