//! CLI adapter implementation using dialoguer for interactive prompts
//!
//! This module provides `CliAdapter`, which implements `InteractionAdapter` for
//! terminal-based user interaction with customizable spacing.
//!
//! Each prompt owns a [`SelectionGate`]. The prompt resolving and Esc/Ctrl+C
//! race for it; whichever resolves the gate first decides the outcome.

use std::collections::HashMap;
use std::fmt::Write as FmtWrite;
use std::io::{self, IsTerminal, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use console::Style;
use dialoguer::theme::Theme;
use dialoguer::{Input, MultiSelect, Select};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;

use mergesweep_core::interaction::{
    InteractionAdapter, InteractionError, InteractionResult, ProgressHandle, SelectionGate,
};

use crate::colors::COLORS;

/// Global flag to track if Ctrl+C was pressed
static CANCELLED: AtomicBool = AtomicBool::new(false);

/// Gate of the prompt currently on screen
static ACTIVE_GATE: Mutex<Option<Arc<SelectionGate>>> = Mutex::new(None);

/// Check if cancellation was requested
fn is_cancelled() -> bool {
    CANCELLED.load(Ordering::SeqCst)
}

fn set_active_gate(gate: Option<Arc<SelectionGate>>) {
    if let Ok(mut slot) = ACTIVE_GATE.lock() {
        *slot = gate;
    }
}

/// Set up the global Ctrl+C handler
fn setup_ctrl_c_handler() {
    static HANDLER_SET: AtomicBool = AtomicBool::new(false);

    if HANDLER_SET.swap(true, Ordering::SeqCst) {
        return;
    }

    if let Err(e) = ctrlc::set_handler(move || {
        let gate = ACTIVE_GATE.lock().ok().and_then(|slot| slot.clone());
        let already_cancelled = CANCELLED.swap(true, Ordering::SeqCst);
        match interrupt_action(gate.is_some(), already_cancelled) {
            InterruptAction::CancelPrompt => {
                if let Some(gate) = gate {
                    gate.cancel();
                }
                eprintln!();
            }
            InterruptAction::Stop => {
                eprintln!("\nStopping before the next deletion (press Ctrl+C again to abort)");
            }
            InterruptAction::Abort => {
                eprintln!();
                std::process::exit(INTERRUPTED_EXIT_CODE);
            }
        }
    }) {
        tracing::warn!(error = %e, "could not set Ctrl+C handler");
    }
}

/// Conventional exit status for a run killed by SIGINT
const INTERRUPTED_EXIT_CODE: i32 = 130;

/// What a Ctrl+C press does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptAction {
    /// Resolve the open prompt as cancelled
    CancelPrompt,
    /// Let the orchestrator stop at its next checkpoint
    Stop,
    /// Exit immediately
    Abort,
}

fn interrupt_action(prompt_open: bool, already_cancelled: bool) -> InterruptAction {
    if prompt_open {
        InterruptAction::CancelPrompt
    } else if already_cancelled {
        InterruptAction::Abort
    } else {
        InterruptAction::Stop
    }
}

/// Custom theme with generous spacing between elements
struct SpacedTheme {
    prompt_style: Style,
    active_style: Style,
    inactive_style: Style,
    hint_style: Style,
}

impl SpacedTheme {
    fn new() -> Self {
        Self {
            prompt_style: Style::new().cyan().bold(),
            active_style: Style::new().cyan(),
            inactive_style: Style::new(),
            hint_style: Style::new().dim(),
        }
    }

    fn prompt(&self, prompt: &str) -> String {
        self.prompt_style
            .apply_to(format!("? {}", prompt))
            .to_string()
    }
}

impl Theme for SpacedTheme {
    fn format_prompt(&self, f: &mut dyn FmtWrite, prompt: &str) -> std::fmt::Result {
        write!(f, "{}", self.prompt(prompt))
    }

    fn format_input_prompt(
        &self,
        f: &mut dyn FmtWrite,
        prompt: &str,
        default: Option<&str>,
    ) -> std::fmt::Result {
        match default {
            Some(d) => write!(
                f,
                "{} {}",
                self.prompt(prompt),
                self.hint_style.apply_to(format!("({})", d))
            ),
            None => write!(f, "{}", self.prompt(prompt)),
        }
    }

    fn format_input_prompt_selection(
        &self,
        f: &mut dyn FmtWrite,
        prompt: &str,
        sel: &str,
    ) -> std::fmt::Result {
        write!(f, "{} {}", self.prompt(prompt), self.active_style.apply_to(sel))
    }

    fn format_select_prompt(&self, f: &mut dyn FmtWrite, prompt: &str) -> std::fmt::Result {
        write!(f, "{}", self.prompt(prompt))
    }

    fn format_select_prompt_selection(
        &self,
        f: &mut dyn FmtWrite,
        prompt: &str,
        sel: &str,
    ) -> std::fmt::Result {
        write!(f, "{} {}", self.prompt(prompt), self.active_style.apply_to(sel))
    }

    fn format_select_prompt_item(
        &self,
        f: &mut dyn FmtWrite,
        text: &str,
        active: bool,
    ) -> std::fmt::Result {
        if active {
            write!(
                f,
                "  {} {}",
                self.active_style.apply_to(">"),
                self.active_style.apply_to(text)
            )
        } else {
            write!(f, "    {}", self.inactive_style.apply_to(text))
        }
    }

    fn format_multi_select_prompt(&self, f: &mut dyn FmtWrite, prompt: &str) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.prompt(prompt),
            self.hint_style.apply_to("(space toggles, enter confirms, esc cancels)")
        )
    }

    fn format_multi_select_prompt_selection(
        &self,
        f: &mut dyn FmtWrite,
        prompt: &str,
        selections: &[&str],
    ) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.prompt(prompt),
            self.active_style
                .apply_to(format!("{} selected", selections.len()))
        )
    }

    fn format_multi_select_prompt_item(
        &self,
        f: &mut dyn FmtWrite,
        text: &str,
        checked: bool,
        active: bool,
    ) -> std::fmt::Result {
        let checkbox = if checked { "[✓]" } else { "[ ]" };
        if active {
            write!(
                f,
                "  {} {} {}",
                self.active_style.apply_to(">"),
                self.active_style.apply_to(checkbox),
                self.active_style.apply_to(text)
            )
        } else {
            write!(
                f,
                "    {} {}",
                self.inactive_style.apply_to(checkbox),
                self.inactive_style.apply_to(text)
            )
        }
    }
}

/// CLI adapter for terminal-based user interaction
pub struct CliAdapter {
    is_tty: bool,
    quiet: bool,
    progress_counter: AtomicU64,
    active_progress: Arc<Mutex<HashMap<u64, ProgressBar>>>,
}

impl CliAdapter {
    pub fn new() -> Self {
        Self::with_tty(io::stdin().is_terminal() && io::stderr().is_terminal())
    }

    pub fn with_tty(is_tty: bool) -> Self {
        setup_ctrl_c_handler();
        Self {
            is_tty,
            quiet: false,
            progress_counter: AtomicU64::new(0),
            active_progress: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Suppress info, success, header and progress output
    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    fn check_cancelled(&self) -> InteractionResult<()> {
        if is_cancelled() {
            Err(InteractionError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn require_tty(&self) -> InteractionResult<()> {
        if !self.is_tty {
            Err(InteractionError::NonTty)
        } else {
            Ok(())
        }
    }

    /// Run one prompt under a fresh gate
    ///
    /// `Ok(None)` from dialoguer means Esc was pressed.
    fn gated<T>(
        &self,
        prompt: impl FnOnce() -> dialoguer::Result<Option<T>>,
    ) -> InteractionResult<T> {
        self.require_tty()?;
        self.check_cancelled()?;

        let gate = Arc::new(SelectionGate::new());
        set_active_gate(Some(Arc::clone(&gate)));
        let result = prompt();
        set_active_gate(None);

        resolve_prompt(&gate, result)
    }
}

/// Settle a prompt result against its gate
fn resolve_prompt<T>(
    gate: &SelectionGate,
    result: dialoguer::Result<Option<T>>,
) -> InteractionResult<T> {
    match result {
        Ok(Some(value)) => {
            if gate.confirm() {
                Ok(value)
            } else {
                // Ctrl+C landed first
                Err(InteractionError::Cancelled)
            }
        }
        Ok(None) => {
            gate.cancel();
            Err(InteractionError::Cancelled)
        }
        Err(dialoguer::Error::IO(e)) if e.kind() == io::ErrorKind::Interrupted => {
            gate.cancel();
            Err(InteractionError::Cancelled)
        }
        Err(e) => Err(InteractionError::Io(e.to_string())),
    }
}

impl Default for CliAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionAdapter for CliAdapter {
    fn ask_text(&self, prompt: &str, default: Option<&str>) -> InteractionResult<String> {
        let theme = SpacedTheme::new();
        let mut input: Input<String> = Input::with_theme(&theme).with_prompt(prompt);
        if let Some(d) = default {
            input = input.default(d.to_string());
        }

        self.gated(|| input.interact_text().map(Some))
    }

    fn ask_select(&self, prompt: &str, options: &[&str]) -> InteractionResult<usize> {
        if options.is_empty() {
            return Err(InteractionError::InvalidInput(
                "options cannot be empty".to_string(),
            ));
        }

        let theme = SpacedTheme::new();
        self.gated(|| {
            // Print spacing before the select
            eprintln!();
            Select::with_theme(&theme)
                .with_prompt(prompt)
                .items(options)
                .default(0)
                .interact_opt()
        })
    }

    fn ask_multi_select(
        &self,
        prompt: &str,
        options: &[&str],
        checked: bool,
    ) -> InteractionResult<Vec<usize>> {
        if options.is_empty() {
            return Err(InteractionError::InvalidInput(
                "options cannot be empty".to_string(),
            ));
        }

        let theme = SpacedTheme::new();
        let defaults = vec![checked; options.len()];
        self.gated(|| {
            eprintln!();
            MultiSelect::with_theme(&theme)
                .with_prompt(prompt)
                .items(options)
                .defaults(&defaults)
                .interact_opt()
        })
    }

    fn start_progress(&self, message: &str, total: Option<u64>) -> ProgressHandle {
        let id = self.progress_counter.fetch_add(1, Ordering::SeqCst);

        let pb = if self.quiet {
            ProgressBar::hidden()
        } else if let Some(total) = total {
            let pb = ProgressBar::new(total);
            if let Ok(style) =
                ProgressStyle::with_template("{msg} [{bar:30.cyan/blue}] {pos}/{len}")
            {
                pb.set_style(style.progress_chars("=> "));
            }
            pb
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]") {
                pb.set_style(style.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"));
            }
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        };
        pb.set_message(message.to_string());

        if let Ok(mut progress_map) = self.active_progress.lock() {
            progress_map.insert(id, pb);
        }

        ProgressHandle::new(id, message)
    }

    fn advance_progress(&self, handle: &ProgressHandle, delta: u64) {
        if let Ok(progress_map) = self.active_progress.lock() {
            if let Some(pb) = progress_map.get(&handle.id()) {
                pb.inc(delta);
            }
        }
    }

    fn end_progress(&self, handle: ProgressHandle, success: bool) {
        let Ok(mut progress_map) = self.active_progress.lock() else {
            return;
        };
        let Some(pb) = progress_map.remove(&handle.id()) else {
            return;
        };
        let elapsed_str = format!("{:.1}s", pb.elapsed().as_secs_f64());
        pb.finish_and_clear();

        if self.quiet {
            return;
        }
        let msg = handle.message();
        if success {
            println!(
                "{} {} [{}]",
                "✓".style(COLORS.success),
                msg.style(COLORS.success),
                elapsed_str
            );
        } else {
            println!(
                "{} {} [{}]",
                "✗".style(COLORS.fail),
                msg.style(COLORS.fail),
                elapsed_str
            );
        }
    }

    fn print_info(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{}", message);
        let _ = io::stdout().flush();
    }

    fn print_warning(&self, message: &str) {
        eprintln!(
            "{} {}",
            "warning:".style(COLORS.warning).bold(),
            message.style(COLORS.warning)
        );
        let _ = io::stderr().flush();
    }

    fn print_error(&self, message: &str) {
        eprintln!(
            "{} {}",
            "error:".style(COLORS.fail).bold(),
            message.style(COLORS.fail).bold()
        );
        let _ = io::stderr().flush();
    }

    fn print_success(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!("{} {}", "✓".style(COLORS.success), message.style(COLORS.success));
        let _ = io::stdout().flush();
    }

    fn print_header(&self, message: &str) {
        if self.quiet {
            return;
        }
        println!();
        println!("{}", message.style(COLORS.active).bold());
        let _ = io::stdout().flush();
    }

    fn interrupted(&self) -> bool {
        is_cancelled()
    }
}
