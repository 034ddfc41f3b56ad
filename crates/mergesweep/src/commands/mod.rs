//! CLI command implementations

pub mod config;
pub mod sweep;

pub use config::{ConfigCommands, run_config_init, run_config_show};
pub use sweep::{SweepTarget, run_sweep};

/// Flags shared by every command
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub verbose: bool,
    pub quiet: bool,
    pub json: bool,
    pub config: Option<std::path::PathBuf>,
}
