//! Diagnostic logging setup
//!
//! Diagnostics go to stderr through `tracing`; user-facing output does not.
//! `RUST_LOG` takes precedence over the level chosen from the flags.

use std::io;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter for the given verbosity
fn default_directive(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "mergesweep=debug,mergesweep_core=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    }
}

/// Install the global subscriber; later calls are ignored
pub fn init(verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(verbose)
        .without_time();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}
