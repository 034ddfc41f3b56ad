//! mergesweep CLI - Delete branches whose pull requests have been merged

mod cli;
mod colors;
mod commands;
mod interaction;
mod logging;
mod output;

use std::process::ExitCode;

use mergesweep_core::SweepError;

use cli::Commands;
use commands::{ConfigCommands, GlobalOptions, SweepTarget};

fn main() -> ExitCode {
    let cli = cli::parse();
    logging::init(cli.verbose, cli.quiet);

    let global = GlobalOptions {
        verbose: cli.verbose,
        quiet: cli.quiet,
        json: cli.json,
        config: cli.config,
    };

    let result = match cli.command {
        Some(Commands::Remote { target }) => commands::run_sweep(
            SweepTarget::Remote,
            target.repo,
            target.dry_run,
            target.force,
            &global,
        ),
        Some(Commands::Local { target }) => commands::run_sweep(
            SweepTarget::Local,
            target.repo,
            target.dry_run,
            target.force,
            &global,
        ),
        Some(Commands::All { target }) => commands::run_sweep(
            SweepTarget::All,
            target.repo,
            target.dry_run,
            target.force,
            &global,
        ),
        Some(Commands::Config(config_cmd)) => match config_cmd {
            ConfigCommands::Show => commands::run_config_show(&global),
            ConfigCommands::Init { force } => commands::run_config_init(force, &global),
        },
        None => {
            // No subcommand - print version info
            if !global.quiet {
                println!("mergesweep v{}", env!("CARGO_PKG_VERSION"));
                println!("Use --help for usage information");
            }
            Ok(0)
        }
    };

    match result {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            eprintln!("error: {:#}", e);
            let code = e
                .downcast_ref::<SweepError>()
                .map(SweepError::exit_code)
                .unwrap_or(1);
            ExitCode::from(code as u8)
        }
    }
}
