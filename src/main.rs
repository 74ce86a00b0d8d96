//! Quire - local knowledge store CLI
//!
//! Scripting and recovery access to a Quire store: notes, tags, links,
//! journals, mini-tables, version history and integrity tooling.

mod cli;
mod commands;

use std::env;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use cli::{Cli, OutputFormat};
use quire_core::error::{ExitCode as QuireExitCode, QuireError};
use quire_core::logging;

fn main() -> ExitCode {
    let start = Instant::now();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // clap fails before `--format` is known; honour a JSON request from argv
        Err(err) if argv_requests_json() => match err.kind() {
            clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                err.exit()
            }
            _ => return report(&QuireError::UsageError(err.to_string()), true, false),
        },
        Err(err) => err.exit(),
    };

    if let Err(e) = logging::init_tracing(cli.verbose, cli.log_level.as_deref(), cli.log_json) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }
    tracing::debug!(elapsed = ?start.elapsed(), "parse_args");

    match commands::dispatch::run(&cli, start) {
        Ok(()) => ExitCode::from(QuireExitCode::Success as u8),
        Err(e) => report(&e, cli.format == OutputFormat::Json, cli.quiet),
    }
}

/// Print `err` on stderr in the requested shape and map it to an exit status
fn report(err: &QuireError, json: bool, quiet: bool) -> ExitCode {
    if json {
        eprintln!("{}", err.to_json());
    } else if !quiet {
        eprintln!("error: {}", err);
    }
    ExitCode::from(err.exit_code() as u8)
}

fn argv_requests_json() -> bool {
    let args: Vec<String> = env::args().skip(1).collect();
    args.iter().any(|a| a == "--format=json")
        || args.windows(2).any(|w| w[0] == "--format" && w[1] == "json")
}
