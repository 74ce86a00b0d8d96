//! Command dispatch logic for quire

use std::path::PathBuf;
use std::time::Instant;

use tracing::debug;

use crate::cli::{Cli, Commands};
use crate::commands::{explore, journal, maintenance, notes, table, version};
use quire_core::config::{default_store_dir, DB_FILE};
use quire_core::db::Store;
use quire_core::error::{QuireError, Result};

/// Trace a phase boundary when running with --verbose
macro_rules! trace_command {
    ($cli:expr, $start:expr, $label:expr) => {
        if $cli.verbose {
            ::tracing::debug!(elapsed = ?$start.elapsed(), $label);
        }
    };
}

/// Store directory from --store / QUIRE_STORE, else the per-user default
pub fn store_dir(cli: &Cli) -> Result<PathBuf> {
    match &cli.store {
        Some(path) => Ok(path.clone()),
        None => default_store_dir().ok_or_else(|| {
            QuireError::UsageError(
                "no --store given and no user data directory available".to_string(),
            )
        }),
    }
}

/// Open an existing store; only `init` may create one
pub fn open_store(cli: &Cli) -> Result<Store> {
    let dir = store_dir(cli)?;
    if !dir.join(DB_FILE).exists() {
        return Err(QuireError::not_found("store", dir.display()));
    }
    Store::open(&dir)
}

pub fn run(cli: &Cli, start: Instant) -> Result<()> {
    let Some(command) = &cli.command else {
        println!("quire {}", env!("CARGO_PKG_VERSION"));
        println!();
        println!("Run `quire --help` for usage information.");
        return Ok(());
    };

    if let Commands::Init = command {
        return maintenance::init(cli, &store_dir(cli)?);
    }

    let store = open_store(cli)?;
    trace_command!(cli, start, "open_store");
    debug!(command = ?command, "dispatch");

    match command {
        // Handled before the store is opened
        Commands::Init => Ok(()),
        Commands::Save {
            id,
            title,
            path,
            file,
        } => notes::save(
            cli,
            &store,
            id,
            title.as_deref(),
            path.as_deref(),
            file.as_deref(),
        ),
        Commands::Show { id_or_path } => notes::show(cli, &store, id_or_path),
        Commands::Delete { id } => notes::delete(cli, &store, id),
        Commands::Rename { old_path, new_path } => notes::rename(cli, &store, old_path, new_path),
        Commands::Recent { limit, offset } => notes::recent(cli, &store, *limit, *offset),
        Commands::Tags => explore::tags(cli, &store),
        Commands::Tagged { tag } => explore::tagged(cli, &store, tag),
        Commands::Search {
            query,
            limit,
            snippets,
        } => explore::search(cli, &store, query, *limit, *snippets),
        Commands::Backlinks { id } => explore::backlinks(cli, &store, id),
        Commands::Graph => explore::graph(cli, &store),
        Commands::Journal(cmd) => journal::execute(cli, &store, cmd),
        Commands::Table(cmd) => table::execute(cli, &store, cmd),
        Commands::Version(cmd) => version::execute(cli, &store, cmd),
        Commands::Doctor { repair } => maintenance::doctor(cli, &store, *repair),
        Commands::Index { rebuild } => maintenance::index(cli, &store, *rebuild),
        Commands::Stats => maintenance::stats(cli, &store),
    }?;

    trace_command!(cli, start, "execute_command");
    Ok(())
}
