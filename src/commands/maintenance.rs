//! `quire init|doctor|index|stats`

use std::path::Path;

use crate::cli::{Cli, OutputFormat};
use crate::commands::print_json;
use quire_core::config::{StoreConfig, CONFIG_FILE};
use quire_core::db::Store;
use quire_core::error::{QuireError, Result};

/// Create the store directory and database; writes a default quire.toml
/// unless one is already there
pub fn init(cli: &Cli, dir: &Path) -> Result<()> {
    let store = Store::open(dir)?;
    let config_written = if dir.join(CONFIG_FILE).exists() {
        false
    } else {
        StoreConfig::default().save(dir)?;
        true
    };
    tracing::info!(path = %dir.display(), config_written, "Initialized store");

    match cli.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "store": dir,
            "schema_version": store.get_schema_version()?,
            "config_written": config_written,
        }))?,
        OutputFormat::Human => {
            if !cli.quiet {
                println!("Initialized store at {}", dir.display());
            }
        }
    }
    Ok(())
}

/// Report integrity problems; with `repair`, back up and repair first.
/// Problems that remain make the command fail.
pub fn doctor(cli: &Cli, store: &Store, repair: bool) -> Result<()> {
    if repair {
        let report = store.repair_database()?;
        match cli.format {
            OutputFormat::Json => print_json(&report)?,
            OutputFormat::Human => {
                if !cli.quiet {
                    println!("Backup: {}", report.backup_path.display());
                    for step in &report.steps {
                        match &step.error {
                            None => println!("  ok    {} ({})", step.name, step.affected),
                            Some(e) => println!("  FAIL  {}: {}", step.name, e),
                        }
                    }
                }
                println!("{}", report.message);
            }
        }
        if !report.ok {
            return Err(QuireError::CorruptionDetected(report.message));
        }
        return Ok(());
    }

    let report = store.check_integrity()?;
    match cli.format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Human => {
            if report.ok {
                if !cli.quiet {
                    println!("Store is healthy");
                }
            } else {
                for issue in &report.issues {
                    println!("  {}", issue);
                }
                println!("Run `quire doctor --repair` to fix");
            }
        }
    }
    report.into_result().map(|_| ())
}

pub fn index(cli: &Cli, store: &Store, rebuild: bool) -> Result<()> {
    let indexed = if rebuild {
        store.rebuild_fts_index()?
    } else {
        store.rebuild_index()?
    };
    match cli.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "status": "ok",
            "notes_indexed": indexed,
        }))?,
        OutputFormat::Human => {
            if !cli.quiet {
                println!("Indexed {} notes", indexed);
            }
        }
    }
    Ok(())
}

pub fn stats(cli: &Cli, store: &Store) -> Result<()> {
    let stats = store.stats()?;
    match cli.format {
        OutputFormat::Json => print_json(&stats)?,
        OutputFormat::Human => {
            println!("notes:          {}", stats.notes);
            println!("journals:       {}", stats.journals);
            println!("tags:           {}", stats.tags);
            println!("links:          {}", stats.links);
            println!("tables:         {}", stats.databases);
            println!("table rows:     {}", stats.database_rows);
            println!("versions:       {}", stats.versions);
            println!("schema version: {}", stats.schema_version);
        }
    }
    Ok(())
}
