//! `quire version ...`

use crate::cli::{Cli, OutputFormat, VersionCommands};
use crate::commands::print_json;
use quire_core::db::Store;
use quire_core::diff::render_unified;
use quire_core::error::Result;
use quire_core::history::restore_version;

pub fn execute(cli: &Cli, store: &Store, command: &VersionCommands) -> Result<()> {
    match command {
        VersionCommands::Save { note, force } => {
            let current = store.get_note_by_id(note)?;
            let saved = store.save_version(&current.id, &current.content, *force)?;
            match cli.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "saved": saved.is_some(),
                    "version": saved,
                }))?,
                OutputFormat::Human => match saved {
                    Some(v) => println!("{}", v.id),
                    None => {
                        if !cli.quiet {
                            println!("Skipped: latest snapshot is too recent (use --force)");
                        }
                    }
                },
            }
        }
        VersionCommands::List {
            note,
            limit,
            offset,
        } => {
            let versions = store.get_versions(note, *limit, *offset)?;
            match cli.format {
                OutputFormat::Json => print_json(&versions)?,
                OutputFormat::Human => {
                    for v in &versions {
                        println!(
                            "{}  {}  {:>7}B{}",
                            v.id,
                            v.created_at.format("%Y-%m-%d %H:%M:%S"),
                            v.size,
                            if v.is_forced { "  forced" } else { "" }
                        );
                    }
                }
            }
        }
        VersionCommands::Show { id } => {
            let version = store.get_version(id)?;
            match cli.format {
                OutputFormat::Json => print_json(&version)?,
                OutputFormat::Human => println!("{}", store.extractor().render(&version.content)),
            }
        }
        VersionCommands::Diff { from, to } => {
            let diff = store.compare_versions(from, to)?;
            match cli.format {
                OutputFormat::Json => print_json(&diff)?,
                OutputFormat::Human => {
                    if !cli.quiet {
                        println!("+{} -{}", diff.insertions, diff.deletions);
                    }
                    print!("{}", render_unified(&diff.lines));
                }
            }
        }
        VersionCommands::Delete { id, all } => {
            let deleted = if *all {
                store.delete_all_versions(id)?
            } else {
                store.delete_version(id)?;
                1
            };
            match cli.format {
                OutputFormat::Json => print_json(&serde_json::json!({ "deleted": deleted }))?,
                OutputFormat::Human => {
                    if !cli.quiet {
                        println!("Deleted {} version(s)", deleted);
                    }
                }
            }
        }
        VersionCommands::Restore { id } => {
            let note = restore_version(store, id)?;
            match cli.format {
                OutputFormat::Json => print_json(&note)?,
                OutputFormat::Human => {
                    if !cli.quiet {
                        println!("Restored {} from {}", note.id, id);
                    }
                }
            }
        }
    }
    Ok(())
}
