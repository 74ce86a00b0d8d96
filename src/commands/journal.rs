//! `quire journal ...`

use crate::cli::{Cli, JournalCommands, OutputFormat};
use crate::commands::{print_json, print_note_list};
use quire_core::db::Store;
use quire_core::error::Result;

pub fn execute(cli: &Cli, store: &Store, command: &JournalCommands) -> Result<()> {
    match command {
        JournalCommands::Create { date } => {
            let note = store.create_journal(*date)?;
            match cli.format {
                OutputFormat::Json => print_json(&note)?,
                OutputFormat::Human => {
                    println!("{}", note.id);
                    if !cli.quiet {
                        println!("{}", note.path);
                    }
                }
            }
        }
        JournalCommands::List { limit, offset } => {
            let notes = store.get_journals(*limit, *offset)?;
            print_note_list(cli, &notes)?;
        }
        JournalCommands::Exists { date } => {
            let exists = store.journal_exists(*date)?;
            match cli.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "date": date,
                    "exists": exists,
                }))?,
                OutputFormat::Human => println!("{}", exists),
            }
        }
        JournalCommands::Delete { date } => {
            let deleted = store.delete_journal(*date)?;
            match cli.format {
                OutputFormat::Json => print_json(&serde_json::json!({
                    "date": date,
                    "deleted": deleted,
                }))?,
                OutputFormat::Human => {
                    if !cli.quiet {
                        println!("Deleted {} journal(s)", deleted);
                    }
                }
            }
        }
    }
    Ok(())
}
