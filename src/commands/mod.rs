//! Command implementations for quire

pub mod dispatch;
pub mod explore;
pub mod journal;
pub mod maintenance;
pub mod notes;
pub mod table;
pub mod version;

use crate::cli::{Cli, OutputFormat};
use quire_core::db::Note;
use quire_core::error::Result;
use serde::Serialize;

/// Print `value` as pretty JSON on stdout
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One line per note: id, date and title
pub fn print_note_list(cli: &Cli, notes: &[Note]) -> Result<()> {
    match cli.format {
        OutputFormat::Json => print_json(notes)?,
        OutputFormat::Human => {
            if notes.is_empty() && !cli.quiet {
                println!("No notes");
            }
            for note in notes {
                println!(
                    "{}  {}  {}",
                    note.id,
                    note.updated_at.format("%Y-%m-%d %H:%M"),
                    note.title
                );
            }
        }
    }
    Ok(())
}
