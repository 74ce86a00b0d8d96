//! `quire save|show|delete|rename|recent`

use std::io::Read;
use std::path::Path;

use crate::cli::{Cli, OutputFormat};
use crate::commands::{print_json, print_note_list};
use quire_core::db::{default_note_path, Store};
use quire_core::error::{QuireError, Result};
use quire_core::history::save_note_with_checkpoint;

fn read_content(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path).map_err(|e| {
            QuireError::UsageError(format!("cannot read {}: {}", path.display(), e))
        }),
        None => {
            let mut content = String::new();
            std::io::stdin().read_to_string(&mut content)?;
            Ok(content)
        }
    }
}

/// Existing notes keep their path; new ones get one derived from their title
fn resolve_path(store: &Store, id: &str, title: Option<&str>, content: &str) -> Result<String> {
    match store.get_note_by_id(id) {
        Ok(note) => Ok(note.path),
        Err(e) if e.is_not_found() => {
            let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
                Some(t) => t.to_string(),
                None => store.extractor().extract(content)?.title,
            };
            Ok(default_note_path(&title))
        }
        Err(e) => Err(e),
    }
}

pub fn save(
    cli: &Cli,
    store: &Store,
    id: &str,
    title: Option<&str>,
    path: Option<&str>,
    file: Option<&Path>,
) -> Result<()> {
    let content = read_content(file)?;
    let path = match path {
        Some(p) => p.to_string(),
        None => resolve_path(store, id, title, &content)?,
    };

    let note = save_note_with_checkpoint(store, id, title.unwrap_or(""), &path, &content)?;

    match cli.format {
        OutputFormat::Json => print_json(&note)?,
        OutputFormat::Human => {
            println!("{}", note.id);
            if !cli.quiet {
                println!("{}", note.path);
            }
        }
    }
    Ok(())
}

pub fn show(cli: &Cli, store: &Store, id_or_path: &str) -> Result<()> {
    let note = store.resolve_note(id_or_path)?;

    match cli.format {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "note": note,
                "tags": store.get_note_tags(&note.id)?,
                "links": store.get_outgoing_links(&note.id)?,
            });
            print_json(&output)?;
        }
        OutputFormat::Human => {
            if !cli.quiet {
                println!("# {} ({})", note.title, note.id);
                println!("path: {}", note.path);
                let tags = store.get_note_tags(&note.id)?;
                if !tags.is_empty() {
                    println!("tags: {}", tags.join(", "));
                }
                println!();
            }
            println!("{}", store.extractor().render(&note.content));
        }
    }
    Ok(())
}

pub fn delete(cli: &Cli, store: &Store, id: &str) -> Result<()> {
    store.delete_note(id)?;
    match cli.format {
        OutputFormat::Json => print_json(&serde_json::json!({ "deleted": id }))?,
        OutputFormat::Human => {
            if !cli.quiet {
                println!("Deleted {}", id);
            }
        }
    }
    Ok(())
}

/// A rename that matches nothing or hits a taken path is a data error
pub fn rename(cli: &Cli, store: &Store, old_path: &str, new_path: &str) -> Result<()> {
    if !store.rename_note(old_path, new_path)? {
        return Err(QuireError::ConstraintViolation(format!(
            "cannot rename {} to {}: no such note or target path taken",
            old_path, new_path
        )));
    }
    match cli.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "old_path": old_path,
            "new_path": new_path,
        }))?,
        OutputFormat::Human => {
            if !cli.quiet {
                println!("{} -> {}", old_path, new_path);
            }
        }
    }
    Ok(())
}

pub fn recent(cli: &Cli, store: &Store, limit: usize, offset: usize) -> Result<()> {
    let notes = store.get_recent_notes(limit, offset)?;
    print_note_list(cli, &notes)
}
