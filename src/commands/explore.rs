//! `quire tags|tagged|search|backlinks|graph`

use crate::cli::{Cli, OutputFormat};
use crate::commands::{print_json, print_note_list};
use quire_core::db::{NodeKind, Store};
use quire_core::error::Result;

pub fn tags(cli: &Cli, store: &Store) -> Result<()> {
    let tags = store.get_all_tags()?;
    match cli.format {
        OutputFormat::Json => print_json(&tags)?,
        OutputFormat::Human => {
            for tag in &tags {
                println!("{:>5}  {}", tag.count, tag.name);
            }
        }
    }
    Ok(())
}

pub fn tagged(cli: &Cli, store: &Store, tag: &str) -> Result<()> {
    let notes = store.get_notes_by_tag(tag)?;
    print_note_list(cli, &notes)
}

pub fn search(cli: &Cli, store: &Store, query: &str, limit: usize, snippets: bool) -> Result<()> {
    if !snippets {
        let notes = store.search_notes(Some(query), limit)?;
        return print_note_list(cli, &notes);
    }

    let hits = store.search_snippets(Some(query), limit)?;
    match cli.format {
        OutputFormat::Json => {
            let output: Vec<_> = hits
                .iter()
                .map(|(note, snippet)| {
                    serde_json::json!({
                        "id": note.id,
                        "title": note.title,
                        "path": note.path,
                        "snippet": snippet,
                    })
                })
                .collect();
            print_json(&output)?;
        }
        OutputFormat::Human => {
            for (note, snippet) in &hits {
                println!("{}  {}", note.id, note.title);
                println!("    {}", snippet.replace('\n', " "));
            }
        }
    }
    Ok(())
}

pub fn backlinks(cli: &Cli, store: &Store, id: &str) -> Result<()> {
    let notes = store.get_backlinks(id)?;
    print_note_list(cli, &notes)
}

pub fn graph(cli: &Cli, store: &Store) -> Result<()> {
    let graph = store.get_graph_data()?;
    match cli.format {
        OutputFormat::Json => print_json(&graph)?,
        OutputFormat::Human => {
            for node in &graph.nodes {
                let marker = match node.kind {
                    NodeKind::Journal => "J",
                    NodeKind::Note => "N",
                };
                println!("{} {} \"{}\" degree={}", marker, node.id, node.title, node.degree);
            }
            for edge in &graph.edges {
                println!("E {} -> {}", edge.source, edge.target);
            }
            for link in &graph.dangling {
                println!("D {} -> {} (missing)", link.source, link.target);
            }
        }
    }
    Ok(())
}
