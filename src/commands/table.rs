//! `quire table ...`

use crate::cli::{Cli, OutputFormat, TableCommands};
use crate::commands::print_json;
use quire_core::db::tables::{Database, DatabaseRow, PropertyValue, RowProperties, TITLE_PROPERTY};
use quire_core::db::Store;
use quire_core::error::{QuireError, Result};

pub fn execute(cli: &Cli, store: &Store, command: &TableCommands) -> Result<()> {
    match command {
        TableCommands::Create { title, note } => {
            let db = store.create_database(title, note.as_deref())?;
            print_database_id(cli, &db)
        }
        TableCommands::List { note } => {
            let dbs = match note {
                Some(note_id) => store.get_note_databases(note_id)?,
                None => store.list_databases()?,
            };
            match cli.format {
                OutputFormat::Json => print_json(&dbs)?,
                OutputFormat::Human => {
                    for db in &dbs {
                        let owner = db.note_id.as_deref().unwrap_or("-");
                        println!("{}  {}  (note: {})", db.id, db.title, owner);
                    }
                }
            }
            Ok(())
        }
        TableCommands::Show { id, all } => show(cli, store, id, *all),
        TableCommands::AddRow { id, title, values } => {
            let values = row_values(title.as_deref(), values.as_deref())?;
            let row = store.create_database_row(id, values)?;
            match cli.format {
                OutputFormat::Json => print_json(&row)?,
                OutputFormat::Human => println!("{}", row.id),
            }
            Ok(())
        }
        TableCommands::Duplicate { id } => {
            let copy = store.duplicate_database(id)?;
            print_database_id(cli, &copy)
        }
        TableCommands::Delete { id } => {
            store.delete_database(id)?;
            match cli.format {
                OutputFormat::Json => print_json(&serde_json::json!({ "deleted": id }))?,
                OutputFormat::Human => {
                    if !cli.quiet {
                        println!("Deleted table {}", id);
                    }
                }
            }
            Ok(())
        }
    }
}

fn print_database_id(cli: &Cli, db: &Database) -> Result<()> {
    match cli.format {
        OutputFormat::Json => print_json(db)?,
        OutputFormat::Human => println!("{}", db.id),
    }
    Ok(())
}

fn row_values(title: Option<&str>, json: Option<&str>) -> Result<RowProperties> {
    let mut values: RowProperties = match json {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| QuireError::UsageError(format!("invalid --values: {}", e)))?,
        None => RowProperties::new(),
    };
    if let Some(title) = title {
        values.insert(TITLE_PROPERTY.to_string(), PropertyValue::Text(title.to_string()));
    }
    Ok(values)
}

fn show(cli: &Cli, store: &Store, id: &str, all: bool) -> Result<()> {
    let db = store.get_database(id)?;
    let mut rows = store.get_database_rows(id)?;
    if !all {
        if let Some(view) = db.view_config.selected() {
            rows = view.apply(&db.properties_config, rows);
        }
    }

    match cli.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "database": db,
            "rows": rows,
        }))?,
        OutputFormat::Human => print_rows(&db, &rows),
    }
    Ok(())
}

fn print_rows(db: &Database, rows: &[DatabaseRow]) {
    println!("{} ({})", db.title, db.id);
    let header: Vec<&str> = db.properties_config.iter().map(|p| p.name.as_str()).collect();
    println!("{}", header.join(" | "));
    for row in rows {
        let cells: Vec<String> = db
            .properties_config
            .iter()
            .map(|p| row.value(&p.id).map(PropertyValue::as_text).unwrap_or_default())
            .collect();
        println!("{}", cells.join(" | "));
    }
}
