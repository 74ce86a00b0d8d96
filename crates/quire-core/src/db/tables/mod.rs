//! Mini-table engine
//!
//! A database is a property list, a view config and an ordered set of rows.
//! Databases may be owned by a note; deleting the note deletes them.

mod rows;
pub mod types;
pub mod view;

pub use types::{
    validate_properties_config, Database, DatabaseRow, DatabaseUpdate, PropertyDef, PropertyType,
    PropertyValue, RowProperties, SelectOption, TITLE_PROPERTY,
};
pub use view::{
    FilterOperator, FilterRule, SortDirection, SortRule, ViewConfig, ViewLayout, ViewState,
};

use super::{from_millis, new_id, now_millis, parse_json, Store};
use crate::bail_not_found;
use crate::error::{QuireError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

const DATABASE_COLUMNS: &str =
    "id, title, properties_config, view_config, note_id, created_at, updated_at";

fn database_from_row(row: &Row<'_>) -> rusqlite::Result<Database> {
    let properties: String = row.get(2)?;
    let view: String = row.get(3)?;
    Ok(Database {
        id: row.get(0)?,
        title: row.get(1)?,
        properties_config: parse_json(2, &properties)?,
        // Display state only; a damaged value falls back to the default view
        view_config: serde_json::from_str(&view).unwrap_or_default(),
        note_id: row.get(4)?,
        created_at: from_millis(row.get(5)?),
        updated_at: from_millis(row.get(6)?),
    })
}

pub(super) fn read_database(conn: &Connection, id: &str) -> Result<Database> {
    conn.query_row(
        &format!("SELECT {} FROM databases WHERE id = ?1", DATABASE_COLUMNS),
        params![id],
        database_from_row,
    )
    .optional()
    .map_err(|e| QuireError::db(&format!("read database {}", id), e))?
    .ok_or_else(|| QuireError::not_found("database", id))
}

fn ensure_note_exists(conn: &Connection, note_id: &str) -> Result<()> {
    let exists: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1)",
            params![note_id],
            |r| r.get(0),
        )
        .map_err(|e| QuireError::db("check owner note", e))?;
    if !exists {
        bail_not_found!("note", note_id);
    }
    Ok(())
}

/// Rewrite every row of `db` so it only holds values its properties accept
fn conform_stored_rows(conn: &Connection, db: &Database) -> Result<usize> {
    let mut stmt = conn
        .prepare("SELECT id, properties FROM database_rows WHERE database_id = ?1")
        .map_err(|e| QuireError::db("prepare row scan", e))?;
    let stored = stmt
        .query_map(params![db.id], |r| {
            Ok((r.get::<_, String>(0)?, r.get::<_, String>(1)?))
        })
        .map_err(|e| QuireError::db("scan rows", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| QuireError::db("read rows", e))?;

    let mut rewritten = 0;
    for (row_id, json) in stored {
        let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&json)?;
        let conformed = serde_json::to_string(&types::conform_values(&db.properties_config, raw))?;
        if conformed != json {
            conn.execute(
                "UPDATE database_rows SET properties = ?1 WHERE id = ?2",
                params![conformed, row_id],
            )
            .map_err(|e| QuireError::db(&format!("rewrite row {}", row_id), e))?;
            rewritten += 1;
        }
    }
    Ok(rewritten)
}

impl Store {
    /// Create a database holding only the title property
    pub fn create_database(&self, title: &str, owner: Option<&str>) -> Result<Database> {
        let id = new_id();
        let now = now_millis();
        let properties = serde_json::to_string(&vec![PropertyDef::title()])?;
        let view = serde_json::to_string(&ViewConfig::default())?;

        let tx = self.immediate_tx()?;
        if let Some(note_id) = owner {
            ensure_note_exists(&tx, note_id)?;
        }
        tx.execute(
            "INSERT INTO databases (id, title, properties_config, view_config, note_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)",
            params![id, title, properties, view, owner, now],
        )
        .map_err(|e| QuireError::db("create database", e))?;
        let db = read_database(&tx, &id)?;
        tx.commit()
            .map_err(|e| QuireError::db("commit database", e))?;

        tracing::debug!(database_id = %id, "Created database");
        Ok(db)
    }

    pub fn get_database(&self, id: &str) -> Result<Database> {
        read_database(&self.conn, id)
    }

    /// All databases, oldest first
    pub fn list_databases(&self) -> Result<Vec<Database>> {
        self.query_databases(
            &format!("SELECT {} FROM databases ORDER BY created_at, id", DATABASE_COLUMNS),
            [],
        )
    }

    /// Databases embedded in `note_id`
    pub fn get_note_databases(&self, note_id: &str) -> Result<Vec<Database>> {
        self.query_databases(
            &format!(
                "SELECT {} FROM databases WHERE note_id = ?1 ORDER BY created_at, id",
                DATABASE_COLUMNS
            ),
            params![note_id],
        )
    }

    fn query_databases<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Database>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| QuireError::db("prepare database listing", e))?;
        let dbs = stmt
            .query_map(params, database_from_row)
            .map_err(|e| QuireError::db("list databases", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| QuireError::db("read database rows", e))?;
        Ok(dbs)
    }

    /// Apply a partial update.
    ///
    /// Removing a property drops its values from every row and its references
    /// from the view config. Retyping a property coerces stored values or drops
    /// them when they cannot be converted.
    pub fn update_database(&self, id: &str, update: DatabaseUpdate) -> Result<Database> {
        let tx = self.immediate_tx()?;
        let mut db = read_database(&tx, id)?;

        if let Some(title) = update.title {
            db.title = title;
        }
        if let Some(view) = update.view_config {
            db.view_config = view;
        }
        if let Some(config) = update.properties_config {
            validate_properties_config(&config)?;

            let removed: Vec<String> = db
                .properties_config
                .iter()
                .filter(|old| !config.iter().any(|p| p.id == old.id))
                .map(|p| p.id.clone())
                .collect();
            let retyped = db
                .properties_config
                .iter()
                .any(|old| config.iter().any(|p| p.id == old.id && p.kind != old.kind));

            for property in &removed {
                db.view_config.prune_property(property);
            }
            db.properties_config = config;

            if !removed.is_empty() || retyped {
                let rewritten = conform_stored_rows(&tx, &db)?;
                tracing::debug!(database_id = %id, removed = removed.len(), rewritten, "Conformed rows to new properties");
            }
        }

        tx.execute(
            "UPDATE databases SET title = ?1, properties_config = ?2, view_config = ?3,
                updated_at = MAX(?4, updated_at + 1)
             WHERE id = ?5",
            params![
                db.title,
                serde_json::to_string(&db.properties_config)?,
                serde_json::to_string(&db.view_config)?,
                now_millis(),
                id
            ],
        )
        .map_err(|e| QuireError::db(&format!("update database {}", id), e))?;
        let db = read_database(&tx, id)?;
        tx.commit()
            .map_err(|e| QuireError::db("commit database update", e))?;
        Ok(db)
    }

    /// Deep copy of a database and its rows under fresh ids. The copy has no
    /// owner note until attached.
    pub fn duplicate_database(&self, id: &str) -> Result<Database> {
        let tx = self.immediate_tx()?;
        read_database(&tx, id)?;

        let copy_id = new_id();
        let now = now_millis();
        tx.execute(
            "INSERT INTO databases (id, title, properties_config, view_config, note_id, created_at, updated_at)
             SELECT ?1, title, properties_config, view_config, NULL, ?2, ?2
             FROM databases WHERE id = ?3",
            params![copy_id, now, id],
        )
        .map_err(|e| QuireError::db(&format!("copy database {}", id), e))?;

        let row_ids: Vec<String> = {
            let mut stmt = tx
                .prepare("SELECT id FROM database_rows WHERE database_id = ?1 ORDER BY order_index")
                .map_err(|e| QuireError::db("prepare row copy", e))?;
            let ids = stmt
                .query_map(params![id], |r| r.get(0))
                .map_err(|e| QuireError::db("list rows to copy", e))?
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| QuireError::db("read rows to copy", e))?;
            ids
        };

        for row_id in &row_ids {
            tx.execute(
                "INSERT INTO database_rows (id, database_id, properties, order_index, created_at, updated_at)
                 SELECT ?1, ?2, properties, order_index, ?3, ?3 FROM database_rows WHERE id = ?4",
                params![new_id(), copy_id, now, row_id],
            )
            .map_err(|e| QuireError::db(&format!("copy row {}", row_id), e))?;
        }

        let copy = read_database(&tx, &copy_id)?;
        tx.commit()
            .map_err(|e| QuireError::db("commit database copy", e))?;

        tracing::debug!(source = %id, copy = %copy_id, rows = row_ids.len(), "Duplicated database");
        Ok(copy)
    }

    /// Delete a database and all of its rows
    pub fn delete_database(&self, id: &str) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM databases WHERE id = ?1", params![id])
            .map_err(|e| QuireError::db(&format!("delete database {}", id), e))?;
        if removed == 0 {
            bail_not_found!("database", id);
        }
        Ok(())
    }

    /// Set or clear the note that owns a database
    pub fn attach_database(&self, id: &str, note_id: Option<&str>) -> Result<Database> {
        let tx = self.immediate_tx()?;
        read_database(&tx, id)?;
        if let Some(note_id) = note_id {
            ensure_note_exists(&tx, note_id)?;
        }
        tx.execute(
            "UPDATE databases SET note_id = ?1, updated_at = MAX(?2, updated_at + 1) WHERE id = ?3",
            params![note_id, now_millis(), id],
        )
        .map_err(|e| QuireError::db(&format!("attach database {}", id), e))?;
        let db = read_database(&tx, id)?;
        tx.commit()
            .map_err(|e| QuireError::db("commit database attach", e))?;
        Ok(db)
    }
}
