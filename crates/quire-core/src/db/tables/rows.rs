use super::types::{conform_values, validate_values, DatabaseRow, PropertyDef, RowProperties};
use super::{read_database, Store};
use crate::bail_constraint;
use crate::db::{from_millis, new_id, now_millis, parse_json};
use crate::error::{QuireError, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::{BTreeMap, HashSet};

const ROW_COLUMNS: &str = "id, database_id, properties, order_index, created_at, updated_at";

/// A row as stored, before its values are checked against the properties
struct StoredRow {
    id: String,
    database_id: String,
    properties: BTreeMap<String, serde_json::Value>,
    order_index: i64,
    created_at: i64,
    updated_at: i64,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let properties: String = row.get(2)?;
        Ok(StoredRow {
            id: row.get(0)?,
            database_id: row.get(1)?,
            properties: parse_json(2, &properties)?,
            order_index: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn conform(self, config: &[PropertyDef]) -> DatabaseRow {
        DatabaseRow {
            id: self.id,
            database_id: self.database_id,
            properties: conform_values(config, self.properties),
            order_index: self.order_index,
            created_at: from_millis(self.created_at),
            updated_at: from_millis(self.updated_at),
        }
    }
}

fn read_stored_row(conn: &Connection, row_id: &str) -> Result<StoredRow> {
    conn.query_row(
        &format!("SELECT {} FROM database_rows WHERE id = ?1", ROW_COLUMNS),
        params![row_id],
        StoredRow::from_row,
    )
    .optional()
    .map_err(|e| QuireError::db(&format!("read row {}", row_id), e))?
    .ok_or_else(|| QuireError::not_found("row", row_id))
}

fn read_rows(conn: &Connection, database_id: &str, config: &[PropertyDef]) -> Result<Vec<DatabaseRow>> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM database_rows WHERE database_id = ?1 ORDER BY order_index",
            ROW_COLUMNS
        ))
        .map_err(|e| QuireError::db("prepare row listing", e))?;
    let rows = stmt
        .query_map(params![database_id], StoredRow::from_row)
        .map_err(|e| QuireError::db("list rows", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| QuireError::db("read row data", e))?;
    Ok(rows.into_iter().map(|r| r.conform(config)).collect())
}

impl Store {
    /// Append a row at the end of the database.
    ///
    /// The order index is allocated by the insert itself inside an immediate
    /// transaction, so concurrent appends from several connections serialize
    /// on the write lock and never share an index.
    pub fn create_database_row(&self, database_id: &str, initial: RowProperties) -> Result<DatabaseRow> {
        let tx = self.immediate_tx()?;
        let db = read_database(&tx, database_id)?;
        validate_values(&db.properties_config, &initial)?;

        let id = new_id();
        tx.execute(
            "INSERT INTO database_rows (id, database_id, properties, order_index, created_at, updated_at)
             SELECT ?1, ?2, ?3, COALESCE(MAX(order_index) + 1, 0), ?4, ?4
             FROM database_rows WHERE database_id = ?2",
            params![id, database_id, serde_json::to_string(&initial)?, now_millis()],
        )
        .map_err(|e| QuireError::db(&format!("append row to database {}", database_id), e))?;

        let row = read_stored_row(&tx, &id)?.conform(&db.properties_config);
        tx.commit()
            .map_err(|e| QuireError::db("commit row append", e))?;

        tracing::debug!(database_id, row_id = %row.id, order_index = row.order_index, "Appended row");
        Ok(row)
    }

    pub fn get_database_row(&self, row_id: &str) -> Result<DatabaseRow> {
        let stored = read_stored_row(&self.conn, row_id)?;
        let db = read_database(&self.conn, &stored.database_id)?;
        Ok(stored.conform(&db.properties_config))
    }

    /// Merge `patch` into the row's values; keys not in `patch` are kept
    pub fn update_database_row(&self, row_id: &str, patch: RowProperties) -> Result<DatabaseRow> {
        let tx = self.immediate_tx()?;
        let stored = read_stored_row(&tx, row_id)?;
        let db = read_database(&tx, &stored.database_id)?;
        validate_values(&db.properties_config, &patch)?;

        let mut row = stored.conform(&db.properties_config);
        row.properties.extend(patch);

        tx.execute(
            "UPDATE database_rows SET properties = ?1, updated_at = MAX(?2, updated_at + 1)
             WHERE id = ?3",
            params![serde_json::to_string(&row.properties)?, now_millis(), row_id],
        )
        .map_err(|e| QuireError::db(&format!("update row {}", row_id), e))?;

        let row = read_stored_row(&tx, row_id)?.conform(&db.properties_config);
        tx.commit()
            .map_err(|e| QuireError::db("commit row update", e))?;
        Ok(row)
    }

    pub fn delete_database_row(&self, row_id: &str) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM database_rows WHERE id = ?1", params![row_id])
            .map_err(|e| QuireError::db(&format!("delete row {}", row_id), e))?;
        if removed == 0 {
            return Err(QuireError::not_found("row", row_id));
        }
        Ok(())
    }

    /// Rows in manual order
    pub fn get_database_rows(&self, database_id: &str) -> Result<Vec<DatabaseRow>> {
        let db = read_database(&self.conn, database_id)?;
        read_rows(&self.conn, database_id, &db.properties_config)
    }

    /// Put rows in the given order, renumbering them from 0. `ordered_ids`
    /// must name every row of the database exactly once.
    pub fn reorder_database_rows(
        &self,
        database_id: &str,
        ordered_ids: &[String],
    ) -> Result<Vec<DatabaseRow>> {
        let tx = self.immediate_tx()?;
        let db = read_database(&tx, database_id)?;
        let current = read_rows(&tx, database_id, &db.properties_config)?;

        let wanted: HashSet<&str> = ordered_ids.iter().map(String::as_str).collect();
        let existing: HashSet<&str> = current.iter().map(|r| r.id.as_str()).collect();
        if wanted.len() != ordered_ids.len() || wanted != existing {
            bail_constraint!(
                "reorder of database {} must list each of its {} rows exactly once",
                database_id,
                current.len()
            );
        }

        // Park every index out of the way first so the unique constraint
        // holds after each single update
        tx.execute(
            "UPDATE database_rows SET order_index = -1 - order_index WHERE database_id = ?1",
            params![database_id],
        )
        .map_err(|e| QuireError::db("park row order", e))?;
        for (position, row_id) in ordered_ids.iter().enumerate() {
            tx.execute(
                "UPDATE database_rows SET order_index = ?1 WHERE id = ?2",
                params![position as i64, row_id],
            )
            .map_err(|e| QuireError::db(&format!("move row {}", row_id), e))?;
        }

        let rows = read_rows(&tx, database_id, &db.properties_config)?;
        tx.commit()
            .map_err(|e| QuireError::db("commit row reorder", e))?;
        Ok(rows)
    }
}
