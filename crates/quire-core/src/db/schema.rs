//! SQLite database schema for quire
//!
//! Upgrades are additive only: each step adds columns, tables or indexes and
//! never rewrites primary content.

use crate::error::{QuireError, Result};
use rusqlite::{params, Connection, OptionalExtension};

pub const CURRENT_SCHEMA_VERSION: i64 = 3;

/// Outcome of schema bootstrap
#[derive(Debug, PartialEq, Eq)]
pub enum SchemaCreateResult {
    /// Fresh store, all tables created
    Created,
    /// Existing store upgraded from the given version
    Upgraded { from: i64 },
    /// Already at the current version
    Current,
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    path TEXT NOT NULL UNIQUE,
    content TEXT NOT NULL DEFAULT '',
    plain_text TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    is_journal INTEGER NOT NULL DEFAULT 0,
    journal_date TEXT,
    CHECK ((is_journal = 1) = (journal_date IS NOT NULL))
);
CREATE INDEX IF NOT EXISTS idx_notes_updated ON notes(updated_at);
CREATE UNIQUE INDEX IF NOT EXISTS idx_notes_journal_date
    ON notes(journal_date) WHERE journal_date IS NOT NULL;

CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS note_tags (
    note_id TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (note_id, tag_id)
);
CREATE INDEX IF NOT EXISTS idx_note_tags_tag ON note_tags(tag_id);

-- Targets are not required to resolve
CREATE TABLE IF NOT EXISTS links (
    from_note_id TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    to_note_id TEXT NOT NULL,
    PRIMARY KEY (from_note_id, to_note_id)
);
CREATE INDEX IF NOT EXISTS idx_links_target ON links(to_note_id);

CREATE TABLE IF NOT EXISTS databases (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    properties_config TEXT NOT NULL DEFAULT '[]',
    view_config TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    note_id TEXT REFERENCES notes(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_databases_note ON databases(note_id);

CREATE TABLE IF NOT EXISTS database_rows (
    id TEXT PRIMARY KEY,
    database_id TEXT NOT NULL REFERENCES databases(id) ON DELETE CASCADE,
    properties TEXT NOT NULL DEFAULT '{}',
    order_index INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (database_id, order_index)
);

CREATE TABLE IF NOT EXISTS versions (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    note_id TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    is_forced INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_versions_note ON versions(note_id, created_at);

CREATE TABLE IF NOT EXISTS index_meta (
    key TEXT PRIMARY KEY,
    value TEXT
);
"#;

/// Full-text index over the plain-text projection, maintained by the store
pub(super) const NOTES_FTS_SQL: &str = "CREATE VIRTUAL TABLE IF NOT EXISTS notes_fts USING fts5(
    note_id UNINDEXED,
    title,
    plain_text,
    tokenize='porter unicode61'
);";

/// Additive upgrade steps, keyed by the version they produce
const MIGRATIONS: &[(i64, &str)] = &[
    (
        2,
        "ALTER TABLE databases ADD COLUMN note_id TEXT REFERENCES notes(id) ON DELETE CASCADE;",
    ),
    (
        3,
        "ALTER TABLE versions ADD COLUMN is_forced INTEGER NOT NULL DEFAULT 0;",
    ),
];

fn read_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let has_meta: bool = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'index_meta'",
            [],
            |r| r.get::<_, i64>(0),
        )
        .map(|n| n > 0)
        .map_err(|e| QuireError::db("inspect schema", e))?;
    if !has_meta {
        return Ok(None);
    }

    let version = conn
        .query_row(
            "SELECT value FROM index_meta WHERE key = 'schema_version'",
            [],
            |r| r.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| QuireError::db("read schema version", e))?;

    version.as_deref().map(parse_schema_version).transpose()
}

/// A stored version that is not a number means the meta table is damaged
pub(super) fn parse_schema_version(raw: &str) -> Result<i64> {
    raw.trim().parse().map_err(|_| {
        QuireError::CorruptionDetected(format!("schema version is not a number: {:?}", raw))
    })
}

fn write_schema_version(conn: &Connection, version: i64) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO index_meta (key, value) VALUES ('schema_version', ?1)",
        params![version.to_string()],
    )
    .map_err(|e| QuireError::db("write schema version", e))?;
    Ok(())
}

/// Ensure the schema exists and is at [`CURRENT_SCHEMA_VERSION`]. Idempotent.
pub fn create_schema(conn: &Connection) -> Result<SchemaCreateResult> {
    let current = read_schema_version(conn)?;

    let tx = conn
        .unchecked_transaction()
        .map_err(|e| QuireError::db("begin schema transaction", e))?;

    let result = match current {
        None => {
            tx.execute_batch(SCHEMA_SQL)
                .map_err(|e| QuireError::db("create schema", e))?;
            tx.execute_batch(NOTES_FTS_SQL)
                .map_err(|e| QuireError::db("create text index", e))?;
            write_schema_version(&tx, CURRENT_SCHEMA_VERSION)?;
            SchemaCreateResult::Created
        }
        Some(v) if v == CURRENT_SCHEMA_VERSION => SchemaCreateResult::Current,
        Some(v) if v > CURRENT_SCHEMA_VERSION => {
            return Err(QuireError::UnsupportedSchema {
                found: v,
                supported: CURRENT_SCHEMA_VERSION,
            });
        }
        Some(v) => {
            for (target, sql) in MIGRATIONS.iter().filter(|(target, _)| *target > v) {
                tx.execute_batch(sql).map_err(|e| {
                    QuireError::db(&format!("upgrade schema to version {}", target), e)
                })?;
            }
            // Creates any table or index introduced after `v`
            tx.execute_batch(SCHEMA_SQL)
                .map_err(|e| QuireError::db("complete schema upgrade", e))?;
            tx.execute_batch(NOTES_FTS_SQL)
                .map_err(|e| QuireError::db("create text index", e))?;
            write_schema_version(&tx, CURRENT_SCHEMA_VERSION)?;
            tracing::info!(
                "Database schema updated from version {} to {}",
                v,
                CURRENT_SCHEMA_VERSION
            );
            SchemaCreateResult::Upgraded { from: v }
        }
    };

    tx.commit()
        .map_err(|e| QuireError::db("commit schema transaction", e))?;

    Ok(result)
}

#[cfg(test)]
pub fn force_set_schema_version(conn: &Connection, version: i64) -> Result<()> {
    write_schema_version(conn, version)
}
