//! SQLite-backed knowledge store
//!
//! Every public operation on [`Store`] is one all-or-nothing unit. Derived
//! state (tags, links, the text index) is written in the same transaction as
//! the note it belongs to.

mod edges;
mod graph;
mod integrity;
mod notes;
mod schema;
mod search;
pub mod tables;
mod tags;
mod versions;

use crate::config::{StoreConfig, DB_FILE};
use crate::error::{QuireError, Result};
use crate::extract::{MarkdownExtractor, MetadataExtractor};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use graph::{DanglingLink, GraphData, GraphEdge, GraphNode, NodeKind};
pub use integrity::{IntegrityIssue, IntegrityReport, RepairReport, RepairStep};
pub use notes::{default_note_path, Note};
pub use schema::{create_schema, SchemaCreateResult, CURRENT_SCHEMA_VERSION};
pub use tags::TagCount;
pub use versions::{VersionDiff, VersionSnapshot, VersionSummary};

/// Row counts reported by [`Store::stats`]
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    pub notes: i64,
    pub journals: i64,
    pub tags: i64,
    pub links: i64,
    pub databases: i64,
    pub database_rows: i64,
    pub versions: i64,
    pub schema_version: i64,
}

/// The local knowledge store
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
    config: StoreConfig,
    extractor: Arc<dyn MetadataExtractor>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("path", &self.path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Store {
    /// Open or create the store in `store_dir`, reading `quire.toml` if present
    pub fn open(store_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(store_dir)?;
        let config = StoreConfig::load(store_dir)?;
        let extractor = Arc::new(MarkdownExtractor::new(config.extractor.clone())?);
        Self::open_with(&store_dir.join(DB_FILE), config, extractor)
    }

    /// Open or create the database file at `db_path` with explicit collaborators
    pub fn open_with(
        db_path: &Path,
        config: StoreConfig,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Result<Self> {
        let conn = Connection::open(db_path).map_err(|e| {
            QuireError::IoFailure(format!(
                "failed to open database at {}: {}",
                db_path.display(),
                e
            ))
        })?;

        conn.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
            .map_err(|e| QuireError::db("set busy timeout", e))?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| QuireError::db("enable WAL mode", e))?;

        let store = Self::bootstrap(conn, Some(db_path.to_path_buf()), config, extractor)?;
        tracing::debug!(path = %db_path.display(), "Opened store");
        Ok(store)
    }

    /// Open a private in-memory store with default configuration
    pub fn open_in_memory() -> Result<Self> {
        let config = StoreConfig::default();
        let extractor = Arc::new(MarkdownExtractor::new(config.extractor.clone())?);
        Self::open_in_memory_with(config, extractor)
    }

    pub fn open_in_memory_with(
        config: StoreConfig,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| QuireError::db("open in-memory database", e))?;
        Self::bootstrap(conn, None, config, extractor)
    }

    fn bootstrap(
        conn: Connection,
        path: Option<PathBuf>,
        config: StoreConfig,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Result<Self> {
        conn.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
            .map_err(|e| QuireError::db("set busy timeout", e))?;
        conn.pragma_update(None, "foreign_keys", "ON")
            .map_err(|e| QuireError::db("enable foreign keys", e))?;

        let created = create_schema(&conn)?;
        let store = Store {
            conn,
            path,
            config,
            extractor,
        };

        if created != SchemaCreateResult::Created && store.config.auto_rebuild_index {
            let notes = store.note_count()?;
            let indexed = store.index_entry_count()?;
            if notes != indexed {
                tracing::info!(
                    notes,
                    indexed,
                    "Text index out of step with notes, rebuilding"
                );
                store.rebuild_index()?;
            }
        }

        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Database file path, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn extractor(&self) -> &dyn MetadataExtractor {
        self.extractor.as_ref()
    }

    /// Transaction that takes the write lock up front, so a read-then-write
    /// inside it cannot interleave with another writer
    pub(crate) fn immediate_tx(&self) -> Result<Transaction<'_>> {
        Transaction::new_unchecked(&self.conn, TransactionBehavior::Immediate)
            .map_err(|e| QuireError::db("begin immediate transaction", e))
    }

    /// Store-wide exclusive transaction
    pub(crate) fn exclusive_tx(&self) -> Result<Transaction<'_>> {
        Transaction::new_unchecked(&self.conn, TransactionBehavior::Exclusive)
            .map_err(|e| QuireError::db("begin exclusive transaction", e))
    }

    fn count(&self, sql: &str, what: &str) -> Result<i64> {
        self.conn
            .query_row(sql, [], |r| r.get(0))
            .map_err(|e| QuireError::db(&format!("count {}", what), e))
    }

    pub fn note_count(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM notes", "notes")
    }

    pub(crate) fn index_entry_count(&self) -> Result<i64> {
        self.count("SELECT COUNT(*) FROM notes_fts", "index entries")
    }

    pub fn get_schema_version(&self) -> Result<i64> {
        let raw: String = self
            .conn
            .query_row(
                "SELECT value FROM index_meta WHERE key = 'schema_version'",
                [],
                |r| r.get(0),
            )
            .map_err(|e| QuireError::db("get schema version", e))?;
        schema::parse_schema_version(&raw)
    }

    pub fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            notes: self.note_count()?,
            journals: self.count("SELECT COUNT(*) FROM notes WHERE is_journal = 1", "journals")?,
            tags: self.count(
                "SELECT COUNT(*) FROM tags WHERE id IN (SELECT tag_id FROM note_tags)",
                "tags",
            )?,
            links: self.count("SELECT COUNT(*) FROM links", "links")?,
            databases: self.count("SELECT COUNT(*) FROM databases", "databases")?,
            database_rows: self.count("SELECT COUNT(*) FROM database_rows", "database rows")?,
            versions: self.count("SELECT COUNT(*) FROM versions", "versions")?,
            schema_version: self.get_schema_version()?,
        })
    }
}

impl Drop for Store {
    fn drop(&mut self) {
        if self.path.is_some() {
            let _ = self.conn.pragma_update(None, "wal_checkpoint", "TRUNCATE");
        }
    }
}

pub(crate) fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

pub(crate) fn new_id() -> String {
    ulid::Ulid::new().to_string().to_lowercase()
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(idx: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub(crate) fn parse_json<T: serde::de::DeserializeOwned>(
    idx: usize,
    value: &str,
) -> rusqlite::Result<T> {
    serde_json::from_str(value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests;
