//! Structural self-check and best-effort repair
//!
//! Repair always starts with a full backup. Each step runs in its own
//! exclusive transaction and reports its own outcome; note rows are never
//! deleted by any step.

use super::schema::NOTES_FTS_SQL;
use super::search::rebuild_index_in;
use super::tags::prune_orphan_tags_in;
use super::Store;
use crate::error::{QuireError, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One problem found by [`Store::check_integrity`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// Reported by SQLite's own structure check
    Structure { detail: String },
    /// A row whose parent is gone
    ForeignKey { table: String, rowid: Option<i64>, parent: String },
    /// The text index failed its internal consistency check
    IndexCorrupt { detail: String },
    IndexCountMismatch { notes: i64, indexed: i64 },
    /// Index entries for notes that no longer exist
    StaleIndexEntries { count: i64 },
    /// Notes without an index entry
    MissingIndexEntries { count: i64 },
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityIssue::Structure { detail } => write!(f, "structure: {}", detail),
            IntegrityIssue::ForeignKey { table, rowid, parent } => match rowid {
                Some(rowid) => write!(f, "{} row {} references missing {}", table, rowid, parent),
                None => write!(f, "{} row references missing {}", table, parent),
            },
            IntegrityIssue::IndexCorrupt { detail } => write!(f, "text index corrupt: {}", detail),
            IntegrityIssue::IndexCountMismatch { notes, indexed } => {
                write!(f, "text index holds {} entries for {} notes", indexed, notes)
            }
            IntegrityIssue::StaleIndexEntries { count } => {
                write!(f, "{} index entries for deleted notes", count)
            }
            IntegrityIssue::MissingIndexEntries { count } => {
                write!(f, "{} notes missing from the text index", count)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub ok: bool,
    /// Summary of the first problem, absent when `ok`
    pub error: Option<String>,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    fn from_issues(issues: Vec<IntegrityIssue>) -> Self {
        let error = match issues.len() {
            0 => None,
            1 => Some(issues[0].to_string()),
            n => Some(format!("{} (and {} more)", issues[0], n - 1)),
        };
        IntegrityReport {
            ok: issues.is_empty(),
            error,
            issues,
        }
    }

    /// Turn a failed report into a [`QuireError::CorruptionDetected`]
    pub fn into_result(self) -> Result<Self> {
        match &self.error {
            Some(e) if !self.ok => Err(QuireError::CorruptionDetected(e.clone())),
            _ => Ok(self),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairStep {
    pub name: String,
    pub ok: bool,
    /// Rows removed or rewritten by the step
    pub affected: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    pub ok: bool,
    pub message: String,
    pub backup_path: PathBuf,
    pub steps: Vec<RepairStep>,
}

type RepairFn = fn(&Connection) -> Result<usize>;

fn exec(conn: &Connection, sql: &str, what: &str) -> Result<usize> {
    conn.execute(sql, [])
        .map_err(|e| QuireError::db(what, e))
}

fn remove_orphan_note_tags(conn: &Connection) -> Result<usize> {
    exec(
        conn,
        "DELETE FROM note_tags
         WHERE note_id NOT IN (SELECT id FROM notes) OR tag_id NOT IN (SELECT id FROM tags)",
        "remove orphaned tag associations",
    )
}

fn remove_orphan_links(conn: &Connection) -> Result<usize> {
    exec(
        conn,
        "DELETE FROM links WHERE from_note_id NOT IN (SELECT id FROM notes)",
        "remove orphaned links",
    )
}

fn remove_orphan_rows(conn: &Connection) -> Result<usize> {
    exec(
        conn,
        "DELETE FROM database_rows WHERE database_id NOT IN (SELECT id FROM databases)",
        "remove orphaned database rows",
    )
}

fn detach_orphan_databases(conn: &Connection) -> Result<usize> {
    exec(
        conn,
        "UPDATE databases SET note_id = NULL
         WHERE note_id IS NOT NULL AND note_id NOT IN (SELECT id FROM notes)",
        "detach databases from missing notes",
    )
}

fn remove_orphan_versions(conn: &Connection) -> Result<usize> {
    exec(
        conn,
        "DELETE FROM versions WHERE note_id NOT IN (SELECT id FROM notes)",
        "remove orphaned versions",
    )
}

/// Rebuild the index in place, or drop and recreate it when the table
/// itself is unusable
fn rebuild_text_index(conn: &Connection) -> Result<usize> {
    match rebuild_index_in(conn) {
        Ok(n) => Ok(n),
        Err(e) => {
            tracing::warn!(error = %e, "Text index rebuild failed, recreating the table");
            conn.execute_batch("DROP TABLE IF EXISTS notes_fts;")
                .map_err(|e| QuireError::db("drop text index", e))?;
            conn.execute_batch(NOTES_FTS_SQL)
                .map_err(|e| QuireError::db("recreate text index", e))?;
            rebuild_index_in(conn)
        }
    }
}

fn reindex(conn: &Connection) -> Result<usize> {
    conn.execute_batch("REINDEX;")
        .map_err(|e| QuireError::db("rebuild indexes", e))?;
    Ok(0)
}

const REPAIR_STEPS: &[(&str, RepairFn)] = &[
    ("remove orphaned tag associations", remove_orphan_note_tags),
    ("remove orphaned links", remove_orphan_links),
    ("remove orphaned database rows", remove_orphan_rows),
    ("detach databases from missing notes", detach_orphan_databases),
    ("remove orphaned versions", remove_orphan_versions),
    ("prune unused tags", prune_orphan_tags_in),
    ("rebuild text index", rebuild_text_index),
    ("rebuild indexes", reindex),
];

impl Store {
    /// Run every structural check. Failing checks become issues in the report
    /// rather than errors.
    #[tracing::instrument(skip(self))]
    pub fn check_integrity(&self) -> Result<IntegrityReport> {
        let mut issues = Vec::new();

        if let Err(e) = self.quick_check(&mut issues) {
            issues.push(IntegrityIssue::Structure { detail: e.to_string() });
        }
        if let Err(e) = self.foreign_key_check(&mut issues) {
            issues.push(IntegrityIssue::Structure { detail: e.to_string() });
        }
        if let Err(e) = self
            .conn
            .execute("INSERT INTO notes_fts(notes_fts) VALUES('integrity-check')", [])
        {
            issues.push(IntegrityIssue::IndexCorrupt { detail: e.to_string() });
        }
        if let Err(e) = self.index_check(&mut issues) {
            issues.push(IntegrityIssue::IndexCorrupt { detail: e.to_string() });
        }

        let report = IntegrityReport::from_issues(issues);
        if report.ok {
            tracing::debug!("Integrity check passed");
        } else {
            tracing::error!(issues = report.issues.len(), error = ?report.error, "Integrity check failed");
        }
        Ok(report)
    }

    fn quick_check(&self, issues: &mut Vec<IntegrityIssue>) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("PRAGMA quick_check")
            .map_err(|e| QuireError::db("prepare quick check", e))?;
        let lines = stmt
            .query_map([], |r| r.get::<_, String>(0))
            .map_err(|e| QuireError::db("run quick check", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| QuireError::db("read quick check", e))?;

        issues.extend(
            lines
                .into_iter()
                .filter(|l| l != "ok")
                .map(|detail| IntegrityIssue::Structure { detail }),
        );
        Ok(())
    }

    fn foreign_key_check(&self, issues: &mut Vec<IntegrityIssue>) -> Result<()> {
        let mut stmt = self
            .conn
            .prepare("PRAGMA foreign_key_check")
            .map_err(|e| QuireError::db("prepare foreign key check", e))?;
        let violations = stmt
            .query_map([], |r| {
                Ok(IntegrityIssue::ForeignKey {
                    table: r.get(0)?,
                    rowid: r.get(1)?,
                    parent: r.get(2)?,
                })
            })
            .map_err(|e| QuireError::db("run foreign key check", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| QuireError::db("read foreign key check", e))?;
        issues.extend(violations);
        Ok(())
    }

    fn index_check(&self, issues: &mut Vec<IntegrityIssue>) -> Result<()> {
        let notes = self.note_count()?;
        let indexed = self.index_entry_count()?;
        if notes != indexed {
            issues.push(IntegrityIssue::IndexCountMismatch { notes, indexed });
        }

        let count = |sql: &str, what: &str| -> Result<i64> {
            self.conn
                .query_row(sql, [], |r| r.get(0))
                .map_err(|e| QuireError::db(what, e))
        };
        let stale = count(
            "SELECT COUNT(*) FROM notes_fts WHERE note_id NOT IN (SELECT id FROM notes)",
            "count stale index entries",
        )?;
        if stale > 0 {
            issues.push(IntegrityIssue::StaleIndexEntries { count: stale });
        }
        let missing = count(
            "SELECT COUNT(*) FROM notes WHERE id NOT IN (SELECT note_id FROM notes_fts)",
            "count unindexed notes",
        )?;
        if missing > 0 {
            issues.push(IntegrityIssue::MissingIndexEntries { count: missing });
        }
        Ok(())
    }

    /// Copy the whole store to the backup directory and return the copy's path
    pub fn backup(&self) -> Result<PathBuf> {
        let Some(db_path) = self.path.as_deref() else {
            return Err(QuireError::IoFailure(
                "in-memory stores cannot be backed up".to_string(),
            ));
        };

        let dir = match &self.config.backup_dir {
            Some(dir) => dir.clone(),
            None => db_path
                .parent()
                .unwrap_or_else(|| Path::new("."))
                .join("backups"),
        };
        std::fs::create_dir_all(&dir).map_err(|e| {
            QuireError::IoFailure(format!("failed to create backup dir {}: {}", dir.display(), e))
        })?;

        let target = dir.join(format!(
            "quire-{}-{}.db",
            chrono::Utc::now().format("%Y%m%dT%H%M%S%3f"),
            super::new_id()
        ));

        if let Err(e) = self
            .conn
            .execute("VACUUM INTO ?1", params![target.to_string_lossy()])
        {
            tracing::warn!(error = %e, "VACUUM INTO failed, copying the database file");
            let _ = self.conn.pragma_update(None, "wal_checkpoint", "TRUNCATE");
            std::fs::copy(db_path, &target).map_err(|io| {
                QuireError::IoFailure(format!(
                    "failed to back up {} to {}: {}",
                    db_path.display(),
                    target.display(),
                    io
                ))
            })?;
        }

        tracing::info!(path = %target.display(), "Backed up store");
        Ok(target)
    }

    /// Back up the store, then repair what can be repaired.
    ///
    /// Fails without touching anything when the backup cannot be taken.
    #[tracing::instrument(skip(self))]
    pub fn repair_database(&self) -> Result<RepairReport> {
        let backup_path = self.backup()?;

        let mut steps = Vec::with_capacity(REPAIR_STEPS.len());
        for (name, step) in REPAIR_STEPS {
            let outcome = self.run_repair_step(*step);
            match &outcome {
                Ok(affected) => tracing::info!(step = name, affected, "Repair step done"),
                Err(e) => tracing::error!(step = name, error = %e, "Repair step failed"),
            }
            steps.push(RepairStep {
                name: name.to_string(),
                ok: outcome.is_ok(),
                affected: *outcome.as_ref().unwrap_or(&0),
                error: outcome.err().map(|e| e.to_string()),
            });
        }

        let failed: Vec<&str> = steps.iter().filter(|s| !s.ok).map(|s| s.name.as_str()).collect();
        let after = self.check_integrity()?;

        let (ok, message) = if !failed.is_empty() {
            (false, format!("repair incomplete, failed steps: {}", failed.join(", ")))
        } else if !after.ok {
            (
                false,
                format!(
                    "repair finished but problems remain: {}",
                    after.error.unwrap_or_default()
                ),
            )
        } else {
            (true, "store repaired".to_string())
        };

        Ok(RepairReport {
            ok,
            message,
            backup_path,
            steps,
        })
    }

    fn run_repair_step(&self, step: RepairFn) -> Result<usize> {
        let tx = self.exclusive_tx()?;
        let affected = step(&tx)?;
        tx.commit()
            .map_err(|e| QuireError::db("commit repair step", e))?;
        Ok(affected)
    }
}
