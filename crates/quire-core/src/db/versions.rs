use super::{from_millis, new_id, now_millis, Store};
use crate::config::VersionPolicy;
use crate::diff::{diff_lines, DiffLine, DiffTag};
use crate::error::{QuireError, Result};
use crate::bail_not_found;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

/// An immutable copy of a note's content
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSnapshot {
    pub id: String,
    pub note_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Explicit checkpoint rather than a periodic one
    pub is_forced: bool,
}

/// Listing entry without the content itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionSummary {
    pub id: String,
    pub note_id: String,
    pub created_at: DateTime<Utc>,
    pub is_forced: bool,
    /// Content length in bytes
    pub size: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDiff {
    pub from: String,
    pub to: String,
    pub insertions: usize,
    pub deletions: usize,
    pub lines: Vec<DiffLine>,
}

impl VersionSnapshot {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(VersionSnapshot {
            id: row.get(0)?,
            note_id: row.get(1)?,
            content: row.get(2)?,
            created_at: from_millis(row.get(3)?),
            is_forced: row.get::<_, i64>(4)? == 1,
        })
    }
}

fn read_version(conn: &Connection, id: &str) -> Result<VersionSnapshot> {
    conn.query_row(
        "SELECT id, note_id, content, created_at, is_forced FROM versions WHERE id = ?1",
        params![id],
        VersionSnapshot::from_row,
    )
    .optional()
    .map_err(|e| QuireError::db(&format!("read version {}", id), e))?
    .ok_or_else(|| QuireError::not_found("version", id))
}

/// Delete the oldest snapshots of a note beyond the policy's bound.
///
/// The newest `keep_recent` snapshots are never touched, nor are forced
/// snapshots younger than the forced retention window.
fn prune_versions_in(conn: &Connection, note_id: &str, policy: &VersionPolicy, now: i64) -> Result<usize> {
    let mut stmt = conn
        .prepare(
            "SELECT seq, created_at, is_forced FROM versions WHERE note_id = ?1
             ORDER BY created_at DESC, seq DESC",
        )
        .map_err(|e| QuireError::db("prepare version pruning", e))?;
    let entries = stmt
        .query_map(params![note_id], |r| {
            Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?, r.get::<_, i64>(2)? == 1))
        })
        .map_err(|e| QuireError::db("list versions to prune", e))?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| QuireError::db("read versions to prune", e))?;

    let max = policy.max_per_note;
    if entries.len() <= max {
        return Ok(0);
    }
    let mut excess = entries.len() - max;
    let retention = policy.forced_retention().as_millis() as i64;

    let mut removed = 0;
    for (seq, created_at, is_forced) in entries.iter().skip(policy.keep_recent).rev() {
        if excess == 0 {
            break;
        }
        if *is_forced && now - created_at < retention {
            continue;
        }
        conn.execute("DELETE FROM versions WHERE seq = ?1", params![seq])
            .map_err(|e| QuireError::db("prune version", e))?;
        excess -= 1;
        removed += 1;
    }
    Ok(removed)
}

/// JSON documents are diffed in pretty form so each field lands on its own line
fn diffable(content: &str) -> String {
    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(v @ (serde_json::Value::Object(_) | serde_json::Value::Array(_))) => {
            serde_json::to_string_pretty(&v).unwrap_or_else(|_| content.to_string())
        }
        _ => content.to_string(),
    }
}

impl Store {
    /// Snapshot `content` for `note_id`.
    ///
    /// Unless `force` is set, nothing is written while the newest snapshot of
    /// the note is younger than the configured minimum interval; `Ok(None)`
    /// reports the skip.
    pub fn save_version(
        &self,
        note_id: &str,
        content: &str,
        force: bool,
    ) -> Result<Option<VersionSnapshot>> {
        let now = now_millis();
        let tx = self.immediate_tx()?;

        let note_exists: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM notes WHERE id = ?1)",
                params![note_id],
                |r| r.get(0),
            )
            .map_err(|e| QuireError::db("check note for version", e))?;
        if !note_exists {
            bail_not_found!("note", note_id);
        }

        if !force {
            let last: Option<i64> = tx
                .query_row(
                    "SELECT MAX(created_at) FROM versions WHERE note_id = ?1",
                    params![note_id],
                    |r| r.get(0),
                )
                .map_err(|e| QuireError::db("read latest version time", e))?;
            let min_interval = self.config.versions.min_interval().as_millis() as i64;
            if let Some(last) = last {
                if now - last < min_interval {
                    tracing::debug!(note_id, "Version skipped, interval not elapsed");
                    return Ok(None);
                }
            }
        }

        let id = new_id();
        tx.execute(
            "INSERT INTO versions (id, note_id, content, created_at, is_forced)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, note_id, content, now, force as i64],
        )
        .map_err(|e| QuireError::db(&format!("save version of note {}", note_id), e))?;

        let pruned = prune_versions_in(&tx, note_id, &self.config.versions, now)?;
        let snapshot = read_version(&tx, &id)?;
        tx.commit()
            .map_err(|e| QuireError::db("commit version", e))?;

        tracing::debug!(note_id, version_id = %id, force, pruned, "Saved version");
        Ok(Some(snapshot))
    }

    /// Apply the retention policy to one note's snapshots now
    pub fn prune_versions(&self, note_id: &str) -> Result<usize> {
        let tx = self.immediate_tx()?;
        let removed = prune_versions_in(&tx, note_id, &self.config.versions, now_millis())?;
        tx.commit()
            .map_err(|e| QuireError::db("commit version pruning", e))?;
        Ok(removed)
    }

    /// Snapshots of a note, newest first
    pub fn get_versions(&self, note_id: &str, limit: usize, offset: usize) -> Result<Vec<VersionSummary>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, note_id, created_at, is_forced, length(CAST(content AS BLOB))
                 FROM versions WHERE note_id = ?1
                 ORDER BY created_at DESC, seq DESC
                 LIMIT ?2 OFFSET ?3",
            )
            .map_err(|e| QuireError::db("prepare version listing", e))?;

        let versions = stmt
            .query_map(params![note_id, limit as i64, offset as i64], |r| {
                Ok(VersionSummary {
                    id: r.get(0)?,
                    note_id: r.get(1)?,
                    created_at: from_millis(r.get(2)?),
                    is_forced: r.get::<_, i64>(3)? == 1,
                    size: r.get::<_, i64>(4)? as usize,
                })
            })
            .map_err(|e| QuireError::db("list versions", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| QuireError::db("read version rows", e))?;

        Ok(versions)
    }

    pub fn get_version(&self, id: &str) -> Result<VersionSnapshot> {
        read_version(&self.conn, id)
    }

    /// Line diff from version `from_id` to version `to_id`
    pub fn compare_versions(&self, from_id: &str, to_id: &str) -> Result<VersionDiff> {
        let from = read_version(&self.conn, from_id)?;
        let to = read_version(&self.conn, to_id)?;

        let lines = diff_lines(&diffable(&from.content), &diffable(&to.content));
        let count = |tag| lines.iter().filter(|l| l.tag == tag).count();
        Ok(VersionDiff {
            from: from.id,
            to: to.id,
            insertions: count(DiffTag::Insert),
            deletions: count(DiffTag::Delete),
            lines,
        })
    }

    pub fn delete_version(&self, id: &str) -> Result<()> {
        let removed = self
            .conn
            .execute("DELETE FROM versions WHERE id = ?1", params![id])
            .map_err(|e| QuireError::db(&format!("delete version {}", id), e))?;
        if removed == 0 {
            bail_not_found!("version", id);
        }
        Ok(())
    }

    /// Remove every snapshot of a note; returns how many were deleted
    pub fn delete_all_versions(&self, note_id: &str) -> Result<usize> {
        self.conn
            .execute("DELETE FROM versions WHERE note_id = ?1", params![note_id])
            .map_err(|e| QuireError::db(&format!("delete versions of note {}", note_id), e))
    }
}
