use super::notes::{Note, NOTE_COLUMNS};
use super::Store;
use crate::error::{QuireError, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use std::collections::HashSet;

/// A tag and the number of notes currently carrying it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub count: i64,
}

/// Make the note's tag set exactly `tags`, creating missing tag rows
pub(super) fn replace_note_tags(conn: &Connection, note_id: &str, tags: &[String]) -> Result<()> {
    conn.execute("DELETE FROM note_tags WHERE note_id = ?1", params![note_id])
        .map_err(|e| QuireError::db(&format!("clear tags of note {}", note_id), e))?;

    for tag in tags {
        conn.execute(
            "INSERT INTO tags (name) VALUES (?1) ON CONFLICT(name) DO NOTHING",
            params![tag],
        )
        .map_err(|e| QuireError::db(&format!("create tag '{}'", tag), e))?;

        conn.execute(
            "INSERT OR IGNORE INTO note_tags (note_id, tag_id)
             SELECT ?1, id FROM tags WHERE name = ?2",
            params![note_id, tag],
        )
        .map_err(|e| {
            QuireError::db(&format!("tag note {} with '{}'", note_id, tag), e)
        })?;
    }

    Ok(())
}

pub(super) fn prune_orphan_tags_in(conn: &Connection) -> Result<usize> {
    conn.execute(
        "DELETE FROM tags WHERE id NOT IN (SELECT DISTINCT tag_id FROM note_tags)",
        [],
    )
    .map_err(|e| QuireError::db("prune orphaned tags", e))
}

impl Store {
    /// Apply the configured tag policy, dropping empties and duplicates
    pub(crate) fn normalize_tags(&self, raw: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        raw.iter()
            .filter_map(|t| self.config.tags.normalize(t))
            .filter(|t| seen.insert(t.clone()))
            .collect()
    }

    /// Tags in use, most used first then by name. Tags without notes are never listed.
    pub fn get_all_tags(&self) -> Result<Vec<TagCount>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT t.name, COUNT(nt.note_id) AS cnt
                 FROM tags t
                 JOIN note_tags nt ON nt.tag_id = t.id
                 GROUP BY t.id
                 HAVING cnt > 0
                 ORDER BY cnt DESC, t.name ASC",
            )
            .map_err(|e| QuireError::db("prepare tag listing", e))?;

        let tags = stmt
            .query_map([], |row| {
                Ok(TagCount {
                    name: row.get(0)?,
                    count: row.get(1)?,
                })
            })
            .map_err(|e| QuireError::db("list tags", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| QuireError::db("read tag rows", e))?;

        Ok(tags)
    }

    pub fn get_notes_by_tag(&self, name: &str) -> Result<Vec<Note>> {
        self.query_notes(
            &format!(
                "SELECT {} FROM notes n
                 JOIN note_tags nt ON nt.note_id = n.id
                 JOIN tags t ON t.id = nt.tag_id
                 WHERE t.name = ?1
                 ORDER BY n.updated_at DESC",
                NOTE_COLUMNS
            ),
            params![name],
            "list notes by tag",
        )
    }

    pub fn get_note_tags(&self, note_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT t.name FROM tags t
                 JOIN note_tags nt ON nt.tag_id = t.id
                 WHERE nt.note_id = ?1
                 ORDER BY t.name",
            )
            .map_err(|e| QuireError::db("prepare note tags query", e))?;

        let tags = stmt
            .query_map(params![note_id], |row| row.get(0))
            .map_err(|e| QuireError::db("query note tags", e))?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(|e| QuireError::db("read note tags", e))?;

        Ok(tags)
    }

    /// Physically remove tags no note references any more
    pub fn prune_orphan_tags(&self) -> Result<usize> {
        let removed = prune_orphan_tags_in(&self.conn)?;
        if removed > 0 {
            tracing::debug!(removed, "Pruned orphaned tags");
        }
        Ok(removed)
    }
}
