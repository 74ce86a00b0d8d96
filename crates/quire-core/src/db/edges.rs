use super::notes::{Note, NOTE_COLUMNS};
use super::Store;
use crate::error::{QuireError, Result};
use rusqlite::{params, Connection};

/// Replace all outgoing links of a note with `targets`
pub(super) fn replace_links(conn: &Connection, from_id: &str, targets: &[String]) -> Result<()> {
    conn.execute("DELETE FROM links WHERE from_note_id = ?1", params![from_id])
        .map_err(|e| QuireError::db(&format!("delete links of note {}", from_id), e))?;

    for target in targets {
        let target = target.trim();
        if target.is_empty() {
            continue;
        }
        conn.execute(
            "INSERT OR IGNORE INTO links (from_note_id, to_note_id) VALUES (?1, ?2)",
            params![from_id, target],
        )
        .map_err(|e| QuireError::db(&format!("insert link {} -> {}", from_id, target), e))?;
    }

    Ok(())
}

impl Store {
    /// Notes that link to `note_id`
    pub fn get_backlinks(&self, note_id: &str) -> Result<Vec<Note>> {
        self.query_notes(
            &format!(
                "SELECT {} FROM links l
                 JOIN notes n ON n.id = l.from_note_id
                 WHERE l.to_note_id = ?1
                 ORDER BY n.updated_at DESC",
                NOTE_COLUMNS
            ),
            params![note_id],
            "query backlinks",
        )
    }

    /// Link targets of a note, resolved or not
    pub fn get_outgoing_links(&self, note_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT to_note_id FROM links WHERE from_note_id = ?1 ORDER BY to_note_id")
            .map_err(|e| QuireError::db("prepare outgoing links query", e))?;

        let targets = stmt
            .query_map(params![note_id], |row| row.get(0))
            .map_err(|e| QuireError::db("query outgoing links", e))?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(|e| QuireError::db("read outgoing links", e))?;

        Ok(targets)
    }
}
