use super::{save::read_note, Note, NOTE_COLUMNS};
use crate::db::Store;
use crate::error::{QuireError, Result};
use rusqlite::{params, OptionalExtension};

impl Store {
    pub fn get_note_by_id(&self, id: &str) -> Result<Note> {
        read_note(&self.conn, id)
    }

    pub fn get_note_by_path(&self, path: &str) -> Result<Note> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM notes n WHERE n.path = ?1", NOTE_COLUMNS),
                params![path],
                Note::from_row,
            )
            .optional()
            .map_err(|e| QuireError::db(&format!("read note at {}", path), e))?
            .ok_or_else(|| QuireError::not_found("note", path))
    }

    /// Resolve either a note id or a path
    pub fn resolve_note(&self, id_or_path: &str) -> Result<Note> {
        match self.get_note_by_id(id_or_path) {
            Err(e) if e.is_not_found() => self.get_note_by_path(id_or_path),
            other => other,
        }
    }

    /// Most recently updated notes first
    pub fn get_recent_notes(&self, limit: usize, offset: usize) -> Result<Vec<Note>> {
        self.query_notes(
            &format!(
                "SELECT {} FROM notes n ORDER BY n.updated_at DESC, n.id LIMIT ?1 OFFSET ?2",
                NOTE_COLUMNS
            ),
            params![limit as i64, offset as i64],
            "list recent notes",
        )
    }

    pub fn list_notes(&self) -> Result<Vec<Note>> {
        self.query_notes(
            &format!("SELECT {} FROM notes n ORDER BY n.path", NOTE_COLUMNS),
            [],
            "list notes",
        )
    }

    pub(crate) fn query_notes<P: rusqlite::Params>(
        &self,
        sql: &str,
        params: P,
        operation: &str,
    ) -> Result<Vec<Note>> {
        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| QuireError::db(&format!("prepare {}", operation), e))?;
        let notes = stmt
            .query_map(params, Note::from_row)
            .map_err(|e| QuireError::db(operation, e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| QuireError::db(&format!("read rows to {}", operation), e))?;
        Ok(notes)
    }
}
