use super::save::{delete_note_cascade, ensure_path_free, read_note, upsert_note_row, NoteRow};
use super::{Note, NOTE_COLUMNS};
use crate::db::{format_date, new_id, Store};
use crate::error::{QuireError, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt::Write as _;

fn journal_id_for(conn: &Connection, date: NaiveDate) -> Result<Option<String>> {
    conn.query_row(
        "SELECT id FROM notes WHERE journal_date = ?1",
        params![format_date(date)],
        |r| r.get(0),
    )
    .optional()
    .map_err(|e| QuireError::db("look up journal", e))
}

impl Store {
    /// Create the journal note for `date` (today when `None`), or return the
    /// existing one
    pub fn create_journal(&self, date: Option<NaiveDate>) -> Result<Note> {
        let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());

        let tx = self.immediate_tx()?;
        if let Some(id) = journal_id_for(&tx, date)? {
            return read_note(&tx, &id);
        }

        let mut title = String::new();
        write!(title, "{}", date.format(&self.config.journal.title_format)).map_err(|_| {
            QuireError::invalid_value("journal title format", &self.config.journal.title_format)
        })?;
        let path = format!(
            "{}/{}.md",
            self.config.journal.path_prefix.trim_end_matches('/'),
            format_date(date)
        );
        let id = new_id();

        ensure_path_free(&tx, &path, &id)?;
        upsert_note_row(
            &tx,
            &NoteRow {
                id: &id,
                title: &title,
                path: &path,
                content: "",
                plain_text: "",
                journal_date: Some(date),
            },
        )?;
        let note = read_note(&tx, &id)?;
        tx.commit()
            .map_err(|e| QuireError::db("commit journal", e))?;

        tracing::debug!(date = %date, note_id = %note.id, "Created journal");
        Ok(note)
    }

    pub fn journal_exists(&self, date: NaiveDate) -> Result<bool> {
        Ok(journal_id_for(&self.conn, date)?.is_some())
    }

    pub fn get_journal(&self, date: NaiveDate) -> Result<Note> {
        match journal_id_for(&self.conn, date)? {
            Some(id) => read_note(&self.conn, &id),
            None => Err(QuireError::not_found("journal", format_date(date))),
        }
    }

    /// Journals ordered by date, newest first
    pub fn get_journals(&self, limit: usize, offset: usize) -> Result<Vec<Note>> {
        self.query_notes(
            &format!(
                "SELECT {} FROM notes n WHERE n.is_journal = 1
                 ORDER BY n.journal_date DESC LIMIT ?1 OFFSET ?2",
                NOTE_COLUMNS
            ),
            params![limit as i64, offset as i64],
            "list journals",
        )
    }

    /// Delete the journal for `date`; returns the number of notes removed
    pub fn delete_journal(&self, date: NaiveDate) -> Result<usize> {
        let tx = self.immediate_tx()?;
        let removed = match journal_id_for(&tx, date)? {
            Some(id) => delete_note_cascade(&tx, &id)?,
            None => 0,
        };
        tx.commit()
            .map_err(|e| QuireError::db("commit journal delete", e))?;
        Ok(removed)
    }
}
