use super::{Note, NOTE_COLUMNS};
use crate::db::{edges, format_date, now_millis, search, tags, Store};
use crate::error::{QuireError, Result};
use crate::extract::ExtractedMetadata;
use crate::{bail_constraint, bail_not_found};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};

/// Column values for a note upsert
pub(super) struct NoteRow<'a> {
    pub id: &'a str,
    pub title: &'a str,
    pub path: &'a str,
    pub content: &'a str,
    pub plain_text: &'a str,
    pub journal_date: Option<NaiveDate>,
}

/// Insert a note or update an existing one. `created_at` and the journal
/// columns are only written on insert; `updated_at` always moves forward.
pub(super) fn upsert_note_row(conn: &Connection, row: &NoteRow<'_>) -> Result<()> {
    let previous: Option<i64> = conn
        .query_row(
            "SELECT updated_at FROM notes WHERE id = ?1",
            params![row.id],
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| QuireError::db("read previous timestamp", e))?;

    let now = now_millis();
    let updated_at = previous.map_or(now, |prev| now.max(prev + 1));

    conn.execute(
        "INSERT INTO notes (id, title, path, content, plain_text, created_at, updated_at, is_journal, journal_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?7, ?8)
         ON CONFLICT(id) DO UPDATE SET
            title = excluded.title,
            path = excluded.path,
            content = excluded.content,
            plain_text = excluded.plain_text,
            updated_at = ?9",
        params![
            row.id,
            row.title,
            row.path,
            row.content,
            row.plain_text,
            now,
            row.journal_date.is_some() as i64,
            row.journal_date.map(format_date),
            updated_at,
        ],
    )
    .map_err(|e| QuireError::db(&format!("upsert note {}", row.id), e))?;

    search::write_index_entry(conn, row.id, row.title, row.plain_text)
}

/// Fail with a constraint violation when `path` belongs to a note other than `id`
pub(super) fn ensure_path_free(conn: &Connection, path: &str, id: &str) -> Result<()> {
    let owner: Option<String> = conn
        .query_row(
            "SELECT id FROM notes WHERE path = ?1 AND id != ?2",
            params![path, id],
            |r| r.get(0),
        )
        .optional()
        .map_err(|e| QuireError::db("check path ownership", e))?;

    if let Some(owner) = owner {
        bail_constraint!("path {} is already used by note {}", path, owner);
    }
    Ok(())
}

pub(super) fn read_note(conn: &Connection, id: &str) -> Result<Note> {
    conn.query_row(
        &format!("SELECT {} FROM notes n WHERE n.id = ?1", NOTE_COLUMNS),
        params![id],
        Note::from_row,
    )
    .optional()
    .map_err(|e| QuireError::db(&format!("read note {}", id), e))?
    .ok_or_else(|| QuireError::not_found("note", id))
}

/// Remove a note and everything that hangs off it.
///
/// Tag associations, outgoing links, version snapshots and owned databases go
/// through foreign key cascades; the text index entry and tags left without
/// any note are removed here. Incoming links from other notes are kept.
pub(super) fn delete_note_cascade(conn: &Connection, id: &str) -> Result<usize> {
    search::remove_index_entry(conn, id)?;
    let removed = conn
        .execute("DELETE FROM notes WHERE id = ?1", params![id])
        .map_err(|e| QuireError::db(&format!("delete note {}", id), e))?;
    if removed > 0 {
        tags::prune_orphan_tags_in(conn)?;
    }
    Ok(removed)
}

impl Store {
    /// Persist a note together with its tag, link and index projections.
    ///
    /// Metadata is extracted before anything is written; an extraction error
    /// fails the save and leaves the previous projections untouched.
    #[tracing::instrument(skip(self, title, content), fields(note_id = %id))]
    pub fn save_note(&self, id: &str, title: &str, path: &str, content: &str) -> Result<Note> {
        if id.trim().is_empty() {
            return Err(QuireError::invalid_value("note id", "(empty)"));
        }
        if path.trim().is_empty() {
            return Err(QuireError::invalid_value("note path", "(empty)"));
        }

        let meta = self.extract(content)?;
        let tags = self.normalize_tags(&meta.tags);
        let title = if title.trim().is_empty() {
            meta.title.as_str()
        } else {
            title.trim()
        };

        let tx = self.immediate_tx()?;
        ensure_path_free(&tx, path, id)?;
        upsert_note_row(
            &tx,
            &NoteRow {
                id,
                title,
                path,
                content,
                plain_text: &meta.plain_text,
                journal_date: None,
            },
        )?;
        tags::replace_note_tags(&tx, id, &tags)?;
        edges::replace_links(&tx, id, &meta.outgoing_links)?;
        let note = read_note(&tx, id)?;
        tx.commit()
            .map_err(|e| QuireError::db(&format!("commit note {}", id), e))?;

        tracing::debug!(
            tags = tags.len(),
            links = meta.outgoing_links.len(),
            "Saved note"
        );
        Ok(note)
    }

    fn extract(&self, content: &str) -> Result<ExtractedMetadata> {
        self.extractor.extract(content).map_err(|e| match e {
            QuireError::ExtractionFailure(_) => e,
            other => QuireError::ExtractionFailure(other.to_string()),
        })
    }

    /// Delete a note. Incoming links from other notes are left dangling.
    pub fn delete_note(&self, id: &str) -> Result<()> {
        let tx = self.immediate_tx()?;
        let removed = delete_note_cascade(&tx, id)?;
        if removed == 0 {
            bail_not_found!("note", id);
        }
        tx.commit()
            .map_err(|e| QuireError::db(&format!("commit delete of note {}", id), e))?;
        tracing::debug!(note_id = %id, "Deleted note");
        Ok(())
    }

    /// Move a note to a new path. Returns false when `old_path` does not exist
    /// or `new_path` is already taken.
    pub fn rename_note(&self, old_path: &str, new_path: &str) -> Result<bool> {
        if new_path.trim().is_empty() {
            return Ok(false);
        }

        let tx = self.immediate_tx()?;
        let id: Option<String> = tx
            .query_row(
                "SELECT id FROM notes WHERE path = ?1",
                params![old_path],
                |r| r.get(0),
            )
            .optional()
            .map_err(|e| QuireError::db("look up note by path", e))?;

        let Some(id) = id else {
            return Ok(false);
        };
        if old_path == new_path {
            return Ok(true);
        }

        let taken: bool = tx
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM notes WHERE path = ?1)",
                params![new_path],
                |r| r.get(0),
            )
            .map_err(|e| QuireError::db("check new path", e))?;
        if taken {
            tracing::debug!(old_path, new_path, "Rename refused, path taken");
            return Ok(false);
        }

        let now = now_millis();
        tx.execute(
            "UPDATE notes SET path = ?1, updated_at = MAX(?2, updated_at + 1) WHERE id = ?3",
            params![new_path, now, id],
        )
        .map_err(|e| QuireError::db(&format!("rename note {}", id), e))?;
        tx.commit()
            .map_err(|e| QuireError::db(&format!("commit rename of note {}", id), e))?;
        Ok(true)
    }
}
