use super::notes::{Note, NOTE_COLUMNS};
use super::Store;
use crate::error::{QuireError, Result};
use crate::trace_time;
use rusqlite::{params, Connection};

/// Column weights handed to `bm25()`: note_id, title, plain_text
const BM25_WEIGHTS: &str = "0.0, 2.0, 1.0";

/// Write (or overwrite) the text index entry of one note
pub(super) fn write_index_entry(
    conn: &Connection,
    note_id: &str,
    title: &str,
    plain_text: &str,
) -> Result<()> {
    remove_index_entry(conn, note_id)?;
    conn.execute(
        "INSERT INTO notes_fts (note_id, title, plain_text) VALUES (?1, ?2, ?3)",
        params![note_id, title, plain_text],
    )
    .map_err(|e| QuireError::db(&format!("index note {}", note_id), e))?;
    Ok(())
}

pub(super) fn remove_index_entry(conn: &Connection, note_id: &str) -> Result<()> {
    conn.execute("DELETE FROM notes_fts WHERE note_id = ?1", params![note_id])
        .map_err(|e| QuireError::db(&format!("remove index entry of note {}", note_id), e))?;
    Ok(())
}

/// Replace the whole index with entries derived from the notes table
pub(super) fn rebuild_index_in(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM notes_fts", [])
        .map_err(|e| QuireError::db("clear text index", e))?;
    conn.execute(
        "INSERT INTO notes_fts (note_id, title, plain_text)
         SELECT id, title, plain_text FROM notes",
        [],
    )
    .map_err(|e| QuireError::db("fill text index", e))
}

/// Turn free text into an FTS5 MATCH expression.
///
/// Each whitespace-separated token becomes a quoted prefix term, so user
/// input can never be parsed as FTS5 syntax. Returns `None` when nothing
/// searchable is left.
pub(crate) fn build_fts_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|tok| tok.replace('"', ""))
        .filter(|tok| !tok.is_empty())
        .map(|tok| format!("\"{}\"*", tok))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" "))
    }
}

impl Store {
    /// Notes matching `query`, best match first.
    ///
    /// A missing, empty or whitespace-only query returns nothing without
    /// touching the index.
    pub fn search_notes(&self, query: Option<&str>, limit: usize) -> Result<Vec<Note>> {
        let Some(fts_query) = query.and_then(build_fts_query) else {
            return Ok(Vec::new());
        };

        self.query_notes(
            &format!(
                "SELECT {} FROM notes_fts f
                 JOIN notes n ON n.id = f.note_id
                 WHERE notes_fts MATCH ?1
                 ORDER BY bm25(notes_fts, {}) ASC, n.updated_at DESC
                 LIMIT ?2",
                NOTE_COLUMNS, BM25_WEIGHTS
            ),
            params![fts_query, limit as i64],
            "search notes",
        )
    }

    /// Like [`Store::search_notes`] with a highlighted excerpt of the body
    pub fn search_snippets(
        &self,
        query: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(Note, String)>> {
        let Some(fts_query) = query.and_then(build_fts_query) else {
            return Ok(Vec::new());
        };

        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {}, snippet(notes_fts, 2, '[', ']', '…', 12)
                 FROM notes_fts f
                 JOIN notes n ON n.id = f.note_id
                 WHERE notes_fts MATCH ?1
                 ORDER BY bm25(notes_fts, {}) ASC, n.updated_at DESC
                 LIMIT ?2",
                NOTE_COLUMNS, BM25_WEIGHTS
            ))
            .map_err(|e| QuireError::db("prepare snippet search", e))?;

        let hits = stmt
            .query_map(params![fts_query, limit as i64], |row| {
                Ok((Note::from_row(row)?, row.get::<_, String>(9)?))
            })
            .map_err(|e| QuireError::db("search snippets", e))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| QuireError::db("read snippet rows", e))?;

        Ok(hits)
    }

    /// Recompute the text index from every note's plain text
    #[tracing::instrument(skip(self))]
    pub fn rebuild_index(&self) -> Result<usize> {
        let start = std::time::Instant::now();
        let tx = self.immediate_tx()?;
        let indexed = rebuild_index_in(&tx)?;
        tx.commit()
            .map_err(|e| QuireError::db("commit index rebuild", e))?;
        trace_time!(start, "rebuild_index");
        tracing::info!(indexed, "Rebuilt text index");
        Ok(indexed)
    }

    /// Rebuild the text index while holding the store exclusively
    pub fn rebuild_fts_index(&self) -> Result<usize> {
        let tx = self.exclusive_tx()?;
        let indexed = rebuild_index_in(&tx)?;
        tx.commit()
            .map_err(|e| QuireError::db("commit text index recovery", e))?;
        tracing::info!(indexed, "Recovered text index");
        Ok(indexed)
    }
}
