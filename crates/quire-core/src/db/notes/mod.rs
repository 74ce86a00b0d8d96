mod journal;
mod read;
mod save;

use super::{from_millis, parse_date};
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// A persisted note and its plain-text projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: String,
    pub title: String,
    pub path: String,
    /// Opaque serialized document
    pub content: String,
    pub plain_text: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_journal: bool,
    pub journal_date: Option<NaiveDate>,
}

pub(crate) const NOTE_COLUMNS: &str =
    "n.id, n.title, n.path, n.content, n.plain_text, n.created_at, n.updated_at, n.is_journal, n.journal_date";

impl Note {
    /// Map a row selected with [`NOTE_COLUMNS`]
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let journal_date: Option<String> = row.get(8)?;
        Ok(Note {
            id: row.get(0)?,
            title: row.get(1)?,
            path: row.get(2)?,
            content: row.get(3)?,
            plain_text: row.get(4)?,
            created_at: from_millis(row.get(5)?),
            updated_at: from_millis(row.get(6)?),
            is_journal: row.get::<_, i64>(7)? == 1,
            journal_date: journal_date.map(|d| parse_date(8, &d)).transpose()?,
        })
    }
}

/// Default storage path for a note with the given title
pub fn default_note_path(title: &str) -> String {
    let slug = slug::slugify(title);
    if slug.is_empty() {
        format!("notes/{}.md", super::new_id())
    } else {
        format!("notes/{}.md", slug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_note_path_slugifies_title() {
        assert_eq!(default_note_path("Hello, World!"), "notes/hello-world.md");
    }

    #[test]
    fn test_default_note_path_for_symbol_only_title() {
        let path = default_note_path("!!!");
        assert!(path.starts_with("notes/"));
        assert!(path.ends_with(".md"));
        assert!(path.len() > "notes/.md".len());
    }
}
