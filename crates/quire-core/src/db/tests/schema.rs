use super::store;
use crate::config::DB_FILE;
use crate::db::schema::force_set_schema_version;
use crate::db::{create_schema, SchemaCreateResult, Store, CURRENT_SCHEMA_VERSION};
use crate::error::QuireError;
use rusqlite::Connection;
use tempfile::tempdir;

/// Layout written by the first release: no database ownership, no forced
/// snapshot flag, no text index
const V1_SCHEMA: &str = r#"
CREATE TABLE notes (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    path TEXT NOT NULL UNIQUE,
    content TEXT NOT NULL DEFAULT '',
    plain_text TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    is_journal INTEGER NOT NULL DEFAULT 0,
    journal_date TEXT
);
CREATE TABLE tags (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL UNIQUE);
CREATE TABLE note_tags (
    note_id TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    tag_id INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (note_id, tag_id)
);
CREATE TABLE links (
    from_note_id TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    to_note_id TEXT NOT NULL,
    PRIMARY KEY (from_note_id, to_note_id)
);
CREATE TABLE databases (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    properties_config TEXT NOT NULL DEFAULT '[]',
    view_config TEXT NOT NULL DEFAULT '{}',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE TABLE database_rows (
    id TEXT PRIMARY KEY,
    database_id TEXT NOT NULL REFERENCES databases(id) ON DELETE CASCADE,
    properties TEXT NOT NULL DEFAULT '{}',
    order_index INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (database_id, order_index)
);
CREATE TABLE versions (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    id TEXT NOT NULL UNIQUE,
    note_id TEXT NOT NULL REFERENCES notes(id) ON DELETE CASCADE,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE TABLE index_meta (key TEXT PRIMARY KEY, value TEXT);
INSERT INTO index_meta (key, value) VALUES ('schema_version', '1');
INSERT INTO notes (id, title, path, content, plain_text, created_at, updated_at)
    VALUES ('old', 'Old note', 'old.md', 'ancient scroll', 'ancient scroll', 1000, 1000);
INSERT INTO versions (id, note_id, content, created_at) VALUES ('v-old', 'old', 'ancient', 900);
"#;

fn has_column(conn: &Connection, table: &str, column: &str) -> bool {
    let mut stmt = conn
        .prepare(&format!("SELECT name FROM pragma_table_info('{}')", table))
        .unwrap();
    let names: Vec<String> = stmt
        .query_map([], |r| r.get(0))
        .unwrap()
        .collect::<std::result::Result<_, _>>()
        .unwrap();
    names.iter().any(|n| n == column)
}

#[test]
fn test_fresh_store_is_current() {
    let store = store();
    assert_eq!(store.get_schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    assert_eq!(create_schema(&store.conn).unwrap(), SchemaCreateResult::Current);
}

#[test]
fn test_newer_schema_is_rejected() {
    let store = store();
    force_set_schema_version(&store.conn, CURRENT_SCHEMA_VERSION + 1).unwrap();

    let err = create_schema(&store.conn).unwrap_err();
    assert!(matches!(
        err,
        QuireError::UnsupportedSchema { found, supported }
            if found == CURRENT_SCHEMA_VERSION + 1 && supported == CURRENT_SCHEMA_VERSION
    ));
}

#[test]
fn test_unreadable_schema_version_is_corruption() {
    let dir = tempdir().unwrap();
    {
        let store = Store::open(dir.path()).unwrap();
        store
            .conn
            .execute(
                "UPDATE index_meta SET value = 'three' WHERE key = 'schema_version'",
                [],
            )
            .unwrap();
        assert!(matches!(
            store.get_schema_version(),
            Err(QuireError::CorruptionDetected(_))
        ));
    }

    let err = Store::open(dir.path()).unwrap_err();
    assert!(matches!(err, QuireError::CorruptionDetected(ref m) if m.contains("three")));
}

#[test]
fn test_newer_schema_file_fails_to_open() {
    let dir = tempdir().unwrap();
    {
        let store = Store::open(dir.path()).unwrap();
        force_set_schema_version(&store.conn, 99).unwrap();
    }
    let err = Store::open(dir.path()).unwrap_err();
    assert!(matches!(err, QuireError::UnsupportedSchema { found: 99, .. }));
}

#[test]
fn test_v1_store_upgrades_in_place() {
    let dir = tempdir().unwrap();
    {
        let conn = Connection::open(dir.path().join(DB_FILE)).unwrap();
        conn.execute_batch(V1_SCHEMA).unwrap();
    }

    let store = Store::open(dir.path()).unwrap();

    assert_eq!(store.get_schema_version().unwrap(), CURRENT_SCHEMA_VERSION);
    assert!(has_column(&store.conn, "databases", "note_id"));
    assert!(has_column(&store.conn, "versions", "is_forced"));

    let note = store.get_note_by_id("old").unwrap();
    assert_eq!(note.content, "ancient scroll");
    assert_eq!(store.index_entry_count().unwrap(), 1);
    assert_eq!(store.search_notes(Some("scroll"), 10).unwrap().len(), 1);

    let versions = store.get_versions("old", 10, 0).unwrap();
    assert_eq!(versions.len(), 1);
    assert!(!versions[0].is_forced);
}

#[test]
fn test_upgraded_store_reopens_as_current() {
    let dir = tempdir().unwrap();
    {
        let conn = Connection::open(dir.path().join(DB_FILE)).unwrap();
        conn.execute_batch(V1_SCHEMA).unwrap();
    }
    drop(Store::open(dir.path()).unwrap());

    let store = Store::open(dir.path()).unwrap();
    assert_eq!(create_schema(&store.conn).unwrap(), SchemaCreateResult::Current);
}
