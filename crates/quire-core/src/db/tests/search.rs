use super::{save, store};
use crate::db::Store;
use tempfile::tempdir;

fn ids(notes: Vec<crate::db::Note>) -> Vec<String> {
    let mut ids: Vec<_> = notes.into_iter().map(|n| n.id).collect();
    ids.sort();
    ids
}

#[test]
fn test_blank_query_returns_nothing_without_index() {
    let store = store();
    save(&store, "a", "anything");
    store.conn.execute_batch("DROP TABLE notes_fts").unwrap();

    assert!(store.search_notes(None, 10).unwrap().is_empty());
    assert!(store.search_notes(Some(""), 10).unwrap().is_empty());
    assert!(store.search_notes(Some("   \t"), 10).unwrap().is_empty());
    assert!(store.search_snippets(Some(" "), 10).unwrap().is_empty());
}

#[test]
fn test_search_matches_terms_and_prefixes() {
    let store = store();
    save(&store, "a", "# Garden\ntomatoes and basil");
    save(&store, "b", "# Kitchen\nbasil pesto recipe");
    save(&store, "c", "# Garage\nbicycle repair");

    assert_eq!(ids(store.search_notes(Some("basil"), 10).unwrap()), vec!["a", "b"]);
    assert_eq!(ids(store.search_notes(Some("tomat"), 10).unwrap()), vec!["a"]);
    assert_eq!(ids(store.search_notes(Some("basil pesto"), 10).unwrap()), vec!["b"]);
    assert_eq!(ids(store.search_notes(Some("Gara"), 10).unwrap()), vec!["c"]);
    assert!(store.search_notes(Some("submarine"), 10).unwrap().is_empty());
}

#[test]
fn test_search_respects_limit() {
    let store = store();
    for i in 0..5 {
        save(&store, &format!("n{}", i), "shared word");
    }
    assert_eq!(store.search_notes(Some("shared"), 3).unwrap().len(), 3);
}

#[test]
fn test_fts_syntax_in_query_is_literal() {
    let store = store();
    save(&store, "a", "alpha beta");
    assert!(store.search_notes(Some("alpha OR"), 10).unwrap().is_empty());
    assert!(store.search_notes(Some("\"alpha"), 10).unwrap().len() == 1);
    assert!(store.search_notes(Some("NEAR("), 10).is_ok());
}

#[test]
fn test_index_follows_resave_and_delete() {
    let store = store();
    save(&store, "a", "original wording");
    assert_eq!(store.search_notes(Some("original"), 10).unwrap().len(), 1);

    save(&store, "a", "replacement wording");
    assert!(store.search_notes(Some("original"), 10).unwrap().is_empty());
    assert_eq!(store.search_notes(Some("replacement"), 10).unwrap().len(), 1);
    assert_eq!(store.index_entry_count().unwrap(), 1);

    store.delete_note("a").unwrap();
    assert!(store.search_notes(Some("replacement"), 10).unwrap().is_empty());
    assert_eq!(store.index_entry_count().unwrap(), 0);
}

#[test]
fn test_search_snippets_highlight_match() {
    let store = store();
    save(&store, "a", "# Trip\nwe walked along the harbour at dawn");

    let hits = store.search_snippets(Some("harbour"), 10).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0.id, "a");
    assert!(hits[0].1.contains("[harbour]"));
}

#[test]
fn test_rebuild_fts_index_restores_results() {
    let store = store();
    save(&store, "a", "lighthouse keeper");
    save(&store, "b", "lighthouse lamp");
    save(&store, "c", "unrelated");
    let before = ids(store.search_notes(Some("lighthouse"), 10).unwrap());

    store
        .conn
        .execute_batch(
            "DELETE FROM notes_fts;
             INSERT INTO notes_fts (note_id, title, plain_text) VALUES ('ghost', 'g', 'lighthouse');",
        )
        .unwrap();
    assert!(store.search_notes(Some("lighthouse"), 10).unwrap().is_empty());

    assert_eq!(store.rebuild_fts_index().unwrap(), 3);
    assert_eq!(ids(store.search_notes(Some("lighthouse"), 10).unwrap()), before);
    assert_eq!(store.index_entry_count().unwrap(), 3);
}

#[test]
fn test_rebuild_index_counts_notes() {
    let store = store();
    save(&store, "a", "x");
    save(&store, "b", "y");
    assert_eq!(store.rebuild_index().unwrap(), 2);
}

#[test]
fn test_reopen_rebuilds_cleared_index() {
    let dir = tempdir().unwrap();
    {
        let store = Store::open(dir.path()).unwrap();
        save(&store, "a", "persistent river");
        save(&store, "b", "persistent lake");
        store.conn.execute("DELETE FROM notes_fts", []).unwrap();
    }

    let store = Store::open(dir.path()).unwrap();
    assert_eq!(store.index_entry_count().unwrap(), 2);
    assert_eq!(
        ids(store.search_notes(Some("persistent"), 10).unwrap()),
        vec!["a", "b"]
    );
}
