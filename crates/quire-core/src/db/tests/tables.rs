use super::{save, store};
use crate::db::tables::{
    DatabaseUpdate, FilterOperator, FilterRule, PropertyDef, PropertyType, PropertyValue,
    RowProperties, SortRule, ViewConfig, ViewState, TITLE_PROPERTY,
};
use crate::db::Store;
use crate::error::QuireError;
use std::sync::{Arc, Barrier};
use tempfile::tempdir;

fn titled(title: &str) -> RowProperties {
    let mut values = RowProperties::new();
    values.insert(TITLE_PROPERTY.into(), PropertyValue::Text(title.into()));
    values
}

fn with_properties(store: &Store, db_id: &str, extra: Vec<PropertyDef>) {
    let mut config = vec![PropertyDef::title()];
    config.extend(extra);
    store
        .update_database(
            db_id,
            DatabaseUpdate {
                properties_config: Some(config),
                ..Default::default()
            },
        )
        .unwrap();
}

fn is_constraint(err: QuireError) -> bool {
    matches!(err, QuireError::ConstraintViolation(_))
}

#[test]
fn test_new_database_has_only_title_property() {
    let store = store();
    let db = store.create_database("Tasks", None).unwrap();

    assert_eq!(db.title, "Tasks");
    assert_eq!(db.properties_config, vec![PropertyDef::title()]);
    assert_eq!(db.note_id, None);
    assert!(store.get_database_rows(&db.id).unwrap().is_empty());
    assert_eq!(store.list_databases().unwrap().len(), 1);
}

#[test]
fn test_rows_append_in_order_after_deletes() {
    let store = store();
    let db = store.create_database("Tasks", None).unwrap();

    let rows: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|t| store.create_database_row(&db.id, titled(t)).unwrap())
        .collect();
    let indexes: Vec<_> = rows.iter().map(|r| r.order_index).collect();
    assert_eq!(indexes, vec![0, 1, 2]);

    store.delete_database_row(&rows[1].id).unwrap();
    let next = store.create_database_row(&db.id, titled("d")).unwrap();
    assert_eq!(next.order_index, 3);

    store.delete_database_row(&next.id).unwrap();
    store.delete_database_row(&rows[2].id).unwrap();
    let after = store.create_database_row(&db.id, titled("e")).unwrap();
    assert_eq!(after.order_index, 1);
}

#[test]
fn test_concurrent_appends_get_distinct_indexes() {
    let dir = tempdir().unwrap();
    let db_id = Store::open(dir.path())
        .unwrap()
        .create_database("Shared", None)
        .unwrap()
        .id;

    const THREADS: usize = 4;
    const PER_THREAD: usize = 5;
    let barrier = Arc::new(Barrier::new(THREADS));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let path = dir.path().to_path_buf();
            let db_id = db_id.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let store = Store::open(&path).unwrap();
                barrier.wait();
                for i in 0..PER_THREAD {
                    store
                        .create_database_row(&db_id, titled(&format!("{}-{}", t, i)))
                        .unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let store = Store::open(dir.path()).unwrap();
    let indexes: Vec<_> = store
        .get_database_rows(&db_id)
        .unwrap()
        .into_iter()
        .map(|r| r.order_index)
        .collect();
    let expected: Vec<i64> = (0..(THREADS * PER_THREAD) as i64).collect();
    assert_eq!(indexes, expected);
}

#[test]
fn test_row_values_are_validated() {
    let store = store();
    let db = store.create_database("Tasks", None).unwrap();
    with_properties(
        &store,
        &db.id,
        vec![
            PropertyDef::new("estimate", "Estimate", PropertyType::Number),
            PropertyDef::new("status", "Status", PropertyType::Select).with_options(&["Todo", "Done"]),
        ],
    );

    let mut wrong_type = titled("x");
    wrong_type.insert("estimate".into(), PropertyValue::Text("lots".into()));
    assert!(is_constraint(store.create_database_row(&db.id, wrong_type).unwrap_err()));

    let mut unknown = titled("x");
    unknown.insert("colour".into(), PropertyValue::Text("red".into()));
    assert!(is_constraint(store.create_database_row(&db.id, unknown).unwrap_err()));

    let mut bad_option = titled("x");
    bad_option.insert("status".into(), PropertyValue::Select("Blocked".into()));
    assert!(is_constraint(store.create_database_row(&db.id, bad_option).unwrap_err()));

    assert!(store.get_database_rows(&db.id).unwrap().is_empty());
}

#[test]
fn test_update_row_merges_values() {
    let store = store();
    let db = store.create_database("Tasks", None).unwrap();
    with_properties(
        &store,
        &db.id,
        vec![PropertyDef::new("done", "Done", PropertyType::Checkbox)],
    );
    let row = store.create_database_row(&db.id, titled("write tests")).unwrap();

    let mut patch = RowProperties::new();
    patch.insert("done".into(), PropertyValue::Checkbox(true));
    let updated = store.update_database_row(&row.id, patch).unwrap();

    assert_eq!(updated.value(TITLE_PROPERTY), Some(&PropertyValue::Text("write tests".into())));
    assert_eq!(updated.value("done"), Some(&PropertyValue::Checkbox(true)));
    assert!(updated.updated_at > row.updated_at);
    assert_eq!(store.get_database_row(&row.id).unwrap(), updated);

    let mut bad = RowProperties::new();
    bad.insert("done".into(), PropertyValue::Number(1.0));
    assert!(is_constraint(store.update_database_row(&row.id, bad).unwrap_err()));
}

#[test]
fn test_removing_property_drops_values_and_view_references() {
    let store = store();
    let db = store.create_database("Tasks", None).unwrap();
    with_properties(
        &store,
        &db.id,
        vec![PropertyDef::new("estimate", "Estimate", PropertyType::Number)],
    );
    let view = ViewConfig {
        selected_view: Some("main".into()),
        views: vec![ViewState {
            id: "main".into(),
            name: "Main".into(),
            filters: vec![FilterRule {
                property: "estimate".into(),
                operator: FilterOperator::IsNotEmpty,
                value: None,
            }],
            sorts: vec![SortRule {
                property: "estimate".into(),
                direction: Default::default(),
            }],
            ..Default::default()
        }],
    };
    store
        .update_database(
            &db.id,
            DatabaseUpdate {
                view_config: Some(view),
                ..Default::default()
            },
        )
        .unwrap();
    let mut values = titled("a");
    values.insert("estimate".into(), PropertyValue::Number(3.0));
    let row = store.create_database_row(&db.id, values).unwrap();

    with_properties(&store, &db.id, vec![]);

    let db = store.get_database(&db.id).unwrap();
    assert!(db.property("estimate").is_none());
    let main = db.view_config.selected().unwrap();
    assert!(main.filters.is_empty());
    assert!(main.sorts.is_empty());

    let stored: String = store
        .conn
        .query_row(
            "SELECT properties FROM database_rows WHERE id = ?1",
            [&row.id],
            |r| r.get(0),
        )
        .unwrap();
    assert!(!stored.contains("estimate"));
    assert_eq!(store.get_database_row(&row.id).unwrap().properties.len(), 1);
}

#[test]
fn test_title_property_is_protected() {
    let store = store();
    let db = store.create_database("Tasks", None).unwrap();

    let removed = DatabaseUpdate {
        properties_config: Some(vec![PropertyDef::new("other", "Other", PropertyType::Text)]),
        ..Default::default()
    };
    assert!(is_constraint(store.update_database(&db.id, removed).unwrap_err()));

    let retyped = DatabaseUpdate {
        properties_config: Some(vec![PropertyDef::new(TITLE_PROPERTY, "Name", PropertyType::Date)]),
        ..Default::default()
    };
    assert!(is_constraint(store.update_database(&db.id, retyped).unwrap_err()));

    assert_eq!(
        store.get_database(&db.id).unwrap().properties_config,
        vec![PropertyDef::title()]
    );
}

#[test]
fn test_retyped_property_coerces_stored_values() {
    let store = store();
    let db = store.create_database("Tasks", None).unwrap();
    with_properties(
        &store,
        &db.id,
        vec![PropertyDef::new("points", "Points", PropertyType::Text)],
    );
    let mut numeric = titled("a");
    numeric.insert("points".into(), PropertyValue::Text("8".into()));
    let numeric = store.create_database_row(&db.id, numeric).unwrap();
    let mut wordy = titled("b");
    wordy.insert("points".into(), PropertyValue::Text("several".into()));
    let wordy = store.create_database_row(&db.id, wordy).unwrap();

    with_properties(
        &store,
        &db.id,
        vec![PropertyDef::new("points", "Points", PropertyType::Number)],
    );

    assert_eq!(
        store.get_database_row(&numeric.id).unwrap().value("points"),
        Some(&PropertyValue::Number(8.0))
    );
    assert_eq!(store.get_database_row(&wordy.id).unwrap().value("points"), None);
}

#[test]
fn test_update_database_title_only() {
    let store = store();
    let db = store.create_database("Draft", None).unwrap();
    let updated = store
        .update_database(
            &db.id,
            DatabaseUpdate {
                title: Some("Final".into()),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.title, "Final");
    assert_eq!(updated.properties_config, db.properties_config);
    assert!(updated.updated_at > db.updated_at);
}

#[test]
fn test_duplicate_copies_rows_under_new_ids() {
    let store = store();
    save(&store, "owner", "page");
    let db = store.create_database("Tasks", Some("owner")).unwrap();
    let originals: Vec<_> = ["a", "b"]
        .iter()
        .map(|t| store.create_database_row(&db.id, titled(t)).unwrap())
        .collect();

    let copy = store.duplicate_database(&db.id).unwrap();
    assert_ne!(copy.id, db.id);
    assert_eq!(copy.title, db.title);
    assert_eq!(copy.properties_config, db.properties_config);
    assert_eq!(copy.note_id, None);

    let rows = store.get_database_rows(&copy.id).unwrap();
    assert_eq!(rows.len(), 2);
    for (copied, original) in rows.iter().zip(&originals) {
        assert_ne!(copied.id, original.id);
        assert_eq!(copied.properties, original.properties);
        assert_eq!(copied.order_index, original.order_index);
    }

    store.delete_database(&db.id).unwrap();
    assert_eq!(store.get_database_rows(&copy.id).unwrap().len(), 2);
}

#[test]
fn test_delete_database_cascades_rows() {
    let store = store();
    let db = store.create_database("Tasks", None).unwrap();
    let row = store.create_database_row(&db.id, titled("a")).unwrap();

    store.delete_database(&db.id).unwrap();
    assert!(store.get_database(&db.id).unwrap_err().is_not_found());
    assert!(store.get_database_row(&row.id).unwrap_err().is_not_found());
    assert!(store.delete_database(&db.id).unwrap_err().is_not_found());
}

#[test]
fn test_deleting_owner_note_deletes_its_databases() {
    let store = store();
    save(&store, "owner", "page");
    save(&store, "other", "page");
    let owned = store.create_database("Owned", Some("owner")).unwrap();
    let row = store.create_database_row(&owned.id, titled("a")).unwrap();
    let kept = store.create_database("Kept", Some("other")).unwrap();

    assert_eq!(store.get_note_databases("owner").unwrap().len(), 1);
    store.delete_note("owner").unwrap();

    assert!(store.get_database(&owned.id).unwrap_err().is_not_found());
    assert!(store.get_database_row(&row.id).unwrap_err().is_not_found());
    assert!(store.get_database(&kept.id).is_ok());
}

#[test]
fn test_attach_database() {
    let store = store();
    save(&store, "page", "x");
    let db = store.create_database("Loose", None).unwrap();

    let attached = store.attach_database(&db.id, Some("page")).unwrap();
    assert_eq!(attached.note_id.as_deref(), Some("page"));
    assert_eq!(store.get_note_databases("page").unwrap()[0].id, db.id);

    assert!(store
        .attach_database(&db.id, Some("missing"))
        .unwrap_err()
        .is_not_found());
    assert!(store
        .create_database("Orphan", Some("missing"))
        .unwrap_err()
        .is_not_found());

    let detached = store.attach_database(&db.id, None).unwrap();
    assert_eq!(detached.note_id, None);
}

#[test]
fn test_reorder_rows() {
    let store = store();
    let db = store.create_database("Tasks", None).unwrap();
    let ids: Vec<String> = ["a", "b", "c"]
        .iter()
        .map(|t| store.create_database_row(&db.id, titled(t)).unwrap().id)
        .collect();

    let order = vec![ids[2].clone(), ids[0].clone(), ids[1].clone()];
    let rows = store.reorder_database_rows(&db.id, &order).unwrap();
    let got: Vec<_> = rows.iter().map(|r| (r.id.clone(), r.order_index)).collect();
    assert_eq!(
        got,
        vec![(ids[2].clone(), 0), (ids[0].clone(), 1), (ids[1].clone(), 2)]
    );

    let partial = vec![ids[0].clone(), ids[1].clone()];
    assert!(is_constraint(store.reorder_database_rows(&db.id, &partial).unwrap_err()));
    let repeated = vec![ids[0].clone(), ids[0].clone(), ids[1].clone()];
    assert!(is_constraint(store.reorder_database_rows(&db.id, &repeated).unwrap_err()));
    let foreign = vec![ids[0].clone(), ids[1].clone(), "stranger".to_string()];
    assert!(is_constraint(store.reorder_database_rows(&db.id, &foreign).unwrap_err()));

    let unchanged: Vec<_> = store
        .get_database_rows(&db.id)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();
    assert_eq!(unchanged, order);
}

#[test]
fn test_missing_database_is_not_found() {
    let store = store();
    assert!(store.get_database_rows("nope").unwrap_err().is_not_found());
    assert!(store
        .create_database_row("nope", RowProperties::new())
        .unwrap_err()
        .is_not_found());
    assert!(store.duplicate_database("nope").unwrap_err().is_not_found());
    assert!(store.delete_database_row("nope").unwrap_err().is_not_found());
}
