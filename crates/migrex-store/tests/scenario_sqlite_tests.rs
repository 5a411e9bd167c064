// End-to-end runs against a SQLite store

mod common;

use common::{fixture_definition, memory_store};
use migrex_core::id_map::IdMap;
use migrex_core::model::{DestinationKey, IdList, RowStatus, SourceKey};
use migrex_core::status::{MigrationStatus, StatusStore};
use migrex_core::{ExecutableOptions, RunOperation, RunOutcome};
use migrex_store::{execute, status_report, SqliteDestination, SqliteIdMap, SqliteStatusStore};
use serde_json::json;

fn rollback_ids(ids: &[i64]) -> ExecutableOptions {
    ExecutableOptions {
        idlist: Some(IdList::new(ids.iter().map(|id| SourceKey::single(*id)).collect())),
        ..ExecutableOptions::default()
    }
}

#[test]
fn test_scenario_import_then_filtered_rollback() {
    // GIVEN the two vocabularies in a fresh store
    let conn = memory_store();
    let definition = fixture_definition("vocabularies.yaml");

    // WHEN importing
    let summary = execute(
        &conn,
        &definition,
        RunOperation::Import,
        ExecutableOptions::default(),
    )
    .unwrap();

    // THEN two entities exist and the map holds destination keys 1 and 2
    assert_eq!(summary.created, 2);
    let destination = SqliteDestination::from_config(&conn, &definition.destination);
    let id_map = SqliteIdMap::new(&conn, definition.id.as_str());
    assert_eq!(destination.count().unwrap(), 2);
    for id in [1, 2] {
        let entry = id_map.get_by_source(&SourceKey::single(id)).unwrap().unwrap();
        assert_eq!(entry.dest_key, Some(DestinationKey::single(id)));
        assert_eq!(entry.status, RowStatus::Imported);
    }
    let stored = destination.load(&DestinationKey::single(1)).unwrap().unwrap();
    assert_eq!(stored.get("name"), Some(&json!("categories")));
    assert_eq!(stored.get("weight"), Some(&json!(2)));
    let before = id_map.get_by_source(&SourceKey::single(2)).unwrap();

    // WHEN rolling back id 1
    let rollback = execute(&conn, &definition, RunOperation::Rollback, rollback_ids(&[1])).unwrap();

    // THEN only row 1 is gone
    assert_eq!(rollback.rolled_back, 1);
    assert!(destination.load(&DestinationKey::single(1)).unwrap().is_none());
    assert!(id_map.get_by_source(&SourceKey::single(1)).unwrap().is_none());
    assert!(destination.load(&DestinationKey::single(2)).unwrap().is_some());
    assert_eq!(id_map.get_by_source(&SourceKey::single(2)).unwrap(), before);
}

#[test]
fn test_reimport_is_idempotent_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("store.db");
    let definition = fixture_definition("vocabularies.yaml");

    {
        let conn = migrex_store::db::open_store(&path).unwrap();
        execute(&conn, &definition, RunOperation::Import, ExecutableOptions::default()).unwrap();
    }

    // A new connection sees the map left by the first run.
    let conn = migrex_store::db::open_store(&path).unwrap();
    let summary =
        execute(&conn, &definition, RunOperation::Import, ExecutableOptions::default()).unwrap();

    assert_eq!(summary.skipped, 2);
    assert_eq!(summary.created, 0);
    let destination = SqliteDestination::from_config(&conn, &definition.destination);
    assert_eq!(destination.count().unwrap(), 2);
}

#[test]
fn test_full_rollback_empties_store() {
    let conn = memory_store();
    let definition = fixture_definition("vocabularies.yaml");
    execute(&conn, &definition, RunOperation::Import, ExecutableOptions::default()).unwrap();

    let summary =
        execute(&conn, &definition, RunOperation::Rollback, ExecutableOptions::default()).unwrap();

    assert_eq!(summary.rolled_back, 2);
    let report = status_report(&conn, &definition).unwrap();
    assert_eq!(report.counts.total(), 0);
    assert_eq!(report.unprocessed, 2);
    let destination = SqliteDestination::from_config(&conn, &definition.destination);
    assert_eq!(destination.count().unwrap(), 0);
}

#[test]
fn test_json_source_with_composite_keys() {
    let conn = memory_store();
    let definition = fixture_definition("terms.yaml");

    let summary =
        execute(&conn, &definition, RunOperation::Import, ExecutableOptions::default()).unwrap();

    assert_eq!(summary.created, 3);
    assert_eq!(summary.outcome(), RunOutcome::Completed);

    let destination = SqliteDestination::from_config(&conn, &definition.destination);
    let news = destination
        .load(&DestinationKey::single("1-10"))
        .unwrap()
        .unwrap();
    assert_eq!(news.get("name"), Some(&json!("News")));
    assert_eq!(news.get("format"), Some(&json!("basic_html")));

    let events = destination
        .load(&DestinationKey::single("1-11"))
        .unwrap()
        .unwrap();
    assert!(!events.contains("description"));

    let rust = destination
        .load(&DestinationKey::single("2-12"))
        .unwrap()
        .unwrap();
    assert_eq!(rust.get("format"), Some(&json!("plain_text")));

    let id_map = SqliteIdMap::new(&conn, definition.id.as_str());
    let entry = id_map
        .get_by_destination(&DestinationKey::single("1-11"))
        .unwrap()
        .unwrap();
    assert_eq!(entry.source_key.to_string(), "1:11");
}

#[test]
fn test_busy_status_in_store_blocks_run() {
    let conn = memory_store();
    let definition = fixture_definition("vocabularies.yaml");
    SqliteStatusStore::new(&conn)
        .try_begin(&definition.id, MigrationStatus::Importing)
        .unwrap();

    let err = execute(&conn, &definition, RunOperation::Import, ExecutableOptions::default())
        .unwrap_err();

    assert_eq!(err.code(), "ERR_MIGRATION_BUSY");
    let report = status_report(&conn, &definition).unwrap();
    assert_eq!(report.status(), Some(MigrationStatus::Importing));
    assert_eq!(report.counts.total(), 0);
}

#[test]
fn test_status_report_counts() {
    let conn = memory_store();
    let definition = fixture_definition("vocabularies.yaml");
    execute(
        &conn,
        &definition,
        RunOperation::Import,
        ExecutableOptions {
            limit: Some(1),
            ..ExecutableOptions::default()
        },
    )
    .unwrap();

    let report = status_report(&conn, &definition).unwrap();

    assert_eq!(report.source_rows, 2);
    assert_eq!(report.counts.imported, 1);
    assert_eq!(report.unprocessed, 1);
    assert_eq!(report.status(), Some(MigrationStatus::Idle));
}
