// Integration tests for the schema migration framework

use migrex_core::errors::ExErrorKind;
use rusqlite::Connection;

fn setup_test_db() -> Connection {
    Connection::open_in_memory().expect("Failed to create in-memory database")
}

fn get_table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn test_apply_migrations_on_empty_db() {
    // Given: An empty SQLite database
    let mut conn = setup_test_db();

    // When: Migrations are applied
    let result = migrex_store::migrations::apply_migrations(&mut conn);

    // Then: All migrations succeed
    assert!(
        result.is_ok(),
        "Migrations should succeed: {:?}",
        result.err()
    );

    // And: Every expected table exists
    let tables = get_table_names(&conn);
    for expected_table in [
        "schema_version",
        "id_map",
        "id_map_messages",
        "migration_status",
        "entities",
        "entity_sequences",
        "sqlite_sequence", // Auto-created by SQLite for AUTOINCREMENT columns
    ] {
        assert!(
            tables.contains(&expected_table.to_string()),
            "Missing table: {}",
            expected_table
        );
    }
}

#[test]
fn test_migration_idempotency() {
    // Given: A database with migrations already applied
    let mut conn = setup_test_db();
    migrex_store::migrations::apply_migrations(&mut conn).unwrap();

    // When: Migrations are applied again
    migrex_store::migrations::apply_migrations(&mut conn).unwrap();

    // Then: Each migration is recorded once
    let version_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(version_count, 3);
}

#[test]
fn test_tampered_checksum_is_rejected() {
    // Given: A migrated database whose recorded checksum was altered
    let mut conn = setup_test_db();
    migrex_store::migrations::apply_migrations(&mut conn).unwrap();
    conn.execute(
        "UPDATE schema_version SET checksum = 'deadbeef' WHERE migration_id = '001_id_map'",
        [],
    )
    .unwrap();

    // When: Migrations are applied again
    let err = migrex_store::migrations::apply_migrations(&mut conn).unwrap_err();

    // Then: The mismatch is reported
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);
    assert!(err.message().contains("001_id_map"));
}

#[test]
fn test_reverse_index_is_unique_per_migration() {
    let mut conn = setup_test_db();
    migrex_store::migrations::apply_migrations(&mut conn).unwrap();

    let insert = "INSERT INTO id_map (migration_id, source_key, dest_key, source_hash, status, last_imported)
                  VALUES (?1, ?2, ?3, 'h', 0, 0)";
    conn.execute(insert, ["m", "[1]", "[10]"]).unwrap();
    conn.execute(insert, ["other", "[1]", "[10]"]).unwrap();

    assert!(conn.execute(insert, ["m", "[2]", "[10]"]).is_err());
}
