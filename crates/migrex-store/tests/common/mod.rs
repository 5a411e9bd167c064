#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use migrex_core::model::MigrationDefinition;
use migrex_store::db;
use rusqlite::Connection;
use std::path::PathBuf;

pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

pub fn fixture_definition(name: &str) -> MigrationDefinition {
    migrex_store::parse_definition_file(&fixtures_dir().join(name))
        .expect("fixture definition should parse")
}

/// Migrated in-memory database
pub fn memory_store() -> Connection {
    let conn = db::open_in_memory().unwrap();
    db::configure(&conn).unwrap();
    let mut conn = conn;
    migrex_store::migrations::apply_migrations(&mut conn).unwrap();
    conn
}
