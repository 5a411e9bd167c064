//! Run orchestration against a SQLite store
//!
//! Builds every collaborator of a run on one connection: the SQLite
//! identifier map partitioned by the migration id, the SQLite destination
//! for the definition's entity kind and the SQLite status registry.

use migrex_core::executable::{ExecutableOptions, MigrateExecutable, RunOperation, RunSummary};
use migrex_core::model::MigrationDefinition;
use migrex_core::report::{report, MigrationReport};
use migrex_core::Migration;
use rusqlite::Connection;

use crate::destination::SqliteDestination;
use crate::errors::Result;
use crate::id_map::SqliteIdMap;
use crate::status::SqliteStatusStore;

/// Run an import or rollback of `definition`
pub fn execute(
    conn: &Connection,
    definition: &MigrationDefinition,
    operation: RunOperation,
    options: ExecutableOptions,
) -> Result<RunSummary> {
    let migration = Migration::from_definition(definition);
    let mut destination = SqliteDestination::from_config(conn, &definition.destination);
    let mut id_map = SqliteIdMap::new(conn, migration.id());
    let status = SqliteStatusStore::new(conn);

    let mut executable =
        MigrateExecutable::new(&migration, &mut destination, &mut id_map, &status, options);
    match operation {
        RunOperation::Import => executable.import(),
        RunOperation::Rollback => executable.rollback(),
    }
}

/// Status report of `definition` against the store
pub fn status_report(conn: &Connection, definition: &MigrationDefinition) -> Result<MigrationReport> {
    let migration = Migration::from_definition(definition);
    let id_map = SqliteIdMap::new(conn, migration.id());
    let status = SqliteStatusStore::new(conn);
    report(&migration, &id_map, &status)
}
