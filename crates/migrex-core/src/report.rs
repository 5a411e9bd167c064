//! Per-migration status report

use serde::Serialize;

use crate::errors::{ExError, ExResult};
use crate::id_map::IdMap;
use crate::migration::Migration;
use crate::model::MapCounts;
use crate::status::{MigrationStatus, StatusStore};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MigrationReport {
    pub migration_id: String,
    pub status: String,
    pub source_rows: usize,
    pub counts: MapCounts,
    /// Source rows with no map entry yet
    pub unprocessed: usize,
    pub messages: usize,
}

impl MigrationReport {
    pub fn status(&self) -> Option<MigrationStatus> {
        MigrationStatus::parse(&self.status)
    }
}

/// Summarize the map state of one migration against its source
///
/// # Errors
///
/// Returns `Source` if the source cannot be read, or any store error.
pub fn report(
    migration: &Migration,
    id_map: &dyn IdMap,
    status: &dyn StatusStore,
) -> ExResult<MigrationReport> {
    let source_rows = migration
        .source()
        .count()
        .map_err(|e| ExError::from(e).with_migration_id(migration.id()))?;
    let counts = id_map.counts()?;
    let messages = id_map.messages(None)?.len();

    Ok(MigrationReport {
        migration_id: migration.id().to_string(),
        status: status.status(migration.id())?.to_string(),
        source_rows,
        unprocessed: source_rows.saturating_sub(counts.total()),
        counts,
        messages,
    })
}
