//! Migration executable
//!
//! Import runs read -> process -> write -> record map for each source row in
//! source order. Rollback walks the identifier map (optionally restricted by
//! an id list), deletes the destination entity and removes the entry.
//!
//! Per-row process and writer failures are recorded against the row and the
//! run continues. Source errors and identifier-map failures abort the run.

use migrex_core_types::RunId;
use serde::Serialize;
use std::time::Instant;

use crate::destination::{DeleteOutcome, DestinationWriter};
use crate::errors::{ExError, ExErrorKind, ExResult, MigrateError};
use crate::id_map::IdMap;
use crate::migration::Migration;
use crate::model::{DestinationKey, IdList, MessageLevel, RowStatus, SourceKey, SourceRow};
use crate::status::{MigrationStatus, StatusStore};
use crate::{log_op_end, log_op_error, log_op_start};

/// Attempts made to record a mapping after the destination was written
pub const MAP_SAVE_ATTEMPTS: usize = 3;

/// Run options
#[derive(Debug, Clone, Default)]
pub struct ExecutableOptions {
    /// Restrict the run to these source keys
    pub idlist: Option<IdList>,
    /// Stop an import after this many rows were processed
    pub limit: Option<usize>,
    /// Re-process every tracked row on import
    pub update: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOperation {
    Import,
    Rollback,
}

impl RunOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOperation::Import => "import",
            RunOperation::Rollback => "rollback",
        }
    }
}

/// Terminal state of a run that was not aborted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    CompletedWithFailures,
}

/// Counters for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub run_id: RunId,
    pub migration_id: String,
    pub operation: RunOperation,
    /// Rows that went through processing (import) or were selected (rollback)
    pub processed: usize,
    pub created: usize,
    pub updated: usize,
    /// Unchanged rows left alone by import
    pub skipped: usize,
    pub ignored: usize,
    pub failed: usize,
    pub rolled_back: usize,
}

impl RunSummary {
    fn new(migration_id: &str, operation: RunOperation) -> Self {
        Self {
            run_id: RunId::new(),
            migration_id: migration_id.to_string(),
            operation,
            processed: 0,
            created: 0,
            updated: 0,
            skipped: 0,
            ignored: 0,
            failed: 0,
            rolled_back: 0,
        }
    }

    pub fn outcome(&self) -> RunOutcome {
        if self.failed > 0 {
            RunOutcome::CompletedWithFailures
        } else {
            RunOutcome::Completed
        }
    }
}

/// Holds a migration in a busy status and returns it to idle on drop
struct RunGuard<'s> {
    status: &'s dyn StatusStore,
    migration_id: String,
}

impl<'s> RunGuard<'s> {
    fn begin(status: &'s dyn StatusStore, migration_id: &str, next: MigrationStatus) -> ExResult<Self> {
        status.try_begin(migration_id, next)?;
        Ok(Self {
            status,
            migration_id: migration_id.to_string(),
        })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.status.finish(&self.migration_id) {
            tracing::error!(
                migration_id = %self.migration_id,
                err.code = err.code(),
                "failed to return migration to idle: {}",
                err
            );
        }
    }
}

/// Drives one migration against its collaborators
pub struct MigrateExecutable<'a> {
    migration: &'a Migration,
    destination: &'a mut dyn DestinationWriter,
    id_map: &'a mut dyn IdMap,
    status: &'a dyn StatusStore,
    options: ExecutableOptions,
}

impl<'a> MigrateExecutable<'a> {
    pub fn new(
        migration: &'a Migration,
        destination: &'a mut dyn DestinationWriter,
        id_map: &'a mut dyn IdMap,
        status: &'a dyn StatusStore,
        options: ExecutableOptions,
    ) -> Self {
        Self {
            migration,
            destination,
            id_map,
            status,
            options,
        }
    }

    pub fn options(&self) -> &ExecutableOptions {
        &self.options
    }

    /// Import every selected source row
    ///
    /// # Errors
    ///
    /// Returns `MigrationBusy` if another run owns the migration, and aborts
    /// with `Source` or identifier-map errors. Per-row failures are counted
    /// in the summary instead.
    pub fn import(&mut self) -> ExResult<RunSummary> {
        let mut summary = RunSummary::new(self.migration.id(), RunOperation::Import);
        let result = self.traced(&mut summary, Self::run_import);
        result.map(|()| summary)
    }

    /// Roll back tracked rows, restricted to the id list when one is set
    ///
    /// # Errors
    ///
    /// Returns `MigrationBusy` if another run owns the migration, and aborts
    /// on identifier-map errors. Destination delete failures are counted in
    /// the summary and leave the entry in place for a retry.
    pub fn rollback(&mut self) -> ExResult<RunSummary> {
        let mut summary = RunSummary::new(self.migration.id(), RunOperation::Rollback);
        let result = self.traced(&mut summary, Self::run_rollback);
        result.map(|()| summary)
    }

    fn traced(
        &mut self,
        summary: &mut RunSummary,
        run: fn(&mut Self, &mut RunSummary) -> ExResult<()>,
    ) -> ExResult<()> {
        let op = summary.operation.as_str();
        let start = Instant::now();
        log_op_start!(
            op,
            migration_id = summary.migration_id.as_str(),
            run_id = summary.run_id.as_str()
        );

        let result = run(self, summary);
        let duration_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(()) => {
                log_op_end!(
                    op,
                    duration_ms = duration_ms,
                    migration_id = summary.migration_id.as_str(),
                    run_id = summary.run_id.as_str(),
                    processed = summary.processed,
                    failed = summary.failed,
                    rolled_back = summary.rolled_back
                );
            }
            Err(err) => {
                log_op_error!(
                    op,
                    err.clone(),
                    duration_ms = duration_ms,
                    migration_id = summary.migration_id.as_str(),
                    run_id = summary.run_id.as_str()
                );
            }
        }
        result
    }

    fn run_import(&mut self, summary: &mut RunSummary) -> ExResult<()> {
        let migration = self.migration;
        let _guard = RunGuard::begin(self.status, migration.id(), MigrationStatus::Importing)?;

        if self.options.update {
            let marked = self.id_map.prepare_update()?;
            tracing::debug!(migration_id = migration.id(), marked, "rows marked for update");
        }

        for row in migration.source().rows() {
            let row = row.map_err(|e| ExError::from(e).with_migration_id(migration.id()))?;
            if let Some(idlist) = &self.options.idlist {
                if !idlist.contains(row.key()) {
                    continue;
                }
            }
            if self
                .options
                .limit
                .is_some_and(|limit| summary.processed >= limit)
            {
                break;
            }
            self.import_row(&row, summary)?;
        }
        Ok(())
    }

    fn import_row(&mut self, row: &SourceRow, summary: &mut RunSummary) -> ExResult<()> {
        let key = row.key();
        let hash = row.hash();
        let existing = self.id_map.get_by_source(key)?;

        if existing.as_ref().is_some_and(|entry| entry.is_current(&hash)) {
            summary.skipped += 1;
            tracing::debug!(
                migration_id = self.migration.id(),
                source_key = %key,
                "unchanged row skipped"
            );
            return Ok(());
        }

        summary.processed += 1;
        self.id_map.clear_messages(key)?;
        // A key left by an interrupted rollback is reused: update finds the
        // entity if the delete never happened and recreates it otherwise.
        let prior = existing.and_then(|entry| entry.dest_key);

        let record = match self.migration.pipeline().process(row) {
            Ok(record) => record,
            Err(MigrateError::SkipRow { field, reason }) => {
                self.id_map
                    .save_mapping(key, prior.as_ref(), &hash, RowStatus::Ignored)?;
                self.id_map.save_message(
                    key,
                    MessageLevel::Notice,
                    &format!("skipped at '{}': {}", field, reason),
                )?;
                summary.ignored += 1;
                tracing::debug!(migration_id = self.migration.id(), source_key = %key, "row ignored");
                return Ok(());
            }
            Err(err) => {
                return self.record_failure(key, prior.as_ref(), &hash, err.into(), summary);
            }
        };

        let written = match &prior {
            Some(dest_key) => match self.destination.update(dest_key, &record) {
                Ok(()) => Ok((dest_key.clone(), false)),
                // Entity removed behind our back: write it again.
                Err(err) if err.kind() == ExErrorKind::NotFound => {
                    self.destination.create(&record).map(|key| (key, true))
                }
                Err(err) => Err(err),
            },
            None => self.destination.create(&record).map(|key| (key, true)),
        };

        match written {
            Ok((dest_key, created)) => {
                if let Err(err) = self.save_imported(key, &dest_key, &hash) {
                    if created {
                        self.undo_create(key, &dest_key);
                    }
                    return Err(err);
                }
                if created {
                    summary.created += 1;
                } else {
                    summary.updated += 1;
                }
                tracing::debug!(
                    migration_id = self.migration.id(),
                    source_key = %key,
                    dest_key = %dest_key,
                    created,
                    "row imported"
                );
                Ok(())
            }
            Err(err) => self.record_failure(key, prior.as_ref(), &hash, err, summary),
        }
    }

    /// Record the mapping for a row whose destination write succeeded
    ///
    /// Retried up to `MAP_SAVE_ATTEMPTS` times. A persistent failure keeps
    /// the kind of the last error and names both keys.
    fn save_imported(&mut self, key: &SourceKey, dest_key: &DestinationKey, hash: &str) -> ExResult<()> {
        let mut attempt = 1;
        loop {
            let err = match self
                .id_map
                .save_mapping(key, Some(dest_key), hash, RowStatus::Imported)
            {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            if err.kind() == ExErrorKind::MapConsistency || attempt >= MAP_SAVE_ATTEMPTS {
                return Err(ExError::new(err.kind())
                    .with_op("save_mapping")
                    .with_migration_id(self.migration.id())
                    .with_source_key(key.to_string())
                    .with_dest_key(dest_key.to_string())
                    .with_message(format!(
                        "mapping not saved after {} attempt(s)",
                        attempt
                    ))
                    .with_source(err));
            }
            tracing::warn!(
                migration_id = self.migration.id(),
                source_key = %key,
                attempt,
                "saving mapping failed: {}",
                err
            );
            attempt += 1;
        }
    }

    /// Remove an entity created for a row whose mapping could not be saved
    fn undo_create(&mut self, key: &SourceKey, dest_key: &DestinationKey) {
        match self.destination.delete(dest_key) {
            Ok(_) => tracing::warn!(
                migration_id = self.migration.id(),
                source_key = %key,
                dest_key = %dest_key,
                "unmapped entity removed"
            ),
            Err(err) => tracing::error!(
                migration_id = self.migration.id(),
                source_key = %key,
                dest_key = %dest_key,
                err.code = err.code(),
                "unmapped entity left in destination: {}",
                err
            ),
        }
    }

    fn record_failure(
        &mut self,
        key: &SourceKey,
        prior: Option<&DestinationKey>,
        hash: &str,
        err: ExError,
        summary: &mut RunSummary,
    ) -> ExResult<()> {
        tracing::warn!(
            migration_id = self.migration.id(),
            source_key = %key,
            err.code = err.code(),
            "row failed: {}",
            err
        );
        self.id_map
            .save_mapping(key, prior, hash, RowStatus::Failed)?;
        self.id_map
            .save_message(key, MessageLevel::Error, &err.to_string())?;
        summary.failed += 1;
        Ok(())
    }

    fn run_rollback(&mut self, summary: &mut RunSummary) -> ExResult<()> {
        let migration = self.migration;
        let _guard = RunGuard::begin(self.status, migration.id(), MigrationStatus::RollingBack)?;

        let keys = self.id_map.all_keys(self.options.idlist.as_ref())?;
        for key in keys {
            let Some(entry) = self.id_map.get_by_source(&key)? else {
                continue;
            };
            summary.processed += 1;

            if let Some(dest_key) = &entry.dest_key {
                // Marker survives a crash between delete and map removal.
                self.id_map.save_mapping(
                    &key,
                    Some(dest_key),
                    &entry.source_hash,
                    RowStatus::RolledBack,
                )?;
                match self.destination.delete(dest_key) {
                    Ok(DeleteOutcome::Deleted) => {}
                    Ok(DeleteOutcome::NotFound) => {
                        tracing::warn!(
                            migration_id = migration.id(),
                            source_key = %key,
                            dest_key = %dest_key,
                            "destination already absent"
                        );
                    }
                    Err(err) => {
                        tracing::warn!(
                            migration_id = migration.id(),
                            source_key = %key,
                            err.code = err.code(),
                            "rollback of row failed: {}",
                            err
                        );
                        self.id_map
                            .save_message(&key, MessageLevel::Error, &err.to_string())?;
                        summary.failed += 1;
                        continue;
                    }
                }
            }

            self.id_map.delete(&key)?;
            summary.rolled_back += 1;
            tracing::debug!(migration_id = migration.id(), source_key = %key, "row rolled back");
        }
        Ok(())
    }
}
