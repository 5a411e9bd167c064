//! Migration status registry
//!
//! Guards a migration id against overlapping import and rollback runs.
//! Different migration ids never contend.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use crate::errors::{ExError, ExErrorKind, ExResult, MigrateError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MigrationStatus {
    Idle,
    Importing,
    RollingBack,
}

impl MigrationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MigrationStatus::Idle => "idle",
            MigrationStatus::Importing => "importing",
            MigrationStatus::RollingBack => "rolling_back",
        }
    }

    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "idle" => Some(MigrationStatus::Idle),
            "importing" => Some(MigrationStatus::Importing),
            "rolling_back" => Some(MigrationStatus::RollingBack),
            _ => None,
        }
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait StatusStore {
    /// Current status; unknown migrations are `Idle`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn status(&self, migration_id: &str) -> ExResult<MigrationStatus>;

    /// Atomically move an `Idle` migration to `next`
    ///
    /// # Errors
    ///
    /// Returns `MigrationBusy` if the migration is not `Idle`.
    fn try_begin(&self, migration_id: &str, next: MigrationStatus) -> ExResult<()>;

    /// Return the migration to `Idle`
    ///
    /// Also used to reset a migration left busy by a crashed run.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn finish(&self, migration_id: &str) -> ExResult<()>;
}

pub(crate) fn busy(migration_id: &str, status: MigrationStatus) -> ExError {
    MigrateError::MigrationBusy {
        migration_id: migration_id.to_string(),
        status: status.to_string(),
    }
    .into()
}

/// Process-local status registry, shareable across threads
#[derive(Debug, Clone, Default)]
pub struct InMemoryStatusStore {
    statuses: Arc<Mutex<HashMap<String, MigrationStatus>>>,
}

impl InMemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> ExError {
        ExError::new(ExErrorKind::Internal).with_message("status registry lock poisoned")
    }
}

impl StatusStore for InMemoryStatusStore {
    fn status(&self, migration_id: &str) -> ExResult<MigrationStatus> {
        let statuses = self.statuses.lock().map_err(|_| Self::poisoned())?;
        Ok(statuses
            .get(migration_id)
            .copied()
            .unwrap_or(MigrationStatus::Idle))
    }

    fn try_begin(&self, migration_id: &str, next: MigrationStatus) -> ExResult<()> {
        let mut statuses = self.statuses.lock().map_err(|_| Self::poisoned())?;
        let current = statuses
            .entry(migration_id.to_string())
            .or_insert(MigrationStatus::Idle);
        if *current != MigrationStatus::Idle {
            return Err(busy(migration_id, *current));
        }
        *current = next;
        Ok(())
    }

    fn finish(&self, migration_id: &str) -> ExResult<()> {
        let mut statuses = self.statuses.lock().map_err(|_| Self::poisoned())?;
        statuses.insert(migration_id.to_string(), MigrationStatus::Idle);
        Ok(())
    }
}
