//! SQLite migration status registry
//!
//! `try_begin` is a single conditional UPDATE, so two processes sharing one
//! database cannot both claim the same migration id.

use chrono::Utc;
use migrex_core::errors::MigrateError;
use migrex_core::status::{MigrationStatus, StatusStore};
use rusqlite::{Connection, OptionalExtension};

use crate::errors::{corrupt_row, from_rusqlite, Result};

pub struct SqliteStatusStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStatusStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Every migration id with a recorded status
    pub fn all(&self) -> Result<Vec<(String, MigrationStatus)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT migration_id, status FROM migration_status ORDER BY migration_id")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        rows.into_iter()
            .map(|(id, status)| Ok((id, decode_status(&status)?)))
            .collect()
    }
}

fn decode_status(text: &str) -> Result<MigrationStatus> {
    MigrationStatus::parse(text)
        .ok_or_else(|| corrupt_row("migration_status", format!("unknown status '{}'", text)))
}

impl StatusStore for SqliteStatusStore<'_> {
    fn status(&self, migration_id: &str) -> Result<MigrationStatus> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT status FROM migration_status WHERE migration_id = ?1",
                [migration_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        match stored {
            Some(text) => decode_status(&text),
            None => Ok(MigrationStatus::Idle),
        }
    }

    fn try_begin(&self, migration_id: &str, next: MigrationStatus) -> Result<()> {
        let now = Utc::now().timestamp();
        self.conn
            .execute(
                "INSERT INTO migration_status (migration_id, status, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(migration_id) DO NOTHING",
                rusqlite::params![migration_id, MigrationStatus::Idle.as_str(), now],
            )
            .map_err(from_rusqlite)?;

        let claimed = self
            .conn
            .execute(
                "UPDATE migration_status SET status = ?1, updated_at = ?2
                 WHERE migration_id = ?3 AND status = ?4",
                rusqlite::params![
                    next.as_str(),
                    now,
                    migration_id,
                    MigrationStatus::Idle.as_str()
                ],
            )
            .map_err(from_rusqlite)?;

        if claimed == 0 {
            let current = self.status(migration_id)?;
            return Err(MigrateError::MigrationBusy {
                migration_id: migration_id.to_string(),
                status: current.to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn finish(&self, migration_id: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO migration_status (migration_id, status, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(migration_id) DO UPDATE SET
                    status = excluded.status,
                    updated_at = excluded.updated_at",
                rusqlite::params![
                    migration_id,
                    MigrationStatus::Idle.as_str(),
                    Utc::now().timestamp()
                ],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }
}
