//! SQLite identifier map
//!
//! Rows of the `id_map` table are partitioned by migration id. Keys are
//! stored in their canonical JSON-array form; map order is insertion order
//! (rowid), which an upsert preserves.

use chrono::{DateTime, Utc};
use migrex_core::errors::{ExError, ExErrorKind};
use migrex_core::id_map::IdMap;
use migrex_core::model::{
    DestinationKey, IdList, MapCounts, MapEntry, MessageLevel, RowMessage, RowStatus, SourceKey,
};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::errors::{corrupt_row, from_rusqlite, Result};

const ENTRY_COLUMNS: &str = "source_key, dest_key, source_hash, status, last_imported";

/// Identifier map for one migration, backed by SQLite
pub struct SqliteIdMap<'c> {
    conn: &'c Connection,
    migration_id: String,
}

/// Raw column values of one `id_map` row
struct StoredEntry {
    source_key: String,
    dest_key: Option<String>,
    source_hash: String,
    status: i64,
    last_imported: i64,
}

impl StoredEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            source_key: row.get(0)?,
            dest_key: row.get(1)?,
            source_hash: row.get(2)?,
            status: row.get(3)?,
            last_imported: row.get(4)?,
        })
    }

    fn decode(self) -> Result<MapEntry> {
        let status = RowStatus::from_code(self.status)
            .ok_or_else(|| corrupt_row("id_map", format!("unknown status {}", self.status)))?;
        let source_key = SourceKey::from_storage(&self.source_key)
            .map_err(|e| corrupt_row("id_map", e))?;
        let dest_key = self
            .dest_key
            .as_deref()
            .map(DestinationKey::from_storage)
            .transpose()
            .map_err(|e| corrupt_row("id_map", e))?;
        let last_imported = DateTime::from_timestamp_millis(self.last_imported)
            .ok_or_else(|| corrupt_row("id_map", "timestamp out of range"))?;

        Ok(MapEntry {
            source_key,
            dest_key,
            source_hash: self.source_hash,
            status,
            last_imported,
        })
    }
}

impl<'c> SqliteIdMap<'c> {
    pub fn new(conn: &'c Connection, migration_id: impl Into<String>) -> Self {
        Self {
            conn,
            migration_id: migration_id.into(),
        }
    }

    /// Migration ids with at least one tracked row
    pub fn tracked_migrations(conn: &Connection) -> Result<Vec<String>> {
        let mut stmt = conn
            .prepare("SELECT DISTINCT migration_id FROM id_map ORDER BY migration_id")
            .map_err(from_rusqlite)?;
        let ids = stmt
            .query_map([], |row| row.get(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(from_rusqlite)?;
        Ok(ids)
    }

    fn entries(&self) -> Result<Vec<MapEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "SELECT {} FROM id_map WHERE migration_id = ?1 ORDER BY rowid",
                ENTRY_COLUMNS
            ))
            .map_err(from_rusqlite)?;
        let stored = stmt
            .query_map([&self.migration_id], StoredEntry::from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        stored.into_iter().map(StoredEntry::decode).collect()
    }

    fn duplicate_destination(&self, dest_key: &DestinationKey, source_key: &SourceKey) -> ExError {
        ExError::new(ExErrorKind::MapConsistency)
            .with_op("save_mapping")
            .with_migration_id(self.migration_id.clone())
            .with_source_key(source_key.to_string())
            .with_dest_key(dest_key.to_string())
            .with_message("destination already mapped from another source key")
    }
}

impl IdMap for SqliteIdMap<'_> {
    fn migration_id(&self) -> &str {
        &self.migration_id
    }

    fn get_by_source(&self, key: &SourceKey) -> Result<Option<MapEntry>> {
        let stored = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM id_map WHERE migration_id = ?1 AND source_key = ?2",
                    ENTRY_COLUMNS
                ),
                rusqlite::params![self.migration_id, key.to_storage()],
                StoredEntry::from_row,
            )
            .optional()
            .map_err(from_rusqlite)?;
        stored.map(StoredEntry::decode).transpose()
    }

    fn get_by_destination(&self, key: &DestinationKey) -> Result<Option<MapEntry>> {
        let stored = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM id_map WHERE migration_id = ?1 AND dest_key = ?2",
                    ENTRY_COLUMNS
                ),
                rusqlite::params![self.migration_id, key.to_storage()],
                StoredEntry::from_row,
            )
            .optional()
            .map_err(from_rusqlite)?;
        stored.map(StoredEntry::decode).transpose()
    }

    fn save_mapping(
        &mut self,
        source_key: &SourceKey,
        dest_key: Option<&DestinationKey>,
        source_hash: &str,
        status: RowStatus,
    ) -> Result<()> {
        let source_text = source_key.to_storage();
        let dest_text = dest_key.map(DestinationKey::to_storage);

        if let (Some(dest_key), Some(dest_text)) = (dest_key, &dest_text) {
            let owner: Option<String> = self
                .conn
                .query_row(
                    "SELECT source_key FROM id_map
                     WHERE migration_id = ?1 AND dest_key = ?2 AND source_key != ?3",
                    rusqlite::params![self.migration_id, dest_text, source_text],
                    |row| row.get(0),
                )
                .optional()
                .map_err(from_rusqlite)?;
            if owner.is_some() {
                return Err(self.duplicate_destination(dest_key, source_key));
            }
        }

        self.conn
            .execute(
                "INSERT INTO id_map (migration_id, source_key, dest_key, source_hash, status, last_imported)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(migration_id, source_key) DO UPDATE SET
                    dest_key = excluded.dest_key,
                    source_hash = excluded.source_hash,
                    status = excluded.status,
                    last_imported = excluded.last_imported",
                rusqlite::params![
                    self.migration_id,
                    source_text,
                    dest_text,
                    source_hash,
                    status.code(),
                    Utc::now().timestamp_millis(),
                ],
            )
            .map_err(from_rusqlite)?;

        Ok(())
    }

    fn delete(&mut self, key: &SourceKey) -> Result<()> {
        let tx = self.conn.unchecked_transaction().map_err(from_rusqlite)?;
        let source_text = key.to_storage();
        tx.execute(
            "DELETE FROM id_map WHERE migration_id = ?1 AND source_key = ?2",
            rusqlite::params![self.migration_id, source_text],
        )
        .map_err(from_rusqlite)?;
        tx.execute(
            "DELETE FROM id_map_messages WHERE migration_id = ?1 AND source_key = ?2",
            rusqlite::params![self.migration_id, source_text],
        )
        .map_err(from_rusqlite)?;
        tx.commit().map_err(from_rusqlite)?;
        Ok(())
    }

    fn all_keys(&self, filter: Option<&IdList>) -> Result<Vec<SourceKey>> {
        Ok(self
            .entries()?
            .into_iter()
            .map(|entry| entry.source_key)
            .filter(|key| filter.map_or(true, |list| list.contains(key)))
            .collect())
    }

    fn prepare_update(&mut self) -> Result<usize> {
        self.conn
            .execute(
                "UPDATE id_map SET status = ?1 WHERE migration_id = ?2",
                rusqlite::params![RowStatus::NeedsUpdate.code(), self.migration_id],
            )
            .map_err(from_rusqlite)
    }

    fn save_message(&mut self, key: &SourceKey, level: MessageLevel, message: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO id_map_messages (migration_id, source_key, level, message)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![self.migration_id, key.to_storage(), level.as_str(), message],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    fn clear_messages(&mut self, key: &SourceKey) -> Result<()> {
        self.conn
            .execute(
                "DELETE FROM id_map_messages WHERE migration_id = ?1 AND source_key = ?2",
                rusqlite::params![self.migration_id, key.to_storage()],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    fn messages(&self, key: Option<&SourceKey>) -> Result<Vec<RowMessage>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT source_key, level, message FROM id_map_messages
                 WHERE migration_id = ?1 AND (?2 IS NULL OR source_key = ?2)
                 ORDER BY id",
            )
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(
                rusqlite::params![self.migration_id, key.map(SourceKey::to_storage)],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        rows.into_iter()
            .map(|(source_key, level, message)| {
                Ok(RowMessage {
                    source_key: SourceKey::from_storage(&source_key)
                        .map_err(|e| corrupt_row("id_map_messages", e))?,
                    level: MessageLevel::parse(&level).ok_or_else(|| {
                        corrupt_row("id_map_messages", format!("unknown level '{}'", level))
                    })?,
                    message,
                })
            })
            .collect()
    }

    fn counts(&self) -> Result<MapCounts> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM id_map WHERE migration_id = ?1 GROUP BY status")
            .map_err(from_rusqlite)?;
        let rows = stmt
            .query_map([&self.migration_id], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;

        let mut counts = MapCounts::default();
        for (code, n) in rows {
            let status = RowStatus::from_code(code)
                .ok_or_else(|| corrupt_row("id_map", format!("unknown status {}", code)))?;
            let n = usize::try_from(n)
                .map_err(|_| corrupt_row("id_map", format!("negative count {}", n)))?;
            counts.add(status, n);
        }
        Ok(counts)
    }
}
