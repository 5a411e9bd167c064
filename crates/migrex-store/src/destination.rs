//! SQLite destination writer
//!
//! Entities are JSON documents in the `entities` table keyed by kind and the
//! canonical form of their destination key.

use chrono::Utc;
use migrex_core::destination::{key_from_record, DeleteOutcome, DestinationWriter};
use migrex_core::errors::{ExError, ExErrorKind};
use migrex_core::model::{DestinationConfig, DestinationKey, DestinationRecord};
use rusqlite::{Connection, OptionalExtension};

use crate::errors::{corrupt_row, from_rusqlite, Result};

/// Destination writer for one entity kind, backed by SQLite
pub struct SqliteDestination<'c> {
    conn: &'c Connection,
    kind: String,
    key_field: Option<String>,
}

impl<'c> SqliteDestination<'c> {
    /// Writer allocating sequential integer keys per kind
    pub fn new(conn: &'c Connection, kind: impl Into<String>) -> Self {
        Self {
            conn,
            kind: kind.into(),
            key_field: None,
        }
    }

    /// Take the destination key from `key_field` of each record
    pub fn with_key_field(mut self, key_field: impl Into<String>) -> Self {
        self.key_field = Some(key_field.into());
        self
    }

    pub fn from_config(conn: &'c Connection, config: &DestinationConfig) -> Self {
        let writer = Self::new(conn, config.kind());
        match &config.key_field {
            Some(field) => writer.with_key_field(field.clone()),
            None => writer,
        }
    }

    /// Stored record under `key`, if any
    pub fn load(&self, key: &DestinationKey) -> Result<Option<DestinationRecord>> {
        let stored: Option<String> = self
            .conn
            .query_row(
                "SELECT record FROM entities WHERE kind = ?1 AND entity_key = ?2",
                rusqlite::params![self.kind, key.to_storage()],
                |row| row.get(0),
            )
            .optional()
            .map_err(from_rusqlite)?;
        stored
            .map(|json| serde_json::from_str(&json).map_err(|e| corrupt_row("entities", e)))
            .transpose()
    }

    /// Number of stored entities of this kind
    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM entities WHERE kind = ?1",
                [&self.kind],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        Ok(usize::try_from(n).unwrap_or_default())
    }

    fn exists(&self, key_text: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM entities WHERE kind = ?1 AND entity_key = ?2",
                rusqlite::params![self.kind, key_text],
                |_| Ok(()),
            )
            .optional()
            .map_err(from_rusqlite)?;
        Ok(found.is_some())
    }

    fn next_key(&self) -> Result<DestinationKey> {
        self.conn
            .execute(
                "INSERT INTO entity_sequences (kind, next_id) VALUES (?1, 1)
                 ON CONFLICT(kind) DO NOTHING",
                [&self.kind],
            )
            .map_err(from_rusqlite)?;
        let next: i64 = self
            .conn
            .query_row(
                "SELECT next_id FROM entity_sequences WHERE kind = ?1",
                [&self.kind],
                |row| row.get(0),
            )
            .map_err(from_rusqlite)?;
        self.conn
            .execute(
                "UPDATE entity_sequences SET next_id = next_id + 1 WHERE kind = ?1",
                [&self.kind],
            )
            .map_err(from_rusqlite)?;
        Ok(DestinationKey::single(next))
    }

    fn error(&self, kind: ExErrorKind, op: &str, key: &DestinationKey, message: &str) -> ExError {
        ExError::new(kind)
            .with_op(op.to_string())
            .with_dest_key(key.to_string())
            .with_message(format!("{} {}", self.kind, message))
    }
}

impl DestinationWriter for SqliteDestination<'_> {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn create(&mut self, record: &DestinationRecord) -> Result<DestinationKey> {
        let tx = self.conn.unchecked_transaction().map_err(from_rusqlite)?;

        let key = match &self.key_field {
            Some(field) => key_from_record(&self.kind, field, record)?,
            None => self.next_key()?,
        };
        let key_text = key.to_storage();
        if self.exists(&key_text)? {
            return Err(self.error(
                ExErrorKind::AlreadyExists,
                "destination_create",
                &key,
                "already exists",
            ));
        }

        let json = serde_json::to_string(record).map_err(|e| corrupt_row("entities", e))?;
        let now = Utc::now().timestamp();
        tx.execute(
            "INSERT INTO entities (kind, entity_key, record, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            rusqlite::params![self.kind, key_text, json, now],
        )
        .map_err(from_rusqlite)?;
        tx.commit().map_err(from_rusqlite)?;

        Ok(key)
    }

    fn update(&mut self, key: &DestinationKey, record: &DestinationRecord) -> Result<()> {
        let json = serde_json::to_string(record).map_err(|e| corrupt_row("entities", e))?;
        let changed = self
            .conn
            .execute(
                "UPDATE entities SET record = ?1, updated_at = ?2
                 WHERE kind = ?3 AND entity_key = ?4",
                rusqlite::params![json, Utc::now().timestamp(), self.kind, key.to_storage()],
            )
            .map_err(from_rusqlite)?;
        if changed == 0 {
            return Err(self.error(ExErrorKind::NotFound, "destination_update", key, "not found"));
        }
        Ok(())
    }

    fn delete(&mut self, key: &DestinationKey) -> Result<DeleteOutcome> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM entities WHERE kind = ?1 AND entity_key = ?2",
                rusqlite::params![self.kind, key.to_storage()],
            )
            .map_err(from_rusqlite)?;
        Ok(if removed == 0 {
            DeleteOutcome::NotFound
        } else {
            DeleteOutcome::Deleted
        })
    }
}
