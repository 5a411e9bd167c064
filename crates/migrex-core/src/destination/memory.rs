use std::collections::BTreeMap;

use super::{key_from_record, DeleteOutcome, DestinationWriter};
use crate::errors::{ExError, ExErrorKind, ExResult};
use crate::model::{DestinationConfig, DestinationKey, DestinationRecord};

/// In-memory entity store for one destination kind
#[derive(Debug, Clone, Default)]
pub struct InMemoryDestination {
    kind: String,
    key_field: Option<String>,
    entities: BTreeMap<DestinationKey, DestinationRecord>,
    next_id: i64,
}

impl InMemoryDestination {
    /// Writer allocating sequential integer keys
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            key_field: None,
            entities: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Take the destination key from `key_field` of each record
    pub fn with_key_field(mut self, key_field: impl Into<String>) -> Self {
        self.key_field = Some(key_field.into());
        self
    }

    pub fn from_config(config: &DestinationConfig) -> Self {
        let writer = Self::new(config.kind());
        match &config.key_field {
            Some(field) => writer.with_key_field(field.clone()),
            None => writer,
        }
    }

    pub fn load(&self, key: &DestinationKey) -> Option<&DestinationRecord> {
        self.entities.get(key)
    }

    pub fn contains(&self, key: &DestinationKey) -> bool {
        self.entities.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    fn writer_error(&self, kind: ExErrorKind, op: &str, key: &DestinationKey) -> ExError {
        ExError::new(kind)
            .with_op(op.to_string())
            .with_dest_key(key.to_string())
    }
}

impl DestinationWriter for InMemoryDestination {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn create(&mut self, record: &DestinationRecord) -> ExResult<DestinationKey> {
        let key = match &self.key_field {
            Some(field) => key_from_record(&self.kind, field, record)?,
            None => {
                let key = DestinationKey::single(self.next_id);
                self.next_id += 1;
                key
            }
        };
        if self.entities.contains_key(&key) {
            return Err(self
                .writer_error(ExErrorKind::AlreadyExists, "destination_create", &key)
                .with_message(format!("{} already exists", self.kind)));
        }
        self.entities.insert(key.clone(), record.clone());
        Ok(key)
    }

    fn update(&mut self, key: &DestinationKey, record: &DestinationRecord) -> ExResult<()> {
        match self.entities.get_mut(key) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(self
                .writer_error(ExErrorKind::NotFound, "destination_update", key)
                .with_message(format!("{} not found", self.kind))),
        }
    }

    fn delete(&mut self, key: &DestinationKey) -> ExResult<DeleteOutcome> {
        Ok(match self.entities.remove(key) {
            Some(_) => DeleteOutcome::Deleted,
            None => DeleteOutcome::NotFound,
        })
    }
}
