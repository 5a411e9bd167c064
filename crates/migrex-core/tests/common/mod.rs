#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use migrex_core::destination::{DeleteOutcome, DestinationWriter, InMemoryDestination};
use migrex_core::errors::{ExError, ExErrorKind, ExResult};
use migrex_core::id_map::{IdMap, InMemoryIdMap};
use migrex_core::model::{
    DestinationKey, DestinationRecord, IdField, IdFields, IdList, IdType, MapCounts, MapEntry,
    MessageLevel, RowMessage, RowStatus, SourceKey,
};
use migrex_core::source::EmbeddedDataSource;
use migrex_core::{
    ExecutableOptions, FieldMapping, InMemoryStatusStore, MigrateExecutable, Migration,
    ProcessPipeline, RunSummary,
};
use serde_json::{json, Map, Value};
use std::collections::BTreeSet;

pub const VOCABULARY_MIGRATION: &str = "d6_taxonomy_vocabulary";

/// The two vocabularies used throughout the run scenarios
pub fn vocabulary_rows() -> Vec<Value> {
    vec![
        json!({"id": 1, "name": "categories", "weight": 2}),
        json!({"id": 2, "name": "tags", "weight": 1}),
    ]
}

pub fn objects(rows: Vec<Value>) -> Vec<Map<String, Value>> {
    rows.into_iter()
        .map(|row| match row {
            Value::Object(map) => map,
            other => panic!("row is not an object: {}", other),
        })
        .collect()
}

/// Migration copying `id`, `name` and `weight` from embedded rows
pub fn vocabulary_migration(rows: Vec<Value>) -> Migration {
    let source = EmbeddedDataSource::new(
        objects(rows),
        IdFields::new(vec![IdField::new("id", IdType::Integer)]),
    );
    let mapping = FieldMapping::copy([("vid", "id"), ("name", "name"), ("weight", "weight")]);
    Migration::new(
        VOCABULARY_MIGRATION,
        Box::new(source),
        ProcessPipeline::new(&mapping),
    )
}

/// Migration built from a JSON definition string
pub fn migration_from_json(definition: &str) -> Migration {
    let definition = serde_json::from_str(definition).expect("definition should parse");
    Migration::from_definition(&definition)
}

/// Collaborators for a single migration, kept across runs
pub struct Harness {
    pub destination: InMemoryDestination,
    pub id_map: InMemoryIdMap,
    pub status: InMemoryStatusStore,
}

impl Harness {
    pub fn new(migration_id: &str) -> Self {
        Self {
            destination: InMemoryDestination::new("taxonomy_vocabulary"),
            id_map: InMemoryIdMap::new(migration_id),
            status: InMemoryStatusStore::new(),
        }
    }

    pub fn import(&mut self, migration: &Migration, options: ExecutableOptions) -> RunSummary {
        MigrateExecutable::new(
            migration,
            &mut self.destination,
            &mut self.id_map,
            &self.status,
            options,
        )
        .import()
        .expect("import should complete")
    }

    pub fn rollback(&mut self, migration: &Migration, options: ExecutableOptions) -> RunSummary {
        MigrateExecutable::new(
            migration,
            &mut self.destination,
            &mut self.id_map,
            &self.status,
            options,
        )
        .rollback()
        .expect("rollback should complete")
    }

    pub fn entry(&self, id: i64) -> Option<MapEntry> {
        self.id_map.get_by_source(&SourceKey::single(id)).unwrap()
    }
}

pub fn idlist(ids: &[i64]) -> Option<IdList> {
    Some(IdList::new(ids.iter().map(|id| SourceKey::single(*id)).collect()))
}

/// Destination that rejects selected records and deletes
pub struct FailingDestination {
    pub inner: InMemoryDestination,
    /// Records whose `name` is listed here fail to write
    pub reject_names: BTreeSet<String>,
    /// Keys whose delete fails
    pub reject_deletes: BTreeSet<DestinationKey>,
}

impl FailingDestination {
    pub fn new() -> Self {
        Self {
            inner: InMemoryDestination::new("taxonomy_vocabulary"),
            reject_names: BTreeSet::new(),
            reject_deletes: BTreeSet::new(),
        }
    }

    fn rejects(&self, record: &DestinationRecord) -> bool {
        record
            .get("name")
            .and_then(Value::as_str)
            .is_some_and(|name| self.reject_names.contains(name))
    }

    fn failure(op: &str, message: &str) -> ExError {
        ExError::new(ExErrorKind::Writer)
            .with_op(op)
            .with_message(message)
    }
}

impl DestinationWriter for FailingDestination {
    fn kind(&self) -> &str {
        self.inner.kind()
    }

    fn create(&mut self, record: &DestinationRecord) -> ExResult<DestinationKey> {
        if self.rejects(record) {
            return Err(Self::failure("destination_create", "constraint violated"));
        }
        self.inner.create(record)
    }

    fn update(&mut self, key: &DestinationKey, record: &DestinationRecord) -> ExResult<()> {
        if self.rejects(record) {
            return Err(Self::failure("destination_update", "constraint violated"));
        }
        self.inner.update(key, record)
    }

    fn delete(&mut self, key: &DestinationKey) -> ExResult<DeleteOutcome> {
        if self.reject_deletes.contains(key) {
            return Err(Self::failure("destination_delete", "entity is locked"));
        }
        self.inner.delete(key)
    }
}

/// Identifier map whose `Imported` saves fail a set number of times
pub struct FlakyIdMap {
    pub inner: InMemoryIdMap,
    pub failures_left: usize,
    pub attempts: usize,
}

impl FlakyIdMap {
    pub fn new(migration_id: &str, failures: usize) -> Self {
        Self {
            inner: InMemoryIdMap::new(migration_id),
            failures_left: failures,
            attempts: 0,
        }
    }
}

impl IdMap for FlakyIdMap {
    fn migration_id(&self) -> &str {
        self.inner.migration_id()
    }

    fn get_by_source(&self, key: &SourceKey) -> ExResult<Option<MapEntry>> {
        self.inner.get_by_source(key)
    }

    fn get_by_destination(&self, key: &DestinationKey) -> ExResult<Option<MapEntry>> {
        self.inner.get_by_destination(key)
    }

    fn save_mapping(
        &mut self,
        source_key: &SourceKey,
        dest_key: Option<&DestinationKey>,
        source_hash: &str,
        status: RowStatus,
    ) -> ExResult<()> {
        if status == RowStatus::Imported {
            self.attempts += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(ExError::new(ExErrorKind::Persistence).with_message("database is locked"));
            }
        }
        self.inner
            .save_mapping(source_key, dest_key, source_hash, status)
    }

    fn delete(&mut self, key: &SourceKey) -> ExResult<()> {
        self.inner.delete(key)
    }

    fn all_keys(&self, filter: Option<&IdList>) -> ExResult<Vec<SourceKey>> {
        self.inner.all_keys(filter)
    }

    fn prepare_update(&mut self) -> ExResult<usize> {
        self.inner.prepare_update()
    }

    fn save_message(&mut self, key: &SourceKey, level: MessageLevel, message: &str) -> ExResult<()> {
        self.inner.save_message(key, level, message)
    }

    fn clear_messages(&mut self, key: &SourceKey) -> ExResult<()> {
        self.inner.clear_messages(key)
    }

    fn messages(&self, key: Option<&SourceKey>) -> ExResult<Vec<RowMessage>> {
        self.inner.messages(key)
    }

    fn counts(&self) -> ExResult<MapCounts> {
        self.inner.counts()
    }
}
