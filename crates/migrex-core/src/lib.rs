//! Migrex Core - row-level import and rollback engine
//!
//! This crate provides the semantic kernel of a migration run, including:
//! - Source readers yielding keyed rows (embedded data, JSON files)
//! - The process pipeline turning rows into destination records
//! - Destination writer and identifier map contracts with in-memory backends
//! - The migrate executable driving import and rollback
//! - A per-migration status registry guarding concurrent runs
//!
//! Durable backends live in `migrex-store`.

pub mod destination;
pub mod errors;
pub mod executable;
pub mod id_map;
pub mod logging_facility;
pub mod migration;
pub mod model;
pub mod process;
pub mod report;
pub mod source;
pub mod status;

pub use migrex_core_types as core_types;

// Re-export commonly used types
pub use destination::{DeleteOutcome, DestinationWriter, InMemoryDestination};
pub use errors::{ExError, ExErrorKind, ExResult, MigrateError, Result};
pub use executable::{ExecutableOptions, MigrateExecutable, RunOperation, RunOutcome, RunSummary};
pub use id_map::{IdMap, InMemoryIdMap};
pub use migration::Migration;
pub use model::{
    DestinationKey, DestinationRecord, IdList, MapEntry, MigrationDefinition, RowStatus,
    SourceKey, SourceRow,
};
pub use process::{FieldMapping, ProcessPipeline};
pub use report::{report, MigrationReport};
pub use source::SourceReader;
pub use status::{InMemoryStatusStore, MigrationStatus, StatusStore};
