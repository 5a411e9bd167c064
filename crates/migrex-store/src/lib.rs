//! Migrex Store - SQLite persistence for migration runs
//!
//! Provides:
//! - SQLite schema with a checksummed migrations framework
//! - Identifier map, destination writer and status registry backed by SQLite
//! - YAML migration definition parser with validation
//! - Run orchestration wiring the SQLite collaborators together

pub mod db;
pub mod definition;
pub mod destination;
pub mod errors;
pub mod execute;
pub mod id_map;
pub mod migrations;
pub mod status;

// Re-export key types
pub use definition::{parse_definition_file, parse_definition_str};
pub use destination::SqliteDestination;
pub use errors::Result;
pub use execute::{execute, status_report};
pub use id_map::SqliteIdMap;
pub use status::SqliteStatusStore;
