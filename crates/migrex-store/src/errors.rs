//! Error handling for migrex-store
//!
//! Wraps migrex-core ExError with store-specific helpers

use migrex_core::errors::{ExError, ExErrorKind};

/// Result type alias using ExError
pub type Result<T> = std::result::Result<T, ExError>;

/// Create a schema migration error
pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("schema_migration")
        .with_message(format!("Schema migration {} failed: {}", migration_id, reason))
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> ExError {
    ExError::new(ExErrorKind::ConstraintViolation)
        .with_op("schema_migration_checksum")
        .with_message(format!(
            "Checksum mismatch for schema migration {}: expected {}, got {}",
            migration_id, expected, actual
        ))
}

/// Create a migration definition validation error
pub fn definition_invalid(reason: &str) -> ExError {
    ExError::new(ExErrorKind::InvalidDefinition)
        .with_op("definition_parse")
        .with_message(reason.to_string())
}

/// Create a database error from rusqlite::Error
pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    ExError::new(ExErrorKind::Persistence)
        .with_op("sqlite")
        .with_message(err.to_string())
}

/// Create an IO error
pub fn io_error(operation: &str, err: std::io::Error) -> ExError {
    ExError::new(ExErrorKind::Io)
        .with_op(operation.to_string())
        .with_message(err.to_string())
}

/// Create an error for a stored value that no longer decodes
pub fn corrupt_row(table: &str, reason: impl std::fmt::Display) -> ExError {
    ExError::new(ExErrorKind::Serialization)
        .with_op("sqlite_decode")
        .with_message(format!("Corrupt row in {}: {}", table, reason))
}
