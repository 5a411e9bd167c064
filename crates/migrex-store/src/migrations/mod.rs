//! Schema migration framework
//!
//! Provides:
//! - Runner recording a checksum for every applied migration
//! - Idempotent application with checksum verification on later runs
//! - Embedded SQL migrations

mod checksums;
mod embedded;
mod runner;

pub use runner::{applied_migrations, apply_migrations};
