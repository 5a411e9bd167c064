//! Canonical schema constants for structured logging and events
//!
//! These constants keep field names consistent across the executable,
//! the store and the CLI.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_RUN_ID: &str = "run_id";

// Migration identifiers
pub const FIELD_MIGRATION_ID: &str = "migration_id";
pub const FIELD_SOURCE_KEY: &str = "source_key";
pub const FIELD_DEST_KEY: &str = "dest_key";

// Run counters
pub const FIELD_PROCESSED: &str = "processed";
pub const FIELD_FAILED: &str = "failed";
pub const FIELD_ROLLED_BACK: &str = "rolled_back";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";
