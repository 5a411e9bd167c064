//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections

use crate::errors::{from_rusqlite, io_error, Result};
use rusqlite::Connection;
use std::path::Path;
use std::time::Duration;

/// How long a writer waits on a lock held by another process
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a SQLite database at the given path, creating parent directories
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_error("open_database", e))?;
    }
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database (for testing)
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection for concurrent runs
pub fn configure(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(from_rusqlite)?;

    // In-memory databases answer "memory" and stay in that mode.
    let _mode: String = conn
        .query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))
        .map_err(from_rusqlite)?;

    conn.busy_timeout(BUSY_TIMEOUT).map_err(from_rusqlite)?;

    Ok(())
}

/// Open, configure and migrate a database in one step
pub fn open_store<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let mut conn = open(path)?;
    configure(&conn)?;
    crate::migrations::apply_migrations(&mut conn)?;
    Ok(conn)
}
