//! Status and reset-status commands

use clap::Args;
use migrex_core::status::StatusStore;
use migrex_store::SqliteStatusStore;
use std::path::{Path, PathBuf};

use super::{load_definitions, open_store};

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Migration definition files or directories of them
    #[arg(required = true)]
    pub definitions: Vec<PathBuf>,

    /// Print reports as JSON lines
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ResetStatusArgs {
    /// Migration id to return to idle
    pub migration_id: String,
}

pub fn execute(db: &Path, args: StatusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let definitions = load_definitions(&args.definitions)?;
    let conn = open_store(db)?;

    if !args.json {
        println!(
            "{:<32} {:<13} {:>7} {:>8} {:>12} {:>7} {:>6} {:>11} {:>8}",
            "MIGRATION",
            "STATUS",
            "TOTAL",
            "IMPORTED",
            "NEEDS_UPDATE",
            "IGNORED",
            "FAILED",
            "UNPROCESSED",
            "MESSAGES"
        );
    }

    for definition in &definitions {
        let report = migrex_store::status_report(&conn, definition)?;
        if args.json {
            println!("{}", serde_json::to_string(&report)?);
            continue;
        }
        println!(
            "{:<32} {:<13} {:>7} {:>8} {:>12} {:>7} {:>6} {:>11} {:>8}",
            report.migration_id,
            report.status,
            report.source_rows,
            report.counts.imported,
            report.counts.needs_update,
            report.counts.ignored,
            report.counts.failed,
            report.unprocessed,
            report.messages
        );
    }

    Ok(())
}

pub fn execute_reset(db: &Path, args: ResetStatusArgs) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_store(db)?;
    let store = SqliteStatusStore::new(&conn);

    let previous = store.status(&args.migration_id)?;
    store.finish(&args.migration_id)?;
    println!("{}: {} -> idle", args.migration_id, previous);

    Ok(())
}
