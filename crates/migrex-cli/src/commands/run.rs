//! Import and rollback commands
//!
//! Usage:
//!   migrex import <DEFINITION>... [--idlist 1,2] [--limit N] [--update]
//!   migrex rollback <DEFINITION>... [--idlist 1,2]

use clap::Args;
use migrex_core::model::{IdList, MigrationDefinition};
use migrex_core::{ExecutableOptions, RunOperation, RunOutcome, RunSummary};
use std::path::{Path, PathBuf};

use super::{load_definitions, open_store};

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Migration definition files or directories of them
    #[arg(required = true)]
    pub definitions: Vec<PathBuf>,

    /// Only these source keys, e.g. `1,2` or `1:en,2:fr`
    #[arg(long)]
    pub idlist: Option<String>,

    /// Stop after this many processed rows per migration
    #[arg(long)]
    pub limit: Option<usize>,

    /// Re-process rows that were already imported
    #[arg(long)]
    pub update: bool,

    /// Print run summaries as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct RollbackArgs {
    /// Migration definition files or directories of them
    #[arg(required = true)]
    pub definitions: Vec<PathBuf>,

    /// Only these source keys, e.g. `1,2` or `1:en,2:fr`
    #[arg(long)]
    pub idlist: Option<String>,

    /// Print run summaries as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute_import(db: &Path, args: ImportArgs) -> Result<(), Box<dyn std::error::Error>> {
    let definitions = load_definitions(&args.definitions)?;
    let conn = open_store(db)?;

    let mut failed = 0;
    for definition in &definitions {
        let options = ExecutableOptions {
            idlist: parse_idlist(args.idlist.as_deref(), definition)?,
            limit: args.limit,
            update: args.update,
        };
        let summary = migrex_store::execute(&conn, definition, RunOperation::Import, options)?;
        print_summary(&summary, args.json)?;
        failed += summary.failed;
    }

    finish(failed)
}

/// Rolls back in reverse of the given order so dependents go first
pub fn execute_rollback(db: &Path, args: RollbackArgs) -> Result<(), Box<dyn std::error::Error>> {
    let definitions = load_definitions(&args.definitions)?;
    let conn = open_store(db)?;

    let mut failed = 0;
    for definition in definitions.iter().rev() {
        let options = ExecutableOptions {
            idlist: parse_idlist(args.idlist.as_deref(), definition)?,
            ..ExecutableOptions::default()
        };
        let summary = migrex_store::execute(&conn, definition, RunOperation::Rollback, options)?;
        print_summary(&summary, args.json)?;
        failed += summary.failed;
    }

    finish(failed)
}

fn parse_idlist(
    input: Option<&str>,
    definition: &MigrationDefinition,
) -> Result<Option<IdList>, Box<dyn std::error::Error>> {
    match input {
        Some(text) => Ok(Some(IdList::parse(
            text,
            definition.id_fields().as_slice(),
        )?)),
        None => Ok(None),
    }
}

fn print_summary(summary: &RunSummary, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
        return Ok(());
    }

    let outcome = match summary.outcome() {
        RunOutcome::Completed => "completed",
        RunOutcome::CompletedWithFailures => "completed with failures",
    };
    println!(
        "{}: {} {}",
        summary.migration_id,
        summary.operation.as_str(),
        outcome
    );
    match summary.operation {
        RunOperation::Import => println!(
            "  processed {}, created {}, updated {}, unchanged {}, ignored {}, failed {}",
            summary.processed,
            summary.created,
            summary.updated,
            summary.skipped,
            summary.ignored,
            summary.failed
        ),
        RunOperation::Rollback => println!(
            "  selected {}, rolled back {}, failed {}",
            summary.processed, summary.rolled_back, summary.failed
        ),
    }
    Ok(())
}

fn finish(failed: usize) -> Result<(), Box<dyn std::error::Error>> {
    if failed > 0 {
        return Err(format!(
            "{} row(s) failed; run `migrex messages` for details",
            failed
        )
        .into());
    }
    Ok(())
}
