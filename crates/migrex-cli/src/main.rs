//! Migrex CLI
//!
//! Command-line interface for running migrations against a SQLite store

use clap::{Parser, Subcommand, ValueEnum};
use migrex_core::logging_facility::{init, Profile};
use std::path::PathBuf;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "migrex")]
#[command(about = "Migrex - Row-level import and rollback of declarative migrations", long_about = None)]
struct Cli {
    /// SQLite store holding identifier maps, run status and entities
    #[arg(long, global = true, env = "MIGREX_DB", default_value = ".migrex/store.db")]
    db: PathBuf,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Import source rows into the destination
    Import(commands::run::ImportArgs),
    /// Roll back imported rows
    Rollback(commands::run::RollbackArgs),
    /// Show per-migration map counts and run status
    Status(commands::status::StatusArgs),
    /// List messages recorded against rows
    Messages(commands::messages::MessagesArgs),
    /// Force a migration left busy by a crashed run back to idle
    ResetStatus(commands::status::ResetStatusArgs),
}

fn main() {
    let cli = Cli::parse();

    init(match cli.log_format {
        LogFormat::Pretty => Profile::Development,
        LogFormat::Json => Profile::Production,
    });

    let result = match cli.command {
        Commands::Import(args) => commands::run::execute_import(&cli.db, args),
        Commands::Rollback(args) => commands::run::execute_rollback(&cli.db, args),
        Commands::Status(args) => commands::status::execute(&cli.db, args),
        Commands::Messages(args) => commands::messages::execute(&cli.db, args),
        Commands::ResetStatus(args) => commands::status::execute_reset(&cli.db, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
