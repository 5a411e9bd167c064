//! Messages command
//!
//! Usage: migrex messages <DEFINITION> [--idlist 1,2]

use clap::Args;
use migrex_core::id_map::IdMap;
use migrex_core::model::IdList;
use migrex_store::SqliteIdMap;
use std::path::{Path, PathBuf};

use super::{load_definitions, open_store};

#[derive(Debug, Args)]
pub struct MessagesArgs {
    /// Migration definition file
    pub definition: PathBuf,

    /// Only messages for these source keys
    #[arg(long)]
    pub idlist: Option<String>,
}

pub fn execute(db: &Path, args: MessagesArgs) -> Result<(), Box<dyn std::error::Error>> {
    let definitions = load_definitions(std::slice::from_ref(&args.definition))?;
    let conn = open_store(db)?;

    for definition in &definitions {
        let id_map = SqliteIdMap::new(&conn, definition.id.as_str());
        let filter = args
            .idlist
            .as_deref()
            .map(|text| IdList::parse(text, definition.id_fields().as_slice()))
            .transpose()?;

        let messages = id_map.messages(None)?;
        let selected: Vec<_> = messages
            .iter()
            .filter(|m| filter.as_ref().map_or(true, |list| list.contains(&m.source_key)))
            .collect();

        if selected.is_empty() {
            println!("{}: no messages", definition.id);
            continue;
        }
        for message in selected {
            println!(
                "{}\t{}\t{}\t{}",
                definition.id,
                message.source_key,
                message.level.as_str(),
                message.message
            );
        }
    }

    Ok(())
}
