pub mod messages;
pub mod run;
pub mod status;

use migrex_core::model::MigrationDefinition;
use std::path::{Path, PathBuf};

/// Definitions named on the command line
///
/// A directory contributes every `.yaml`/`.yml` file in it, sorted by name.
pub fn load_definitions(
    paths: &[PathBuf],
) -> Result<Vec<MigrationDefinition>, Box<dyn std::error::Error>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.extension()
                        .map(|ext| ext == "yaml" || ext == "yml")
                        .unwrap_or(false)
                })
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(path.clone());
        }
    }

    let mut definitions = Vec::with_capacity(files.len());
    for file in files {
        definitions.push(migrex_store::parse_definition_file(&file)?);
    }
    Ok(definitions)
}

/// Open the store, creating and migrating it on first use
pub fn open_store(db: &Path) -> Result<rusqlite::Connection, Box<dyn std::error::Error>> {
    Ok(migrex_store::db::open_store(db)?)
}
