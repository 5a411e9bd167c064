//! Declarative migration definition
//!
//! Deserialized once before a run and read-only afterwards.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

use super::keys::IdFields;
use crate::process::FieldMapping;

/// Immutable descriptor of one migration
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MigrationDefinition {
    /// Migration id; partitions the identifier map and status registry
    pub id: String,

    /// Free-form labels used to group migrations
    #[serde(default)]
    pub migration_tags: Vec<String>,

    pub source: SourceConfig,

    /// Destination field -> rule, in declaration order
    pub process: FieldMapping,

    pub destination: DestinationConfig,
}

impl MigrationDefinition {
    /// Declared identifier fields of the source
    pub fn id_fields(&self) -> &IdFields {
        self.source.ids()
    }
}

/// Source plugin selection
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "plugin", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Rows embedded in the definition itself
    EmbeddedData {
        data_rows: Vec<Map<String, Value>>,
        ids: IdFields,
    },
    /// A JSON file holding an array of row objects
    Json { path: PathBuf, ids: IdFields },
}

impl SourceConfig {
    pub fn ids(&self) -> &IdFields {
        match self {
            SourceConfig::EmbeddedData { ids, .. } | SourceConfig::Json { ids, .. } => ids,
        }
    }

    pub fn plugin_name(&self) -> &'static str {
        match self {
            SourceConfig::EmbeddedData { .. } => "embedded_data",
            SourceConfig::Json { .. } => "json",
        }
    }
}

/// Destination selection
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DestinationConfig {
    /// e.g. `entity:taxonomy_vocabulary`
    pub plugin: String,

    /// Destination field whose processed value becomes the destination key.
    /// Without it the writer allocates sequential integer keys.
    #[serde(default)]
    pub key_field: Option<String>,
}

impl DestinationConfig {
    /// Entity kind handled by the writer (`entity:` prefix stripped)
    pub fn kind(&self) -> &str {
        self.plugin
            .strip_prefix("entity:")
            .unwrap_or(self.plugin.as_str())
    }
}
