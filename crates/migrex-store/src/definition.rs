//! Migration definition parser with validation
//!
//! Parses YAML definitions and checks the invariants the executable relies
//! on before any run starts.

use migrex_core::model::{MigrationDefinition, SourceConfig};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::errors::{definition_invalid, io_error, Result};

/// Parse a definition file
///
/// A relative `json` source path is resolved against the directory holding
/// the definition.
pub fn parse_definition_file(path: &Path) -> Result<MigrationDefinition> {
    let content = fs::read_to_string(path).map_err(|e| io_error("definition_read", e))?;
    let mut definition = parse_definition_str(&content)?;

    if let SourceConfig::Json { path: data, .. } = &mut definition.source {
        if data.is_relative() {
            if let Some(base) = path.parent() {
                *data = base.join(&*data);
            }
        }
    }

    Ok(definition)
}

/// Parse a definition from a string
pub fn parse_definition_str(content: &str) -> Result<MigrationDefinition> {
    let definition: MigrationDefinition = serde_yaml::from_str(content)
        .map_err(|e| definition_invalid(&format!("YAML parse error: {}", e)))?;

    validate_definition(&definition)?;

    Ok(definition)
}

/// Validate a parsed definition
pub fn validate_definition(definition: &MigrationDefinition) -> Result<()> {
    if definition.id.trim().is_empty() {
        return Err(definition_invalid("Migration id must not be empty"));
    }

    let ids = definition.id_fields();
    if ids.is_empty() {
        return Err(definition_invalid(&format!(
            "Migration {} declares no source id fields",
            definition.id
        )));
    }

    let mut seen = HashSet::new();
    for field in ids.as_slice() {
        if !seen.insert(field.name.as_str()) {
            return Err(definition_invalid(&format!(
                "Duplicate id field '{}' in migration {}",
                field.name, definition.id
            )));
        }
    }

    if definition.process.is_empty() {
        return Err(definition_invalid(&format!(
            "Migration {} has no process rules",
            definition.id
        )));
    }

    let mut fields = HashSet::new();
    for field in definition.process.fields() {
        if !fields.insert(field) {
            return Err(definition_invalid(&format!(
                "Duplicate process field '{}' in migration {}",
                field, definition.id
            )));
        }
    }

    if definition.destination.kind().trim().is_empty() {
        return Err(definition_invalid(&format!(
            "Migration {} has no destination plugin",
            definition.id
        )));
    }

    if let Some(key_field) = &definition.destination.key_field {
        if !fields.contains(key_field.as_str()) {
            return Err(definition_invalid(&format!(
                "Destination key field '{}' is not produced by the process rules of {}",
                key_field, definition.id
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use migrex_core::errors::ExErrorKind;

    const MINIMAL: &str = r#"
id: vocabularies
source:
  plugin: embedded_data
  data_rows:
    - {id: "1", name: categories}
  ids:
    id: {type: integer}
process:
  vid: id
  name: name
destination:
  plugin: entity:taxonomy_vocabulary
"#;

    #[test]
    fn test_parse_minimal_definition() {
        let definition = parse_definition_str(MINIMAL).unwrap();
        assert_eq!(definition.id, "vocabularies");
        assert_eq!(definition.destination.kind(), "taxonomy_vocabulary");
    }

    #[test]
    fn test_missing_ids_rejected() {
        let content = MINIMAL.replace("  ids:\n    id: {type: integer}\n", "  ids: {}\n");
        let err = parse_definition_str(&content).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidDefinition);
        assert!(err.message().contains("no source id fields"));
    }

    #[test]
    fn test_unknown_key_field_rejected() {
        let content = MINIMAL.replace(
            "plugin: entity:taxonomy_vocabulary",
            "plugin: entity:taxonomy_vocabulary\n  key_field: machine_name",
        );
        let err = parse_definition_str(&content).unwrap_err();
        assert!(err.message().contains("machine_name"));
    }

    #[test]
    fn test_yaml_error_is_invalid_definition() {
        let err = parse_definition_str("id: [unclosed").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidDefinition);
        assert!(err.message().starts_with("YAML parse error"));
    }
}
