use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use super::keys::{IdField, KeyValue, SourceKey};
use crate::errors::{MigrateError, Result};

/// One unit of input data
///
/// Fields are kept in a `BTreeMap` so the content hash does not depend on
/// the order the source produced them in.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRow {
    key: SourceKey,
    fields: BTreeMap<String, Value>,
}

impl SourceRow {
    /// Build a row and extract its identifier key
    ///
    /// `row_index` is the row's position in the source and only used for
    /// error reporting.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdField` if a declared id field is absent or null, and
    /// `InvalidIdValue` if it cannot be coerced to the declared type.
    pub fn from_fields(
        row_index: usize,
        fields: Map<String, Value>,
        id_fields: &[IdField],
    ) -> Result<Self> {
        let fields: BTreeMap<String, Value> = fields.into_iter().collect();
        let mut key = Vec::with_capacity(id_fields.len());
        for id_field in id_fields {
            let raw = match fields.get(&id_field.name) {
                Some(value) if !value.is_null() => value,
                _ => {
                    return Err(MigrateError::MissingIdField {
                        row_index,
                        field: id_field.name.clone(),
                    })
                }
            };
            let value = KeyValue::from_json(raw, id_field.id_type).ok_or_else(|| {
                MigrateError::InvalidIdValue {
                    field: id_field.name.clone(),
                    value: raw.to_string(),
                    expected: id_field.id_type.to_string(),
                }
            })?;
            key.push(value);
        }
        Ok(Self {
            key: SourceKey::new(key),
            fields,
        })
    }

    pub fn key(&self) -> &SourceKey {
        &self.key
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn fields(&self) -> &BTreeMap<String, Value> {
        &self.fields
    }

    /// SHA256 hex digest of the row content
    ///
    /// Used to detect source changes between imports.
    pub fn hash(&self) -> String {
        let json = serde_json::to_string(&self.fields).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::keys::IdType;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn ids() -> Vec<IdField> {
        vec![IdField::new("id", IdType::Integer)]
    }

    #[test]
    fn test_key_is_extracted_and_typed() {
        let row =
            SourceRow::from_fields(0, fields(json!({"id": "1", "name": "tags"})), &ids()).unwrap();
        assert_eq!(row.key(), &SourceKey::single(1));
        assert_eq!(row.get("name"), Some(&json!("tags")));
    }

    #[test]
    fn test_missing_id_field_is_reported() {
        let err = SourceRow::from_fields(3, fields(json!({"name": "tags"})), &ids()).unwrap_err();
        assert_eq!(
            err,
            MigrateError::MissingIdField {
                row_index: 3,
                field: "id".to_string()
            }
        );
    }

    #[test]
    fn test_hash_ignores_field_order_but_not_content() {
        let a = SourceRow::from_fields(0, fields(json!({"id": 1, "name": "a"})), &ids()).unwrap();
        let mut reordered = Map::new();
        reordered.insert("name".to_string(), json!("a"));
        reordered.insert("id".to_string(), json!(1));
        let b = SourceRow::from_fields(0, reordered, &ids()).unwrap();
        let c = SourceRow::from_fields(0, fields(json!({"id": 1, "name": "b"})), &ids()).unwrap();

        assert_eq!(a.hash(), b.hash());
        assert_ne!(a.hash(), c.hash());
        assert_eq!(a.hash().len(), 64);
    }
}
