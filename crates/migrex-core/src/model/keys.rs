//! Source and destination identifiers
//!
//! A key is an ordered tuple of scalar values. Source keys follow the
//! declared identifier fields of the migration; destination keys are
//! whatever the destination writer hands back on create.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use super::ordered::deserialize_ordered;
use crate::errors::{MigrateError, Result};

/// Separator between components of a multi-field key in id lists and display
pub const KEY_COMPONENT_SEPARATOR: char = ':';

/// Separator between keys in an id list
pub const ID_LIST_SEPARATOR: char = ',';

/// Declared type of an identifier field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdType {
    Integer,
    String,
}

impl fmt::Display for IdType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdType::Integer => f.write_str("integer"),
            IdType::String => f.write_str("string"),
        }
    }
}

/// One declared identifier field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdField {
    pub name: String,
    pub id_type: IdType,
}

impl IdField {
    pub fn new(name: impl Into<String>, id_type: IdType) -> Self {
        Self {
            name: name.into(),
            id_type,
        }
    }
}

#[derive(Deserialize)]
struct IdSpec {
    #[serde(rename = "type")]
    id_type: IdType,
}

/// Ordered identifier field declaration (`ids: {id: {type: integer}}`)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdFields(Vec<IdField>);

impl IdFields {
    pub fn new(fields: Vec<IdField>) -> Self {
        Self(fields)
    }

    pub fn as_slice(&self) -> &[IdField] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for IdFields {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries: Vec<(String, IdSpec)> = deserialize_ordered(deserializer)?;
        Ok(Self(
            entries
                .into_iter()
                .map(|(name, spec)| IdField::new(name, spec.id_type))
                .collect(),
        ))
    }
}

/// A single scalar component of a key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeyValue {
    Integer(i64),
    String(String),
}

impl KeyValue {
    /// Coerce raw text to the declared type
    pub fn parse(text: &str, id_type: IdType) -> Option<Self> {
        match id_type {
            IdType::Integer => text.trim().parse::<i64>().ok().map(KeyValue::Integer),
            IdType::String => Some(KeyValue::String(text.to_string())),
        }
    }

    /// Coerce a JSON scalar to the declared type
    ///
    /// Integer fields accept numbers and numeric strings; string fields accept
    /// strings and numbers (rendered as text).
    pub fn from_json(value: &Value, id_type: IdType) -> Option<Self> {
        match (value, id_type) {
            (Value::Number(n), IdType::Integer) => n.as_i64().map(KeyValue::Integer),
            (Value::String(s), IdType::Integer) => Self::parse(s, IdType::Integer),
            (Value::String(s), IdType::String) => Some(KeyValue::String(s.clone())),
            (Value::Number(n), IdType::String) => Some(KeyValue::String(n.to_string())),
            _ => None,
        }
    }

    /// Convert a destination field value without a declared type
    pub fn from_json_untyped(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(KeyValue::Integer),
            Value::String(s) => Some(KeyValue::String(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            KeyValue::Integer(i) => Value::from(*i),
            KeyValue::String(s) => Value::from(s.clone()),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Integer(i) => write!(f, "{}", i),
            KeyValue::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        KeyValue::Integer(value)
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        KeyValue::Integer(i64::from(value))
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        KeyValue::String(value.to_string())
    }
}

fn fmt_components(values: &[KeyValue], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", KEY_COMPONENT_SEPARATOR)?;
        }
        write!(f, "{}", value)?;
    }
    Ok(())
}

macro_rules! key_tuple {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Vec<KeyValue>);

        impl $name {
            pub fn new(values: Vec<KeyValue>) -> Self {
                Self(values)
            }

            pub fn single(value: impl Into<KeyValue>) -> Self {
                Self(vec![value.into()])
            }

            pub fn values(&self) -> &[KeyValue] {
                &self.0
            }

            /// Canonical text form used as a storage key (a JSON array)
            pub fn to_storage(&self) -> String {
                serde_json::to_string(&self.0).unwrap_or_else(|_| "[]".to_string())
            }

            /// Parse the canonical storage form
            ///
            /// # Errors
            ///
            /// Returns `Serialization` if the text is not a JSON array of scalars.
            pub fn from_storage(text: &str) -> Result<Self> {
                Ok(Self(serde_json::from_str(text)?))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt_components(&self.0, f)
            }
        }
    };
}

key_tuple!(
    /// Identifier tuple of a source row, in declared id-field order
    SourceKey
);

key_tuple!(
    /// Identifier tuple of a destination entity
    DestinationKey
);

/// Explicit set of source keys restricting an import or rollback
///
/// Absence of an `IdList` means "all rows".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IdList(Vec<SourceKey>);

impl IdList {
    pub fn new(keys: Vec<SourceKey>) -> Self {
        Self(keys)
    }

    /// Parse `"1,2"` or, for multi-field keys, `"1:en,2:fr"`
    ///
    /// # Errors
    ///
    /// Returns `InvalidIdList` if no key is given, a key has the wrong number
    /// of components or a component does not match its declared type.
    pub fn parse(input: &str, id_fields: &[IdField]) -> Result<Self> {
        let invalid = |reason: String| MigrateError::InvalidIdList {
            input: input.to_string(),
            reason,
        };

        let mut keys = Vec::new();
        for raw_key in input.split(ID_LIST_SEPARATOR) {
            let raw_key = raw_key.trim();
            if raw_key.is_empty() {
                continue;
            }
            let components: Vec<&str> = raw_key.split(KEY_COMPONENT_SEPARATOR).collect();
            if components.len() != id_fields.len() {
                return Err(invalid(format!(
                    "key '{}' has {} component(s), expected {}",
                    raw_key,
                    components.len(),
                    id_fields.len()
                )));
            }
            let values = components
                .iter()
                .zip(id_fields)
                .map(|(text, field)| {
                    KeyValue::parse(text, field.id_type).ok_or_else(|| {
                        invalid(format!(
                            "'{}' is not a valid {} for '{}'",
                            text, field.id_type, field.name
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            keys.push(SourceKey::new(values));
        }
        if keys.is_empty() {
            return Err(invalid("no source keys given".to_string()));
        }
        Ok(Self(keys))
    }

    pub fn contains(&self, key: &SourceKey) -> bool {
        self.0.contains(key)
    }

    pub fn keys(&self) -> &[SourceKey] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_id() -> Vec<IdField> {
        vec![IdField::new("id", IdType::Integer)]
    }

    #[test]
    fn test_parse_single_field_id_list() {
        let list = IdList::parse("1, 2", &int_id()).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.contains(&SourceKey::single(1)));
        assert!(list.contains(&SourceKey::single(2)));
    }

    #[test]
    fn test_parse_multi_field_id_list() {
        let fields = vec![
            IdField::new("id", IdType::Integer),
            IdField::new("lang", IdType::String),
        ];
        let list = IdList::parse("1:en,2:fr", &fields).unwrap();
        assert!(list.contains(&SourceKey::new(vec![1.into(), "en".into()])));
        assert!(!list.contains(&SourceKey::new(vec![1.into(), "fr".into()])));
    }

    #[test]
    fn test_parse_rejects_component_count_mismatch() {
        let err = IdList::parse("1:en", &int_id()).unwrap_err();
        assert!(matches!(err, MigrateError::InvalidIdList { .. }));
    }

    #[test]
    fn test_parse_rejects_empty_list() {
        for input in ["", " ", ",,"] {
            let err = IdList::parse(input, &int_id()).unwrap_err();
            assert!(err.to_string().contains("no source keys given"));
        }
    }

    #[test]
    fn test_parse_rejects_non_integer() {
        let err = IdList::parse("abc", &int_id()).unwrap_err();
        assert!(err.to_string().contains("not a valid integer"));
    }

    #[test]
    fn test_integer_field_coerces_numeric_string() {
        let value = KeyValue::from_json(&Value::from("7"), IdType::Integer);
        assert_eq!(value, Some(KeyValue::Integer(7)));
        assert_eq!(KeyValue::from_json(&Value::from("x"), IdType::Integer), None);
    }

    #[test]
    fn test_storage_form_preserves_types() {
        let key = SourceKey::new(vec![1.into(), "1".into()]);
        let text = key.to_storage();
        assert_eq!(text, r#"[1,"1"]"#);
        assert_eq!(SourceKey::from_storage(&text).unwrap(), key);
    }

    #[test]
    fn test_display_joins_components() {
        let key = DestinationKey::new(vec![3.into(), "en".into()]);
        assert_eq!(key.to_string(), "3:en");
    }
}
