//! Composable process steps
//!
//! Each step receives the value produced by the previous step of the same
//! rule. The first step usually reads a source field.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::{MigrateError, Result};
use crate::model::{DestinationRecord, SourceRow};

/// Prefix that makes `get` read an already-processed destination field
pub const DESTINATION_FIELD_PREFIX: char = '@';

/// Built-in value transforms for the `callback` step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Callable {
    Trim,
    Lowercase,
    Uppercase,
    ToInteger,
}

/// What `skip_on_empty` skips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipMethod {
    /// The whole row is ignored
    Row,
    /// Only this destination field is left unset
    Process,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "plugin", rename_all = "snake_case")]
pub enum ProcessStep {
    Get {
        source: String,
    },
    DefaultValue {
        default_value: Value,
    },
    StaticMap {
        map: BTreeMap<String, Value>,
        #[serde(default)]
        default_value: Option<Value>,
    },
    Concat {
        source: Vec<String>,
        #[serde(default)]
        delimiter: String,
    },
    Callback {
        callable: Callable,
    },
    SkipOnEmpty {
        method: SkipMethod,
        #[serde(default)]
        message: Option<String>,
    },
}

/// Result of applying one step
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum StepFlow {
    Continue(Value),
    /// Stop this rule and leave the destination field unset
    StopField,
}

/// Empty means null, an empty string or an empty array
pub(crate) fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn lookup<'a>(
    source: &str,
    row: &'a SourceRow,
    record: &'a DestinationRecord,
    dest_field: &str,
) -> Result<&'a Value> {
    let (found, origin) = match source.strip_prefix(DESTINATION_FIELD_PREFIX) {
        Some(field) => (record.get(field), "destination"),
        None => (row.get(source), "source"),
    };
    found.ok_or_else(|| MigrateError::Process {
        field: dest_field.to_string(),
        cause: format!("{} field '{}' is missing", origin, source),
    })
}

impl ProcessStep {
    pub(crate) fn apply(
        &self,
        value: Value,
        row: &SourceRow,
        record: &DestinationRecord,
        dest_field: &str,
    ) -> Result<StepFlow> {
        let rejected = |cause: String| MigrateError::Process {
            field: dest_field.to_string(),
            cause,
        };

        match self {
            ProcessStep::Get { source } => Ok(StepFlow::Continue(
                lookup(source, row, record, dest_field)?.clone(),
            )),
            ProcessStep::DefaultValue { default_value } => {
                if is_empty_value(&value) {
                    Ok(StepFlow::Continue(default_value.clone()))
                } else {
                    Ok(StepFlow::Continue(value))
                }
            }
            ProcessStep::StaticMap { map, default_value } => {
                let mapped = scalar_text(&value).and_then(|key| map.get(&key));
                match (mapped, default_value) {
                    (Some(mapped), _) => Ok(StepFlow::Continue(mapped.clone())),
                    (None, Some(default)) => Ok(StepFlow::Continue(default.clone())),
                    (None, None) => Err(rejected(format!("no static mapping for {}", value))),
                }
            }
            ProcessStep::Concat { source, delimiter } => {
                let parts = source
                    .iter()
                    .map(|name| {
                        let part = lookup(name, row, record, dest_field)?;
                        scalar_text(part)
                            .ok_or_else(|| rejected(format!("'{}' is not a scalar", name)))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok(StepFlow::Continue(Value::String(parts.join(delimiter))))
            }
            ProcessStep::Callback { callable } => apply_callable(*callable, value)
                .map(StepFlow::Continue)
                .map_err(rejected),
            ProcessStep::SkipOnEmpty { method, message } => {
                if !is_empty_value(&value) {
                    return Ok(StepFlow::Continue(value));
                }
                match method {
                    SkipMethod::Process => Ok(StepFlow::StopField),
                    SkipMethod::Row => Err(MigrateError::SkipRow {
                        field: dest_field.to_string(),
                        reason: message
                            .clone()
                            .unwrap_or_else(|| "value is empty".to_string()),
                    }),
                }
            }
        }
    }
}

fn apply_callable(callable: Callable, value: Value) -> std::result::Result<Value, String> {
    match callable {
        Callable::ToInteger => match &value {
            Value::Number(n) if n.is_i64() => Ok(value),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| format!("'{}' is not an integer", s)),
            other => Err(format!("{} is not an integer", other)),
        },
        Callable::Trim | Callable::Lowercase | Callable::Uppercase => {
            let text = match value {
                Value::String(s) => s,
                other => return Err(format!("{} is not a string", other)),
            };
            Ok(Value::String(match callable {
                Callable::Trim => text.trim().to_string(),
                Callable::Lowercase => text.to_lowercase(),
                _ => text.to_uppercase(),
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{IdField, IdType};
    use serde_json::json;

    fn row() -> SourceRow {
        let fields = match json!({"id": 1, "name": "  Tags ", "blank": "", "code": "a"}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        SourceRow::from_fields(0, fields, &[IdField::new("id", IdType::Integer)]).unwrap()
    }

    fn apply(step: &ProcessStep, value: Value) -> Result<StepFlow> {
        step.apply(value, &row(), &DestinationRecord::new(), "out")
    }

    #[test]
    fn test_get_missing_source_field_fails() {
        let step = ProcessStep::Get {
            source: "nope".to_string(),
        };
        let err = apply(&step, Value::Null).unwrap_err();
        assert!(matches!(err, MigrateError::Process { ref field, .. } if field == "out"));
    }

    #[test]
    fn test_get_reads_destination_field_with_prefix() {
        let mut record = DestinationRecord::new();
        record.set("vid", json!("tags"));
        let step = ProcessStep::Get {
            source: "@vid".to_string(),
        };
        let flow = step.apply(Value::Null, &row(), &record, "out").unwrap();
        assert_eq!(flow, StepFlow::Continue(json!("tags")));
    }

    #[test]
    fn test_static_map_falls_back_to_default() {
        let step = ProcessStep::StaticMap {
            map: BTreeMap::from([("a".to_string(), json!("alpha"))]),
            default_value: Some(json!("other")),
        };
        assert_eq!(
            apply(&step, json!("a")).unwrap(),
            StepFlow::Continue(json!("alpha"))
        );
        assert_eq!(
            apply(&step, json!("z")).unwrap(),
            StepFlow::Continue(json!("other"))
        );
    }

    #[test]
    fn test_concat_joins_with_delimiter() {
        let step = ProcessStep::Concat {
            source: vec!["id".to_string(), "code".to_string()],
            delimiter: "-".to_string(),
        };
        assert_eq!(
            apply(&step, Value::Null).unwrap(),
            StepFlow::Continue(json!("1-a"))
        );
    }

    #[test]
    fn test_callbacks() {
        let trim = ProcessStep::Callback {
            callable: Callable::Trim,
        };
        assert_eq!(
            apply(&trim, json!("  x ")).unwrap(),
            StepFlow::Continue(json!("x"))
        );

        let to_int = ProcessStep::Callback {
            callable: Callable::ToInteger,
        };
        assert_eq!(
            apply(&to_int, json!(" 12")).unwrap(),
            StepFlow::Continue(json!(12))
        );
        assert!(apply(&to_int, json!("twelve")).is_err());
    }

    #[test]
    fn test_skip_on_empty_methods() {
        let skip_field = ProcessStep::SkipOnEmpty {
            method: SkipMethod::Process,
            message: None,
        };
        assert_eq!(apply(&skip_field, json!("")).unwrap(), StepFlow::StopField);

        let skip_row = ProcessStep::SkipOnEmpty {
            method: SkipMethod::Row,
            message: Some("no name".to_string()),
        };
        let err = apply(&skip_row, Value::Null).unwrap_err();
        assert!(matches!(err, MigrateError::SkipRow { ref reason, .. } if reason == "no name"));
        assert_eq!(
            apply(&skip_row, json!("x")).unwrap(),
            StepFlow::Continue(json!("x"))
        );
    }
}
