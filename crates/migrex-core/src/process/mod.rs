//! Process pipeline
//!
//! Turns a source row into a destination record by applying the declared
//! field rules in order. Processing is a pure function of the row and the
//! mapping.

pub mod steps;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::Result;
use crate::model::{DestinationRecord, SourceRow};
pub use steps::{Callable, ProcessStep, SkipMethod};
use steps::StepFlow;

/// Rule producing one destination field
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ProcessRule {
    /// Shorthand for a single `get` of the named source field
    Copy(String),
    /// Steps applied in sequence
    Steps(Vec<ProcessStep>),
    Step(ProcessStep),
}

impl ProcessRule {
    /// Expand the rule into its step chain
    pub fn into_steps(self) -> Vec<ProcessStep> {
        match self {
            ProcessRule::Copy(source) => vec![ProcessStep::Get { source }],
            ProcessRule::Steps(steps) => steps,
            ProcessRule::Step(step) => vec![step],
        }
    }
}

/// Destination field -> rule, in declaration order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FieldMapping(Vec<(String, ProcessRule)>);

impl FieldMapping {
    pub fn new(rules: Vec<(String, ProcessRule)>) -> Self {
        Self(rules)
    }

    /// Direct copy of each `(destination, source)` pair
    pub fn copy<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(dest, source)| (dest.to_string(), ProcessRule::Copy(source.to_string())))
                .collect(),
        )
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(field, _)| field.as_str())
    }

    pub fn rules(&self) -> &[(String, ProcessRule)] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for FieldMapping {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        crate::model::ordered::deserialize_ordered(deserializer).map(Self)
    }
}

/// Compiled field mapping, built once per migration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessPipeline {
    rules: Vec<(String, Vec<ProcessStep>)>,
}

impl ProcessPipeline {
    pub fn new(mapping: &FieldMapping) -> Self {
        Self {
            rules: mapping
                .rules()
                .iter()
                .map(|(field, rule)| (field.clone(), rule.clone().into_steps()))
                .collect(),
        }
    }

    /// Transform a row into a destination record
    ///
    /// # Errors
    ///
    /// Returns `Process` when a required field is absent or a step rejects
    /// its input, and `SkipRow` when a step asks for the row to be ignored.
    pub fn process(&self, row: &SourceRow) -> Result<DestinationRecord> {
        let mut record = DestinationRecord::new();
        for (field, steps) in &self.rules {
            let mut value = Value::Null;
            let mut keep = true;
            for step in steps {
                match step.apply(std::mem::take(&mut value), row, &record, field)? {
                    StepFlow::Continue(next) => value = next,
                    StepFlow::StopField => {
                        keep = false;
                        break;
                    }
                }
            }
            if keep {
                record.set(field.clone(), value);
            }
        }
        Ok(record)
    }
}

/// Process a row against a mapping without keeping the compiled pipeline
///
/// # Errors
///
/// See [`ProcessPipeline::process`].
pub fn process(row: &SourceRow, mapping: &FieldMapping) -> Result<DestinationRecord> {
    ProcessPipeline::new(mapping).process(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MigrateError;
    use crate::model::{IdField, IdType};
    use serde_json::json;

    fn row(value: Value) -> SourceRow {
        let fields = match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        SourceRow::from_fields(0, fields, &[IdField::new("id", IdType::Integer)]).unwrap()
    }

    #[test]
    fn test_direct_copy_mapping() {
        let mapping = FieldMapping::copy([("vid", "id"), ("name", "name"), ("weight", "weight")]);
        let record =
            process(&row(json!({"id": "1", "name": "categories", "weight": "2"})), &mapping)
                .unwrap();

        assert_eq!(record.get("vid"), Some(&json!("1")));
        assert_eq!(record.get("name"), Some(&json!("categories")));
        assert_eq!(record.get("weight"), Some(&json!("2")));
    }

    #[test]
    fn test_missing_source_field_names_destination_field() {
        let mapping = FieldMapping::copy([("label", "title")]);
        let err = process(&row(json!({"id": 1})), &mapping).unwrap_err();
        assert_eq!(
            err,
            MigrateError::Process {
                field: "label".to_string(),
                cause: "source field 'title' is missing".to_string(),
            }
        );
    }

    #[test]
    fn test_chained_steps_and_destination_reference() {
        // Parsed from text so the declared field order is kept.
        let mapping: FieldMapping = serde_json::from_str(
            r#"{
                "name": [
                    {"plugin": "get", "source": "name"},
                    {"plugin": "callback", "callable": "trim"},
                    {"plugin": "callback", "callable": "lowercase"}
                ],
                "machine_name": {"plugin": "get", "source": "@name"},
                "description": [
                    {"plugin": "get", "source": "description"},
                    {"plugin": "skip_on_empty", "method": "process"}
                ]
            }"#,
        )
        .unwrap();

        let record = process(
            &row(json!({"id": 1, "name": "  Tags ", "description": ""})),
            &mapping,
        )
        .unwrap();

        assert_eq!(record.get("name"), Some(&json!("tags")));
        assert_eq!(record.get("machine_name"), Some(&json!("tags")));
        assert!(!record.contains("description"));
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let mapping = FieldMapping::copy([("vid", "id")]);
        let pipeline = ProcessPipeline::new(&mapping);
        let source = row(json!({"id": 5}));
        assert_eq!(
            pipeline.process(&source).unwrap(),
            pipeline.process(&source).unwrap()
        );
    }
}
