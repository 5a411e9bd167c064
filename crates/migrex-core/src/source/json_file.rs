use serde_json::Value;
use std::path::PathBuf;

use super::{RowIter, SourceReader};
use crate::errors::MigrateError;
use crate::model::{IdField, IdFields, SourceRow};

/// Rows read from a JSON file holding an array of objects
///
/// The file is read again on every pass.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
    ids: IdFields,
}

impl JsonFileSource {
    pub fn new(path: PathBuf, ids: IdFields) -> Self {
        Self { path, ids }
    }

    fn load(&self) -> Result<Vec<Value>, MigrateError> {
        let malformed = |reason: String| MigrateError::Source { reason };
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| malformed(format!("cannot read {}: {}", self.path.display(), e)))?;
        match serde_json::from_str(&text) {
            Ok(Value::Array(rows)) => Ok(rows),
            Ok(_) => Err(malformed(format!(
                "{} does not contain a JSON array",
                self.path.display()
            ))),
            Err(e) => Err(malformed(format!("{}: {}", self.path.display(), e))),
        }
    }
}

impl SourceReader for JsonFileSource {
    fn id_fields(&self) -> &[IdField] {
        self.ids.as_slice()
    }

    fn rows(&self) -> RowIter<'_> {
        let rows = match self.load() {
            Ok(rows) => rows,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };
        Box::new(rows.into_iter().enumerate().map(|(i, row)| match row {
            Value::Object(fields) => SourceRow::from_fields(i, fields, self.ids.as_slice()),
            other => Err(MigrateError::Source {
                reason: format!("row {} is not an object: {}", i, other),
            }),
        }))
    }
}
