use serde_json::{Map, Value};

use super::{RowIter, SourceReader};
use crate::model::{IdField, IdFields, SourceRow};

/// Rows embedded in the migration definition
#[derive(Debug, Clone)]
pub struct EmbeddedDataSource {
    data_rows: Vec<Map<String, Value>>,
    ids: IdFields,
}

impl EmbeddedDataSource {
    pub fn new(data_rows: Vec<Map<String, Value>>, ids: IdFields) -> Self {
        Self { data_rows, ids }
    }
}

impl SourceReader for EmbeddedDataSource {
    fn id_fields(&self) -> &[IdField] {
        self.ids.as_slice()
    }

    fn rows(&self) -> RowIter<'_> {
        Box::new(
            self.data_rows
                .iter()
                .enumerate()
                .map(|(i, fields)| SourceRow::from_fields(i, fields.clone(), self.ids.as_slice())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MigrateError;
    use crate::model::{IdType, SourceKey};
    use serde_json::json;

    fn source(rows: Value) -> EmbeddedDataSource {
        let rows = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect();
        EmbeddedDataSource::new(
            rows,
            IdFields::new(vec![IdField::new("id", IdType::Integer)]),
        )
    }

    #[test]
    fn test_rows_are_restartable_and_ordered() {
        let src = source(json!([{"id": "2"}, {"id": "1"}]));
        let first: Vec<SourceKey> = src.rows().map(|r| r.unwrap().key().clone()).collect();
        let second: Vec<SourceKey> = src.rows().map(|r| r.unwrap().key().clone()).collect();

        assert_eq!(first, vec![SourceKey::single(2), SourceKey::single(1)]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_malformed_row_yields_error_in_place() {
        let src = source(json!([{"id": 1}, {"name": "no id"}]));
        let rows: Vec<_> = src.rows().collect();
        assert!(rows[0].is_ok());
        assert!(matches!(
            rows[1],
            Err(MigrateError::MissingIdField { row_index: 1, .. })
        ));
    }

    #[test]
    fn test_count_reports_malformed_row() {
        assert_eq!(source(json!([{"id": 1}, {"id": 2}])).count().unwrap(), 2);

        let err = source(json!([{"id": 1}, {"name": "no id"}])).count().unwrap_err();
        assert!(matches!(err, MigrateError::MissingIdField { row_index: 1, .. }));
    }
}
