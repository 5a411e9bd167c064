//! Source readers
//!
//! A reader yields an ordered, finite and restartable sequence of rows:
//! every call to `rows()` starts again from the first row.

mod embedded;
mod json_file;

pub use embedded::EmbeddedDataSource;
pub use json_file::JsonFileSource;

use crate::errors::Result;
use crate::model::{IdField, SourceConfig, SourceRow};

/// Lazy row sequence produced by a reader
pub type RowIter<'a> = Box<dyn Iterator<Item = Result<SourceRow>> + 'a>;

pub trait SourceReader: Send + Sync {
    /// Declared identifier fields, in key order
    fn id_fields(&self) -> &[IdField];

    /// Fresh pass over the full dataset in declaration order
    fn rows(&self) -> RowIter<'_>;

    /// Number of rows in the source
    ///
    /// # Errors
    ///
    /// Returns the first `Source` error encountered while reading.
    fn count(&self) -> Result<usize> {
        self.rows().try_fold(0, |n, row| row.map(|_| n + 1))
    }
}

/// Build the reader selected by the source configuration
pub fn from_config(config: &SourceConfig) -> Box<dyn SourceReader> {
    match config {
        SourceConfig::EmbeddedData { data_rows, ids } => {
            Box::new(EmbeddedDataSource::new(data_rows.clone(), ids.clone()))
        }
        SourceConfig::Json { path, ids } => Box::new(JsonFileSource::new(path.clone(), ids.clone())),
    }
}
