//! Domain model for migration runs

pub mod definition;
pub mod keys;
pub mod map_entry;
pub(crate) mod ordered;
pub mod record;
pub mod row;

pub use definition::{DestinationConfig, MigrationDefinition, SourceConfig};
pub use keys::{DestinationKey, IdField, IdFields, IdList, IdType, KeyValue, SourceKey};
pub use map_entry::{MapCounts, MapEntry, MessageLevel, RowMessage, RowStatus};
pub use record::DestinationRecord;
pub use row::SourceRow;
