//! Destination writer contract
//!
//! The writer owns the lifecycle of destination entities but knows nothing
//! about source rows; the identifier map alone records the correspondence.

mod memory;

pub use memory::InMemoryDestination;

use crate::errors::{ExError, ExErrorKind, ExResult};
use crate::model::{DestinationKey, DestinationRecord, KeyValue};

/// Result of a delete call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// Nothing to delete; not an error so that delete can be retried
    NotFound,
}

pub trait DestinationWriter {
    /// Entity kind this writer persists
    fn kind(&self) -> &str;

    /// Persist a new entity and return its key
    ///
    /// # Errors
    ///
    /// Returns an error if the entity cannot be written.
    fn create(&mut self, record: &DestinationRecord) -> ExResult<DestinationKey>;

    /// Replace the entity stored under `key`
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no entity exists under `key`.
    fn update(&mut self, key: &DestinationKey, record: &DestinationRecord) -> ExResult<()>;

    /// Remove the entity stored under `key`
    ///
    /// # Errors
    ///
    /// Returns an error only if the store itself fails; an absent key is
    /// reported as [`DeleteOutcome::NotFound`].
    fn delete(&mut self, key: &DestinationKey) -> ExResult<DeleteOutcome>;
}

/// Read the destination key out of `key_field` of a record
///
/// # Errors
///
/// Returns `InvalidInput` if the field is absent or not a scalar.
pub fn key_from_record(
    kind: &str,
    key_field: &str,
    record: &DestinationRecord,
) -> ExResult<DestinationKey> {
    record
        .get(key_field)
        .and_then(KeyValue::from_json_untyped)
        .map(|value| DestinationKey::new(vec![value]))
        .ok_or_else(|| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op("destination_create")
                .with_message(format!(
                    "{} record has no usable value for key field '{}'",
                    kind, key_field
                ))
        })
}
