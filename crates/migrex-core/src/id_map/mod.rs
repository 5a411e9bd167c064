//! Identifier map contract
//!
//! One map instance owns the entries of exactly one migration id. Forward
//! (source key) and reverse (destination key) lookups must always agree.

mod memory;

pub use memory::InMemoryIdMap;

use crate::errors::ExResult;
use crate::model::{
    DestinationKey, IdList, MapCounts, MapEntry, MessageLevel, RowMessage, RowStatus, SourceKey,
};

pub trait IdMap {
    /// Migration whose entries this map holds
    fn migration_id(&self) -> &str;

    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn get_by_source(&self, key: &SourceKey) -> ExResult<Option<MapEntry>>;

    /// # Errors
    ///
    /// Returns `MapConsistency` if the reverse index points at a missing
    /// forward entry.
    fn get_by_destination(&self, key: &DestinationKey) -> ExResult<Option<MapEntry>>;

    /// Insert or overwrite the entry for `source_key`
    ///
    /// # Errors
    ///
    /// Returns `MapConsistency` if `dest_key` is already mapped from another
    /// source key.
    fn save_mapping(
        &mut self,
        source_key: &SourceKey,
        dest_key: Option<&DestinationKey>,
        source_hash: &str,
        status: RowStatus,
    ) -> ExResult<()>;

    /// Remove the entry and its messages; absent keys are a no-op
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn delete(&mut self, key: &SourceKey) -> ExResult<()>;

    /// Tracked source keys in map order, optionally restricted to `filter`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn all_keys(&self, filter: Option<&IdList>) -> ExResult<Vec<SourceKey>>;

    /// Mark every entry `NeedsUpdate`, returning how many were marked
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn prepare_update(&mut self) -> ExResult<usize>;

    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn save_message(&mut self, key: &SourceKey, level: MessageLevel, message: &str)
        -> ExResult<()>;

    /// Drop the messages recorded for one row
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn clear_messages(&mut self, key: &SourceKey) -> ExResult<()>;

    /// Messages for one row, or for every row when `key` is `None`
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn messages(&self, key: Option<&SourceKey>) -> ExResult<Vec<RowMessage>>;

    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn counts(&self) -> ExResult<MapCounts>;
}

pub(crate) fn duplicate_destination(
    migration_id: &str,
    dest_key: &DestinationKey,
    existing: &SourceKey,
    incoming: &SourceKey,
) -> crate::errors::ExError {
    crate::errors::ExError::new(crate::errors::ExErrorKind::MapConsistency)
        .with_op("save_mapping")
        .with_migration_id(migration_id)
        .with_source_key(incoming.to_string())
        .with_dest_key(dest_key.to_string())
        .with_message(format!(
            "destination already mapped from source key {}",
            existing
        ))
}
