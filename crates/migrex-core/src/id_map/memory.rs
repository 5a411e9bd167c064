use chrono::Utc;
use std::collections::HashMap;

use super::{duplicate_destination, IdMap};
use crate::errors::{ExError, ExErrorKind, ExResult};
use crate::model::{
    DestinationKey, IdList, MapCounts, MapEntry, MessageLevel, RowMessage, RowStatus, SourceKey,
};

/// In-memory identifier map for one migration
///
/// Map order is the order in which source keys were first saved.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdMap {
    migration_id: String,
    forward: HashMap<SourceKey, (u64, MapEntry)>,
    reverse: HashMap<DestinationKey, SourceKey>,
    messages: Vec<RowMessage>,
    next_seq: u64,
}

impl InMemoryIdMap {
    pub fn new(migration_id: impl Into<String>) -> Self {
        Self {
            migration_id: migration_id.into(),
            ..Self::default()
        }
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    fn inconsistent(&self, message: String) -> ExError {
        ExError::new(ExErrorKind::MapConsistency)
            .with_migration_id(self.migration_id.clone())
            .with_message(message)
    }
}

impl IdMap for InMemoryIdMap {
    fn migration_id(&self) -> &str {
        &self.migration_id
    }

    fn get_by_source(&self, key: &SourceKey) -> ExResult<Option<MapEntry>> {
        Ok(self.forward.get(key).map(|(_, entry)| entry.clone()))
    }

    fn get_by_destination(&self, key: &DestinationKey) -> ExResult<Option<MapEntry>> {
        let Some(source_key) = self.reverse.get(key) else {
            return Ok(None);
        };
        match self.forward.get(source_key) {
            Some((_, entry)) if entry.dest_key.as_ref() == Some(key) => Ok(Some(entry.clone())),
            _ => Err(self.inconsistent(format!(
                "reverse index maps {} to {} without a matching forward entry",
                key, source_key
            ))),
        }
    }

    fn save_mapping(
        &mut self,
        source_key: &SourceKey,
        dest_key: Option<&DestinationKey>,
        source_hash: &str,
        status: RowStatus,
    ) -> ExResult<()> {
        if let Some(dest_key) = dest_key {
            if let Some(existing) = self.reverse.get(dest_key) {
                if existing != source_key {
                    return Err(duplicate_destination(
                        &self.migration_id,
                        dest_key,
                        existing,
                        source_key,
                    ));
                }
            }
        }

        let entry = MapEntry {
            source_key: source_key.clone(),
            dest_key: dest_key.cloned(),
            source_hash: source_hash.to_string(),
            status,
            last_imported: Utc::now(),
        };

        let seq = match self.forward.get(source_key) {
            Some((seq, previous)) => {
                if let Some(old) = &previous.dest_key {
                    self.reverse.remove(old);
                }
                *seq
            }
            None => {
                self.next_seq += 1;
                self.next_seq
            }
        };
        if let Some(dest_key) = dest_key {
            self.reverse.insert(dest_key.clone(), source_key.clone());
        }
        self.forward.insert(source_key.clone(), (seq, entry));
        Ok(())
    }

    fn delete(&mut self, key: &SourceKey) -> ExResult<()> {
        if let Some((_, entry)) = self.forward.remove(key) {
            if let Some(dest_key) = entry.dest_key {
                self.reverse.remove(&dest_key);
            }
        }
        self.messages.retain(|m| &m.source_key != key);
        Ok(())
    }

    fn all_keys(&self, filter: Option<&IdList>) -> ExResult<Vec<SourceKey>> {
        let mut keys: Vec<(u64, &SourceKey)> = self
            .forward
            .iter()
            .filter(|(key, _)| filter.map_or(true, |list| list.contains(key)))
            .map(|(key, (seq, _))| (*seq, key))
            .collect();
        keys.sort_by_key(|(seq, _)| *seq);
        Ok(keys.into_iter().map(|(_, key)| key.clone()).collect())
    }

    fn prepare_update(&mut self) -> ExResult<usize> {
        for (_, entry) in self.forward.values_mut() {
            entry.status = RowStatus::NeedsUpdate;
        }
        Ok(self.forward.len())
    }

    fn save_message(
        &mut self,
        key: &SourceKey,
        level: MessageLevel,
        message: &str,
    ) -> ExResult<()> {
        self.messages.push(RowMessage {
            source_key: key.clone(),
            level,
            message: message.to_string(),
        });
        Ok(())
    }

    fn clear_messages(&mut self, key: &SourceKey) -> ExResult<()> {
        self.messages.retain(|m| &m.source_key != key);
        Ok(())
    }

    fn messages(&self, key: Option<&SourceKey>) -> ExResult<Vec<RowMessage>> {
        Ok(self
            .messages
            .iter()
            .filter(|m| key.map_or(true, |k| &m.source_key == k))
            .cloned()
            .collect())
    }

    fn counts(&self) -> ExResult<MapCounts> {
        let mut counts = MapCounts::default();
        for (_, entry) in self.forward.values() {
            counts.record(entry.status);
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(id: i64) -> SourceKey {
        SourceKey::single(id)
    }

    fn dest(id: i64) -> DestinationKey {
        DestinationKey::single(id)
    }

    #[test]
    fn test_forward_and_reverse_lookup_agree() {
        let mut map = InMemoryIdMap::new("m");
        map.save_mapping(&key(1), Some(&dest(10)), "h", RowStatus::Imported)
            .unwrap();

        let by_source = map.get_by_source(&key(1)).unwrap().unwrap();
        let by_dest = map.get_by_destination(&dest(10)).unwrap().unwrap();
        assert_eq!(by_source, by_dest);
    }

    #[test]
    fn test_upsert_moves_reverse_entry() {
        let mut map = InMemoryIdMap::new("m");
        map.save_mapping(&key(1), Some(&dest(10)), "h", RowStatus::Imported)
            .unwrap();
        map.save_mapping(&key(1), Some(&dest(11)), "h2", RowStatus::Imported)
            .unwrap();

        assert!(map.get_by_destination(&dest(10)).unwrap().is_none());
        assert_eq!(
            map.get_by_destination(&dest(11)).unwrap().unwrap().source_key,
            key(1)
        );
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_destination_cannot_map_two_sources() {
        let mut map = InMemoryIdMap::new("m");
        map.save_mapping(&key(1), Some(&dest(10)), "h", RowStatus::Imported)
            .unwrap();
        let err = map
            .save_mapping(&key(2), Some(&dest(10)), "h", RowStatus::Imported)
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::MapConsistency);
        assert!(map.get_by_source(&key(2)).unwrap().is_none());
    }

    #[test]
    fn test_all_keys_keeps_first_save_order_and_filters() {
        let mut map = InMemoryIdMap::new("m");
        for id in [3, 1, 2] {
            map.save_mapping(&key(id), None, "h", RowStatus::Failed)
                .unwrap();
        }
        map.save_mapping(&key(3), Some(&dest(30)), "h", RowStatus::Imported)
            .unwrap();

        assert_eq!(map.all_keys(None).unwrap(), vec![key(3), key(1), key(2)]);
        let filter = IdList::new(vec![key(2), key(3), key(99)]);
        assert_eq!(map.all_keys(Some(&filter)).unwrap(), vec![key(3), key(2)]);
    }

    #[test]
    fn test_delete_absent_key_is_noop_and_clears_messages() {
        let mut map = InMemoryIdMap::new("m");
        map.delete(&key(1)).unwrap();

        map.save_mapping(&key(1), None, "h", RowStatus::Failed)
            .unwrap();
        map.save_message(&key(1), MessageLevel::Error, "bad")
            .unwrap();
        map.delete(&key(1)).unwrap();
        assert!(map.messages(None).unwrap().is_empty());
        assert!(map.is_empty());
    }

    #[test]
    fn test_prepare_update_marks_everything() {
        let mut map = InMemoryIdMap::new("m");
        map.save_mapping(&key(1), Some(&dest(1)), "h", RowStatus::Imported)
            .unwrap();
        map.save_mapping(&key(2), None, "h", RowStatus::Failed)
            .unwrap();

        assert_eq!(map.prepare_update().unwrap(), 2);
        assert_eq!(map.counts().unwrap().needs_update, 2);
    }
}
