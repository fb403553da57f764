//! In-memory definition persistence.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use uuid::Uuid;

use crate::domain::definition::Definition;
use crate::evaluation::handler::DefinitionPersister;

/// Definition store backed by a `BTreeMap<uuid, definition>`.
///
/// Saving assigns a uuid on first save and bumps the version on every save.
#[derive(Debug, Default)]
pub struct MemoryDefinitionStore {
    definitions: Mutex<BTreeMap<Uuid, Box<dyn Definition>>>,
}

impl MemoryDefinitionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> anyhow::Result<MutexGuard<'_, BTreeMap<Uuid, Box<dyn Definition>>>> {
        self.definitions
            .lock()
            .map_err(|_| anyhow!("definition store lock poisoned"))
    }
}

impl DefinitionPersister for MemoryDefinitionStore {
    fn save(&self, definition: &dyn Definition) -> anyhow::Result<Box<dyn Definition>> {
        let mut stored = definition.clone_definition();
        let header = stored.header_mut();
        let uuid = *header.uuid.get_or_insert_with(Uuid::new_v4);
        header.version += 1;

        let saved = stored.clone_definition();
        self.lock()?.insert(uuid, stored);
        Ok(saved)
    }

    fn get_by_uuid(&self, uuid: &Uuid) -> anyhow::Result<Option<Box<dyn Definition>>> {
        Ok(self.lock()?.get(uuid).map(|d| d.clone_definition()))
    }

    fn find_by_name(&self, name: &str, exact: bool) -> anyhow::Result<Vec<Box<dyn Definition>>> {
        let needle = name.to_lowercase();
        Ok(self
            .lock()?
            .values()
            .filter(|d| {
                let candidate = d.name().to_lowercase();
                if exact {
                    candidate == needle
                } else {
                    candidate.contains(&needle)
                }
            })
            .map(|d| d.clone_definition())
            .collect())
    }

    fn all(&self) -> anyhow::Result<Vec<Box<dyn Definition>>> {
        Ok(self.lock()?.values().map(|d| d.clone_definition()).collect())
    }

    fn purge(&self, uuid: &Uuid) -> anyhow::Result<bool> {
        Ok(self.lock()?.remove(uuid).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::characteristic::CharacteristicDefinition;
    use crate::builtin::static_set::StaticDefinition;

    #[test]
    fn test_save_assigns_uuid_and_bumps_version() {
        let store = MemoryDefinitionStore::new();
        let saved = store.save(&CharacteristicDefinition::new("Women")).unwrap();
        let uuid = saved.header().uuid.expect("uuid assigned");
        assert_eq!(saved.header().version, 1);

        let resaved = store.save(saved.as_ref()).unwrap();
        assert_eq!(resaved.header().uuid, Some(uuid));
        assert_eq!(resaved.header().version, 2);
        assert_eq!(store.all().unwrap().len(), 1);
    }

    #[test]
    fn test_saved_copy_is_independent_of_caller() {
        let store = MemoryDefinitionStore::new();
        let original = StaticDefinition::new("Pilot", [1, 2]);
        let saved = store.save(&original).unwrap();
        assert!(original.header.uuid.is_none());
        assert_eq!(original.header.version, 0);

        let loaded = store
            .get_by_uuid(&saved.header().uuid.unwrap())
            .unwrap()
            .expect("stored");
        assert_eq!(loaded.configuration().unwrap(), original.configuration().unwrap());
    }

    #[test]
    fn test_find_by_name_exact_and_partial() {
        let store = MemoryDefinitionStore::new();
        store.save(&CharacteristicDefinition::new("Adult Women")).unwrap();
        store.save(&CharacteristicDefinition::new("Women")).unwrap();

        assert_eq!(store.find_by_name("women", true).unwrap().len(), 1);
        assert_eq!(store.find_by_name("WOMEN", false).unwrap().len(), 2);
        assert!(store.find_by_name("men's", false).unwrap().is_empty());
    }

    #[test]
    fn test_purge_removes_definition() {
        let store = MemoryDefinitionStore::new();
        let saved = store.save(&StaticDefinition::new("Pilot", [1])).unwrap();
        let uuid = saved.header().uuid.unwrap();
        assert!(store.purge(&uuid).unwrap());
        assert!(!store.purge(&uuid).unwrap());
        assert!(store.get_by_uuid(&uuid).unwrap().is_none());
    }
}
