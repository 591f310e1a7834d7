use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::collection::MemoryCollection;

/// In-process document store holding any number of named collections.
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Arc<MemoryCollection>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
        }
    }

    /// Handle to a collection, created empty on first use.
    pub fn collection(&self, name: &str) -> Arc<MemoryCollection> {
        if let Some(existing) = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return existing.clone();
        }

        let mut collections = self
            .collections
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        collections
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(MemoryCollection::new(name)))
            .clone()
    }

    pub fn collection_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collections
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn drop_collection(&self, name: &str) -> bool {
        self.collections
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
