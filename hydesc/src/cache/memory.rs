use dashmap::DashMap;

use crate::{cache::SharedCache, description::TypeDescription, utils::error::HyResult};

/// In-process shared backend.
///
/// Wrap it in an `Arc` and hand it to several describers so that they share
/// their descriptions.
#[derive(Debug, Default)]
pub struct MemorySharedCache {
    entries: DashMap<String, TypeDescription>,
}

impl MemorySharedCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SharedCache for MemorySharedCache {
    fn exists(&self) -> bool {
        true
    }

    fn has(&self, key: &str) -> HyResult<bool> {
        Ok(self.entries.contains_key(key))
    }

    fn get(&self, key: &str) -> HyResult<Option<TypeDescription>> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    fn put(&self, key: &str, value: &TypeDescription) -> HyResult<()> {
        self.entries.insert(key.to_string(), value.clone());
        Ok(())
    }
}
