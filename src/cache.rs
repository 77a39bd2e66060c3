//! Concurrent memo table for resolved type descriptors.
//!
//! Keyed by the structural content hash of a schema node. A hash match is
//! trusted as a hit without a secondary equality check.

use std::sync::Arc;

use dashmap::DashMap;

use crate::types::Type;

#[derive(Debug, Default)]
pub struct TypeCache {
    entries: DashMap<u64, Arc<Type>>,
}

impl TypeCache {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, key: u64) -> Option<Arc<Type>> {
        self.entries.get(&key).map(|entry| Arc::clone(entry.value()))
    }

    /// First writer wins: a racing insert for the same key keeps the stored
    /// descriptor and returns it.
    pub fn insert(&self, key: u64, ty: Type) -> Arc<Type> {
        let entry = self.entries.entry(key).or_insert_with(|| Arc::new(ty));
        Arc::clone(entry.value())
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn clear(&self) { self.entries.clear() }
}
