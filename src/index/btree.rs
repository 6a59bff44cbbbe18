//! BTreeMap-backed ordered index

use std::collections::BTreeMap;

use crate::value::Value;

use super::OrderedIndex;

/// Default ordered index over `std::collections::BTreeMap`
///
/// The std B-tree has a fixed node width, so `degree` is kept for
/// reporting only.
#[derive(Debug, Clone)]
pub struct BTreeIndex {
    /// Sorted storage
    entries: BTreeMap<String, Value>,

    /// Requested fan-out
    degree: usize,
}

impl BTreeIndex {
    /// Fan-out this index was created with
    pub fn degree(&self) -> usize {
        self.degree
    }
}

impl Default for BTreeIndex {
    fn default() -> Self {
        Self::with_degree(crate::config::DEFAULT_DEGREE)
    }
}

impl OrderedIndex for BTreeIndex {
    fn with_degree(degree: usize) -> Self {
        Self {
            entries: BTreeMap::new(),
            degree,
        }
    }

    fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).cloned()
    }

    fn insert_or_replace(&mut self, key: String, value: Value) {
        self.entries.insert(key, value);
    }

    fn delete(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}
