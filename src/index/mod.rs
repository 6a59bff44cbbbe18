//! Ordered Index Module
//!
//! Key-ordered map that the merge worker folds buffered mutations into.
//!
//! ## Responsibilities
//! - O(log n) point lookup, insert-or-replace and delete
//! - Keys compared lexicographically
//! - No internal locking: the cache owns the lock around the index
//!
//! Any sorted map can back the cache by implementing [`OrderedIndex`].
//! [`BTreeIndex`] is the default.

mod btree;

pub use btree::BTreeIndex;

use crate::value::Value;

/// Sorted key → value map consumed by the cache
///
/// Implementations are not required to be internally synchronized; the
/// cache serializes writers and shares readers through an outer RwLock.
pub trait OrderedIndex: Send + Sync + 'static {
    /// Create an empty index with the given fan-out
    fn with_degree(degree: usize) -> Self
    where
        Self: Sized;

    /// Look up a key
    fn get(&self, key: &str) -> Option<Value>;

    /// Insert the key, replacing any previous value
    fn insert_or_replace(&mut self, key: String, value: Value);

    /// Remove the key; no-op when absent
    fn delete(&mut self, key: &str);

    /// Number of keys held
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every key
    fn clear(&mut self);

    /// All keys in ascending order (diagnostics and tests)
    fn keys(&self) -> Vec<String>;
}
