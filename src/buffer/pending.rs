//! PendingBuffer implementation
//!
//! Hash-partitioned map of pending mutations with RwLock per partition.

use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;
use std::sync::atomic::{AtomicUsize, Ordering};

use indexmap::IndexMap;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::Mutation;

/// Insertion-ordered so the drain can pop from the tail in O(1)
type Shard = IndexMap<String, Mutation>;

/// Buffer of mutations not yet reflected in the ordered index
///
/// ## Concurrency:
/// - Each partition has its own RwLock; a key never changes partition
/// - Per-key atomic sections hold exactly one partition lock
/// - `lock_all` takes every partition in ascending order
pub struct PendingBuffer {
    /// Partitions, selected by key hash
    shards: Box<[RwLock<Shard>]>,

    /// Hasher used for partition selection (fixed per instance)
    hasher: RandomState,

    /// Rotating start point for `pop_any`
    cursor: AtomicUsize,
}

impl PendingBuffer {
    /// Create an empty buffer with a single partition
    pub fn new() -> Self {
        Self::with_shards(1)
    }

    /// Create an empty buffer with `count` partitions (at least one)
    pub fn with_shards(count: usize) -> Self {
        let shards = (0..count.max(1))
            .map(|_| RwLock::new(IndexMap::new()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            shards,
            hasher: RandomState::new(),
            cursor: AtomicUsize::new(0),
        }
    }

    /// Get the buffered mutation for a key (shared lock)
    ///
    /// `None` means the buffer knows nothing about the key and the
    /// caller should fall through to the index.
    pub fn get(&self, key: &str) -> Option<Mutation> {
        self.shard(key).read().get(key).cloned()
    }

    /// Insert or overwrite the mutation for a key (exclusive lock)
    pub fn put(&self, key: impl Into<String>, mutation: Mutation) {
        let key = key.into();
        self.shard(&key).write().insert(key, mutation);
    }

    /// Remove and return an arbitrary entry
    ///
    /// Partitions are scanned starting from a rotating cursor, so every
    /// partition is visited regularly. Within a partition the most
    /// recently inserted key comes out first; callers must not rely on it.
    pub fn pop_any(&self) -> Option<(String, Mutation)> {
        self.pop_any_then(|| ())
            .map(|(key, mutation, ())| (key, mutation))
    }

    /// Remove an arbitrary entry and run `acquire` before the partition
    /// lock is released.
    ///
    /// The merge worker uses this to take the index write lock while the
    /// popped key is still protected, so no reader can observe the key as
    /// missing from both tiers.
    pub fn pop_any_then<G>(&self, acquire: impl FnOnce() -> G) -> Option<(String, Mutation, G)> {
        let count = self.shards.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % count;

        for offset in 0..count {
            let mut shard = self.shards[(start + offset) % count].write();

            if let Some((key, mutation)) = shard.pop() {
                let handoff = acquire();
                drop(shard);
                return Some((key, mutation, handoff));
            }
        }

        None
    }

    /// Shared section over the partition holding `key`
    pub fn read_key<'a>(&'a self, key: &'a str) -> KeyReadGuard<'a> {
        KeyReadGuard {
            key,
            shard: self.shard(key).read(),
        }
    }

    /// Exclusive section over the partition holding `key`
    ///
    /// No other writer can touch `key` until the guard is dropped.
    pub fn lock_key<'a>(&'a self, key: &'a str) -> KeyWriteGuard<'a> {
        KeyWriteGuard {
            key,
            shard: self.shard(key).write(),
        }
    }

    /// Exclusive section over every partition, taken in ascending order
    pub fn lock_all(&self) -> ShardsGuard<'_> {
        ShardsGuard {
            shards: self.shards.iter().map(|shard| shard.write()).collect(),
        }
    }

    /// Number of buffered mutations, tombstones included
    ///
    /// Partitions are read one after another, so under concurrent writes
    /// the result is approximate.
    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.read().is_empty())
    }

    /// Drop every buffered mutation
    pub fn clear(&self) {
        self.lock_all().clear();
    }

    /// Number of partitions
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn shard_index(&self, key: &str) -> usize {
        if self.shards.len() == 1 {
            return 0;
        }
        (self.hasher.hash_one(key) % self.shards.len() as u64) as usize
    }

    fn shard(&self, key: &str) -> &RwLock<Shard> {
        &self.shards[self.shard_index(key)]
    }
}

impl Default for PendingBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared lock on the partition owning one key
pub struct KeyReadGuard<'a> {
    key: &'a str,
    shard: RwLockReadGuard<'a, Shard>,
}

impl KeyReadGuard<'_> {
    /// The buffered mutation for the guarded key
    pub fn get(&self) -> Option<&Mutation> {
        self.shard.get(self.key)
    }
}

/// Exclusive lock on the partition owning one key
pub struct KeyWriteGuard<'a> {
    key: &'a str,
    shard: RwLockWriteGuard<'a, Shard>,
}

impl KeyWriteGuard<'_> {
    /// The buffered mutation for the guarded key
    pub fn get(&self) -> Option<&Mutation> {
        self.shard.get(self.key)
    }

    /// Record a mutation for the guarded key
    pub fn set(&mut self, mutation: Mutation) {
        self.shard.insert(self.key.to_string(), mutation);
    }
}

/// Exclusive lock on every partition
pub struct ShardsGuard<'a> {
    shards: Vec<RwLockWriteGuard<'a, Shard>>,
}

impl ShardsGuard<'_> {
    pub fn clear(&mut self) {
        for shard in self.shards.iter_mut() {
            shard.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|shard| shard.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|shard| shard.is_empty())
    }
}
