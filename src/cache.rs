//! Cache Module
//!
//! Public operation surface over the two storage tiers.
//!
//! ## Responsibilities
//! - Route writes into the pending buffer and wake the merge worker
//! - Resolve reads buffer-first, index second
//! - Run read-modify-write operations inside one per-key critical section
//! - Own the cache lifecycle (open, flush, close)

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::buffer::Mutation;
use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::index::{BTreeIndex, OrderedIndex};
use crate::merge::{MergeScheduler, MergeStats};
use crate::tiers::Tiers;
use crate::value::Value;

/// Concurrency-safe in-memory cache
///
/// ## Consistency Model
///
/// - The logical value of a key is its buffered mutation if there is
///   one, else its index entry, else absent.
/// - A write is visible to every reader as soon as it returns, whether or
///   not the merge worker has reached it.
/// - `get_or_set`, `get_and_set`, `inc` and `dec` hold the key's buffer
///   partition exclusively for the whole decision, consulting the index
///   under its own read lock in the middle.
///
/// ## Absent Values
///
/// There is no way to store "nothing": writes take a [`Value`], deletion
/// is [`Cache::del`], and reads return `None` only for absent keys.
///
/// ## Lifecycle
///
/// [`Cache::close`] stops the merge worker. Every operation afterwards
/// returns [`CacheError::Closed`]. Dropping an open cache closes it.
pub struct Cache<I: OrderedIndex = BTreeIndex> {
    /// Cache configuration
    config: Config,

    /// Pending buffer + ordered index
    tiers: Arc<Tiers<I>>,

    /// Background worker folding the buffer into the index
    merger: MergeScheduler,

    /// Set by `close`
    closed: AtomicBool,
}

impl Cache<BTreeIndex> {
    /// Create a cache with the default configuration
    pub fn new() -> Result<Self> {
        Self::open(Config::default())
    }

    /// Create a cache whose index uses the given degree
    pub fn with_degree(degree: usize) -> Result<Self> {
        Self::open(Config::builder().index_degree(degree).build())
    }
}

impl<I: OrderedIndex> Cache<I> {
    /// Create a cache and start its merge worker
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        let tiers = Arc::new(Tiers::new(&config));
        let merger = MergeScheduler::spawn(Arc::clone(&tiers), &config)?;

        tracing::debug!(
            index_degree = config.index_degree,
            buffer_shards = config.buffer_shards,
            "Cache opened"
        );

        Ok(Self {
            config,
            tiers,
            merger,
            closed: AtomicBool::new(false),
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get the value of a key
    ///
    /// Search order:
    /// 1. Pending buffer (a tombstone means absent)
    /// 2. Ordered index, consulted while the buffer partition is still held
    pub fn get(&self, key: &str) -> Result<Option<Value>> {
        self.ensure_open()?;

        let pending = self.tiers.buffer().read_key(key);
        let value = match pending.get() {
            Some(mutation) => mutation.value().cloned(),
            None => self.tiers.index().read().get(key),
        };

        Ok(value)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Set the value of a key
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.write(key, Mutation::Put(value.into()))
    }

    /// Delete a key; deleting an absent key is a no-op
    pub fn del(&self, key: &str) -> Result<()> {
        self.write(key, Mutation::Tombstone)
    }

    /// Return the existing value for `key`, or store `value` if there is none
    ///
    /// The flag is `true` when an existing value was found. A buffered
    /// tombstone counts as absent, so a deleted key is set again.
    pub fn get_or_set(&self, key: &str, value: impl Into<Value>) -> Result<(Value, bool)> {
        self.ensure_open()?;

        let mut pending = self.tiers.buffer().lock_key(key);
        match pending.get() {
            Some(Mutation::Put(existing)) => return Ok((existing.clone(), true)),
            Some(Mutation::Tombstone) => {}
            None => {
                if let Some(existing) = self.tiers.index().read().get(key) {
                    return Ok((existing, true));
                }
            }
        }

        let value = value.into();
        pending.set(Mutation::Put(value.clone()));
        drop(pending);

        self.merger.notify();
        Ok((value, false))
    }

    /// Replace the value of `key` with `transform(current)` and return it
    ///
    /// Absent keys are left alone: `transform` is not called and `None`
    /// is returned.
    ///
    /// `transform` runs while the key's buffer partition is write-locked.
    /// It must not call back into this cache: the lock is not reentrant,
    /// and with a single partition every key shares it, so any such call
    /// deadlocks.
    pub fn get_and_set<F>(&self, key: &str, transform: F) -> Result<Option<Value>>
    where
        F: FnOnce(&Value) -> Value,
    {
        self.update(key, |current| Some(transform(current)))
    }

    /// Add `delta` to an integer value and return the result
    ///
    /// Non-integer values are returned unchanged and nothing is written.
    /// Arithmetic wraps on overflow.
    pub fn inc(&self, key: &str, delta: i64) -> Result<Option<Value>> {
        self.update(key, |current| current.wrapping_offset(delta))
    }

    /// Subtract `delta` from an integer value and return the result
    ///
    /// Same rules as [`Cache::inc`].
    pub fn dec(&self, key: &str, delta: i64) -> Result<Option<Value>> {
        self.update(key, |current| current.wrapping_offset(delta.wrapping_neg()))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Empty both tiers
    ///
    /// Takes every buffer partition, then the index: the same order the
    /// merge worker uses, so a concurrent drain cannot deadlock with it or
    /// resurrect a flushed value.
    pub fn flush(&self) -> Result<()> {
        self.ensure_open()?;
        self.tiers.clear();
        tracing::debug!("Cache flushed");
        Ok(())
    }

    /// Block until every buffered mutation has been merged into the index
    pub fn sync(&self) -> Result<()> {
        self.ensure_open()?;
        self.merger.wait_idle(|| self.tiers.buffer().is_empty())
    }

    /// Stop the merge worker and wait for it to exit
    ///
    /// Mutations still buffered are not merged. A second call returns
    /// [`CacheError::Closed`].
    pub fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(CacheError::Closed);
        }

        let pending = self.tiers.buffer().len();
        let result = self.merger.shutdown();
        tracing::debug!(pending, "Cache closed");
        result
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Look a key up in the ordered index only, ignoring the buffer
    pub fn indexed(&self, key: &str) -> Option<Value> {
        self.tiers.index().read().get(key)
    }

    /// Keys currently merged into the index, in order
    pub fn indexed_keys(&self) -> Vec<String> {
        self.tiers.index().read().keys()
    }

    /// Number of keys in the index
    pub fn index_len(&self) -> usize {
        self.tiers.index().read().len()
    }

    /// Number of mutations waiting to be merged
    pub fn pending_len(&self) -> usize {
        self.tiers.buffer().len()
    }

    /// Merge worker counters
    pub fn stats(&self) -> MergeStats {
        self.merger.stats()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::Closed);
        }
        if self.merger.has_failed() {
            return Err(CacheError::MergeFailed);
        }
        Ok(())
    }

    fn write(&self, key: &str, mutation: Mutation) -> Result<()> {
        self.ensure_open()?;
        self.tiers.buffer().put(key, mutation);
        self.merger.notify();
        Ok(())
    }

    /// Read-modify-write under the key's exclusive buffer section.
    /// `transform` returning `None` leaves the key untouched.
    fn update<F>(&self, key: &str, transform: F) -> Result<Option<Value>>
    where
        F: FnOnce(&Value) -> Option<Value>,
    {
        self.ensure_open()?;

        let mut pending = self.tiers.buffer().lock_key(key);
        let current = match pending.get() {
            Some(mutation) => mutation.value().cloned(),
            None => self.tiers.index().read().get(key),
        };

        let current = match current {
            Some(current) => current,
            None => return Ok(None),
        };

        let next = match transform(&current) {
            Some(next) => next,
            None => return Ok(Some(current)),
        };

        pending.set(Mutation::Put(next.clone()));
        drop(pending);

        self.merger.notify();
        Ok(Some(next))
    }
}
