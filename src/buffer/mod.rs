//! Pending Buffer Module
//!
//! Unordered store of mutations that have not yet been merged into the
//! ordered index.
//!
//! ## Responsibilities
//! - Absorb writes in O(1) amortized time
//! - Serve the freshest state for every key it holds
//! - Hand mutations to the merge worker one at a time
//! - Provide per-key exclusive sections for read-modify-write
//!
//! ## Data Structure Choice
//! `HashMap` partitions, each behind a `parking_lot::RwLock`:
//! - A key always maps to the same partition
//! - One partition keeps the classic single coarse lock
//! - More partitions trade memory for less writer contention

mod pending;

pub use pending::{KeyReadGuard, KeyWriteGuard, PendingBuffer, ShardsGuard};

use crate::value::Value;

/// A buffered mutation waiting to be merged
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Insert or replace the key with a live value
    Put(Value),

    /// Remove the key from the index
    Tombstone,
}

impl Mutation {
    /// The live value, or `None` for a tombstone
    pub fn value(&self) -> Option<&Value> {
        match self {
            Mutation::Put(value) => Some(value),
            Mutation::Tombstone => None,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        matches!(self, Mutation::Tombstone)
    }
}
