//! Two-tier storage shared by the cache façade and the merge worker.

use parking_lot::RwLock;

use crate::buffer::PendingBuffer;
use crate::config::Config;
use crate::index::OrderedIndex;

/// Pending buffer plus ordered index
///
/// ## Lock Order
/// Buffer partition(s) first, index second. Every path that holds both
/// (reads, read-modify-write, drain, flush) follows this order.
pub struct Tiers<I: OrderedIndex> {
    /// Freshest state, authoritative for any key it holds
    buffer: PendingBuffer,

    /// Merged state; written only by the merge worker and by flush
    index: RwLock<I>,
}

impl<I: OrderedIndex> Tiers<I> {
    pub fn new(config: &Config) -> Self {
        Self {
            buffer: PendingBuffer::with_shards(config.buffer_shards),
            index: RwLock::new(I::with_degree(config.index_degree)),
        }
    }

    pub fn buffer(&self) -> &PendingBuffer {
        &self.buffer
    }

    pub fn index(&self) -> &RwLock<I> {
        &self.index
    }

    /// Empty both tiers atomically with respect to every other path
    pub fn clear(&self) {
        let mut shards = self.buffer.lock_all();
        let mut index = self.index.write();
        shards.clear();
        index.clear();
    }
}
