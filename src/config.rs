//! Configuration for mergecache
//!
//! Centralized configuration with sensible defaults.

use serde::{Deserialize, Serialize};

use crate::error::{CacheError, Result};

/// Default fan-out of the ordered index
pub const DEFAULT_DEGREE: usize = 4;

/// Main configuration for a cache instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Index Configuration
    // -------------------------------------------------------------------------
    /// Branching factor handed to the ordered index (minimum 2)
    pub index_degree: usize,

    // -------------------------------------------------------------------------
    // Pending Buffer Configuration
    // -------------------------------------------------------------------------
    /// Number of independently locked buffer partitions.
    /// 1 keeps a single coarse lock over the whole buffer.
    pub buffer_shards: usize,

    // -------------------------------------------------------------------------
    // Merge Configuration
    // -------------------------------------------------------------------------
    /// Capacity of the wake-up channel. Signals beyond this are dropped,
    /// since a queued wake-up already guarantees a full drain.
    pub signal_capacity: usize,

    /// Yield the merge thread after every applied mutation
    pub yield_between_merges: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_degree: DEFAULT_DEGREE,
            buffer_shards: 1,
            signal_capacity: 1 << 10,
            yield_between_merges: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject values the cache cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.index_degree < 2 {
            return Err(CacheError::Config(format!(
                "index_degree must be at least 2, got {}",
                self.index_degree
            )));
        }
        if self.buffer_shards == 0 {
            return Err(CacheError::Config(
                "buffer_shards must be at least 1".to_string(),
            ));
        }
        if self.signal_capacity == 0 {
            return Err(CacheError::Config(
                "signal_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the ordered index degree
    pub fn index_degree(mut self, degree: usize) -> Self {
        self.config.index_degree = degree;
        self
    }

    /// Set the number of buffer partitions
    pub fn buffer_shards(mut self, shards: usize) -> Self {
        self.config.buffer_shards = shards;
        self
    }

    /// Set the wake-up channel capacity
    pub fn signal_capacity(mut self, capacity: usize) -> Self {
        self.config.signal_capacity = capacity;
        self
    }

    /// Enable or disable yielding between merged mutations
    pub fn yield_between_merges(mut self, enabled: bool) -> Self {
        self.config.yield_between_merges = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
