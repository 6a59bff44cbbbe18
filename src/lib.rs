//! # mergecache
//!
//! A concurrency-safe, in-process key-value cache with:
//! - A pending buffer that absorbs writes without touching the index
//! - A key-ordered index updated by a single background merge worker
//! - Read-your-write consistency regardless of merge progress
//! - Atomic read-modify-write (get-or-set, get-and-set, inc/dec)
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Cache                                 │
//! │   get · set · del · get_or_set · get_and_set · inc · dec     │
//! └──────────┬──────────────────────────────────┬───────────────┘
//!            │ writes / reads (first)           │ reads (fallback)
//!            ▼                                  ▼
//!   ┌─────────────────┐                ┌─────────────────┐
//!   │ Pending Buffer  │                │  Ordered Index  │
//!   │ (RwLock shards) │                │    (RwLock)     │
//!   └────────┬────────┘                └────────▲────────┘
//!            │ pop_any                          │ apply
//!            └──────────▶ Merge Worker ─────────┘
//!                     (single thread, woken by
//!                      bounded lossy signal)
//! ```
//!
//! ## Example
//!
//! ```
//! use mergecache::{Cache, Value};
//!
//! let cache = Cache::new().unwrap();
//! cache.set("hits", 10).unwrap();
//! assert_eq!(cache.inc("hits", 5).unwrap(), Some(Value::Int(15)));
//! cache.close().unwrap();
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod value;

pub mod buffer;
pub mod index;
pub mod merge;
pub mod tiers;
pub mod cache;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{CacheError, Result};
pub use config::Config;
pub use value::Value;
pub use index::{BTreeIndex, OrderedIndex};
pub use merge::MergeStats;
pub use cache::Cache;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of mergecache
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
