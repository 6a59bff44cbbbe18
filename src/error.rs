//! Error types for mergecache
//!
//! The cache performs no I/O, so the taxonomy is small: lifecycle
//! violations, a failed merge worker, and invalid configuration.

use thiserror::Error;

/// Result type alias using CacheError
pub type Result<T> = std::result::Result<T, CacheError>;

/// Unified error type for cache operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    // -------------------------------------------------------------------------
    // Lifecycle Errors
    // -------------------------------------------------------------------------
    #[error("Cache is closed")]
    Closed,

    // -------------------------------------------------------------------------
    // Merge Errors
    // -------------------------------------------------------------------------
    #[error("Merge worker failed; the ordered index can no longer be trusted")]
    MergeFailed,

    #[error("Failed to spawn merge worker: {0}")]
    Spawn(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}
