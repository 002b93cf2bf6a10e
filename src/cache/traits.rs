//! Cache store trait and error types
//!
//! This module defines the interface the crawler uses to persist pages and
//! the errors a cache backend can report.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("Cache entry not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Metadata of a single cached page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntryInfo {
    /// The cache key (filename)
    pub key: String,

    /// Size in bytes
    pub size: u64,

    /// Last modification time
    pub modified: DateTime<Utc>,
}

/// Trait for cache backends
///
/// Pages are addressed by the key produced by [`derive_key`](super::derive_key).
/// Implementations must be usable from several in-flight fetches at once.
pub trait CacheStore: Send + Sync {
    /// Writes `bytes` under `key`, replacing any previous content
    fn write(&self, key: &str, bytes: &[u8]) -> CacheResult<()>;

    /// Reads the content stored under `key`
    fn read(&self, key: &str) -> CacheResult<Vec<u8>>;

    /// Returns true if an entry exists under `key`
    fn exists(&self, key: &str) -> bool;

    /// Returns the last modification time of `key`
    fn mtime(&self, key: &str) -> CacheResult<DateTime<Utc>>;

    /// Lists all entries whose key starts with `prefix`, sorted by key
    fn list(&self, prefix: &str) -> CacheResult<Vec<CacheEntryInfo>>;

    /// Removes all entries whose key starts with `prefix`
    ///
    /// Returns the number of removed entries.
    fn remove_prefix(&self, prefix: &str) -> CacheResult<usize>;

    /// Removes every entry
    fn clear(&self) -> CacheResult<usize> {
        self.remove_prefix("")
    }
}
