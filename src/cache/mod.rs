//! Page cache for fetched articles
//!
//! This module handles everything that touches the cache directory:
//! - Deriving the cache filename of a URL
//! - The `CacheStore` trait and its directory-backed implementation
//! - Per-source cache statistics for the `--stats` report

mod fs_store;
mod key;
mod traits;

pub use fs_store::FsCacheStore;
pub use key::{derive_key, is_valid_key, CACHE_SUFFIX};
pub use traits::{CacheEntryInfo, CacheError, CacheResult, CacheStore};

use chrono::{DateTime, Utc};

/// Summary of the cached pages of one source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceCacheStats {
    /// Number of cached pages
    pub entries: usize,

    /// Modification time of the most recently written page
    pub newest: Option<DateTime<Utc>>,

    /// Total size of all pages in bytes
    pub total_bytes: u64,
}

impl SourceCacheStats {
    /// Minutes since the newest page was written
    pub fn age_minutes(&self, now: DateTime<Utc>) -> Option<i64> {
        self.newest.map(|newest| (now - newest).num_minutes())
    }

    /// Total size in megabytes
    pub fn total_megabytes(&self) -> f64 {
        self.total_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Collects statistics for every cached page whose key starts with `key_prefix`
pub fn source_stats(store: &dyn CacheStore, key_prefix: &str) -> CacheResult<SourceCacheStats> {
    let entries = store.list(key_prefix)?;

    Ok(SourceCacheStats {
        entries: entries.len(),
        newest: entries.iter().map(|e| e.modified).max(),
        total_bytes: entries.iter().map(|e| e.size).sum(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_source_stats() {
        let dir = TempDir::new().unwrap();
        let store = FsCacheStore::open(dir.path()).unwrap();
        store.write("bbc_one.html", &[0u8; 1024]).unwrap();
        store.write("bbc_two.html", &[0u8; 2048]).unwrap();
        store.write("guardian_one.html", b"x").unwrap();

        let stats = source_stats(&store, "bbc_").unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.total_bytes, 3072);
        assert!(stats.newest.is_some());
        assert!(stats.age_minutes(Utc::now()).unwrap() <= 1);
    }

    #[test]
    fn test_source_stats_empty() {
        let dir = TempDir::new().unwrap();
        let store = FsCacheStore::open(dir.path()).unwrap();

        let stats = source_stats(&store, "bbc_").unwrap();
        assert_eq!(stats, SourceCacheStats::default());
        assert_eq!(stats.age_minutes(Utc::now()), None);
        assert_eq!(stats.total_megabytes(), 0.0);
    }
}
