//! Crawl summaries and cache statistics
//!
//! This module collects the counters of a finished crawl and prints them,
//! along with the per-source view of the cache directory used by `--stats`.

use crate::cache::{source_stats, CacheResult, CacheStore, SourceCacheStats};
use crate::config::Config;
use chrono::Utc;
use std::collections::BTreeMap;
use std::time::Duration;

/// Articles cached for one source during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTally {
    pub name: String,
    pub label: String,
    pub cached: u32,
    pub quota: u32,
}

/// Summary statistics for a crawl
#[derive(Debug, Clone, Default)]
pub struct CrawlSummary {
    // Pages written to the cache
    pub seeds_cached: u64,
    pub articles_cached: u64,
    pub bytes_written: u64,

    /// Articles still fresh in the cache, not re-fetched
    pub fresh_skipped: u64,

    /// Failed units by kind ("timeout", "http", ...)
    pub failures: BTreeMap<&'static str, u64>,

    /// URLs refused at enqueue or dispatch, by reason
    pub drops: BTreeMap<&'static str, u64>,

    pub per_source: Vec<SourceTally>,

    /// Highest number of fetches in flight at once
    pub peak_active: usize,

    /// URLs dispatched to the fetcher
    pub dequeued: u64,

    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Pages written to the cache during the run
    pub fn pages_cached(&self) -> u64 {
        self.seeds_cached + self.articles_cached
    }

    pub fn total_failures(&self) -> u64 {
        self.failures.values().sum()
    }

    pub fn total_drops(&self) -> u64 {
        self.drops.values().sum()
    }

    pub fn record_failure(&mut self, kind: &'static str) {
        *self.failures.entry(kind).or_default() += 1;
    }

    pub fn record_drop(&mut self, reason: &'static str) {
        *self.drops.entry(reason).or_default() += 1;
    }

    /// Count of cached articles for a source, by name
    pub fn cached_for(&self, name: &str) -> Option<u32> {
        self.per_source
            .iter()
            .find(|tally| tally.name == name)
            .map(|tally| tally.cached)
    }
}

/// Prints a crawl summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    println!("=== Crawl Summary ===\n");

    println!("Overview:");
    println!(
        "  Pages cached: {} ({} section pages, {} articles)",
        summary.pages_cached(),
        summary.seeds_cached,
        summary.articles_cached
    );
    println!("  Still fresh, skipped: {}", summary.fresh_skipped);
    println!(
        "  Bytes written: {:.2} MB",
        summary.bytes_written as f64 / (1024.0 * 1024.0)
    );
    println!("  URLs dispatched: {}", summary.dequeued);
    println!("  Peak concurrent fetches: {}", summary.peak_active);
    println!("  Elapsed: {:.1}s", summary.elapsed.as_secs_f64());
    println!();

    println!("Articles by Source:");
    for tally in &summary.per_source {
        println!("  {}: {} / {}", tally.label, tally.cached, tally.quota);
    }
    println!();

    if !summary.failures.is_empty() {
        println!("Failures ({}):", summary.total_failures());
        for (kind, count) in &summary.failures {
            println!("  {}: {}", kind, count);
        }
        println!();
    }

    if !summary.drops.is_empty() {
        println!("Dropped URLs ({}):", summary.total_drops());
        for (reason, count) in &summary.drops {
            println!("  {}: {}", reason, count);
        }
        println!();
    }
}

/// Collects cache statistics for every configured source, in config order
pub fn collect_cache_statistics(
    config: &Config,
    store: &dyn CacheStore,
) -> CacheResult<Vec<(String, SourceCacheStats)>> {
    config
        .sources
        .iter()
        .map(|source| {
            source_stats(store, &source.key_prefix)
                .map(|stats| (source.display_name().to_string(), stats))
        })
        .collect()
}

/// Prints per-source cache statistics to stdout
pub fn print_cache_statistics(config: &Config, store: &dyn CacheStore) -> CacheResult<()> {
    let now = Utc::now();

    println!("=== Cache Statistics ===\n");

    for (label, stats) in collect_cache_statistics(config, store)? {
        println!("{}:", label);
        println!("  Cached pages: {}", stats.entries);
        match stats.age_minutes(now) {
            Some(age) => println!("  Last updated: {} minutes ago", age),
            None => println!("  Last updated: never"),
        }
        println!("  Size: {:.2} MB", stats.total_megabytes());
        println!();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::FsCacheStore;
    use crate::config::{CrawlerConfig, OutputConfig, SourceConfig, UserAgentConfig};
    use tempfile::TempDir;

    fn source(name: &str) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            label: Some(name.to_uppercase()),
            base_url: format!("https://{}.example/", name),
            domains: vec![format!("{}.example", name)],
            follow_prefixes: vec![],
            key_prefix: format!("{}_", name),
            serve_path: format!("/{}", name),
            quota: 5,
            seeds: vec![format!("https://{}.example/", name)],
        }
    }

    #[test]
    fn test_summary_totals() {
        let mut summary = CrawlSummary {
            seeds_cached: 2,
            articles_cached: 7,
            ..CrawlSummary::default()
        };
        summary.record_failure("timeout");
        summary.record_failure("timeout");
        summary.record_failure("http");
        summary.record_drop("quota-exhausted");

        assert_eq!(summary.pages_cached(), 9);
        assert_eq!(summary.total_failures(), 3);
        assert_eq!(summary.failures.get("timeout"), Some(&2));
        assert_eq!(summary.total_drops(), 1);
    }

    #[test]
    fn test_cached_for() {
        let summary = CrawlSummary {
            per_source: vec![SourceTally {
                name: "bbc".to_string(),
                label: "BBC News".to_string(),
                cached: 4,
                quota: 20,
            }],
            ..CrawlSummary::default()
        };

        assert_eq!(summary.cached_for("bbc"), Some(4));
        assert_eq!(summary.cached_for("guardian"), None);
    }

    #[test]
    fn test_collect_cache_statistics() {
        let dir = TempDir::new().unwrap();
        let store = FsCacheStore::open(dir.path()).unwrap();
        store.write("alpha_a.html", b"12345").unwrap();
        store.write("alpha_b.html", b"123").unwrap();
        store.write("beta_a.html", b"1").unwrap();

        let config = Config {
            crawler: CrawlerConfig::default(),
            user_agent: UserAgentConfig {
                crawler_name: "TestCacher".to_string(),
                crawler_version: "1.0".to_string(),
                contact_url: None,
            },
            output: OutputConfig {
                cache_dir: dir.path().display().to_string(),
            },
            remote_log: None,
            sources: vec![source("alpha"), source("beta"), source("gamma")],
        };

        let stats = collect_cache_statistics(&config, &store).unwrap();

        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].0, "ALPHA");
        assert_eq!(stats[0].1.entries, 2);
        assert_eq!(stats[0].1.total_bytes, 8);
        assert_eq!(stats[1].1.entries, 1);
        assert_eq!(stats[2].1, SourceCacheStats::default());
    }
}
