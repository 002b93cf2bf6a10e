//! Crawler coordinator - one complete caching run
//!
//! This module wires the pieces of a run together:
//! - Opening (and optionally clearing) the cache directory
//! - Building the HTTP client and remote logger
//! - Seeding the crawl queue and draining it
//! - Reporting the total time locally and remotely

use crate::cache::{CacheStore, FsCacheStore};
use crate::config::Config;
use crate::crawler::build_http_client;
use crate::crawler::queue::CrawlQueue;
use crate::output::{CrawlSummary, RemoteLogger};
use crate::CacherError;
use std::sync::Arc;
use std::time::Instant;

/// Options of a single run, usually taken from the command line
#[derive(Debug, Clone, Default)]
pub struct CrawlOptions {
    /// Remove cached pages before crawling
    pub fresh: bool,

    /// Only crawl the source with this name
    pub only_source: Option<String>,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    store: Arc<FsCacheStore>,
    queue: CrawlQueue,
    logger: RemoteLogger,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// With `fresh`, the cached pages of the crawled sources are removed
    /// first: all of them, or only those of `only_source`.
    ///
    /// # Errors
    ///
    /// Fails if the cache directory cannot be opened or cleared, the HTTP
    /// client cannot be built, or `only_source` names no configured source.
    pub fn new(config: Config, options: CrawlOptions) -> Result<Self, CacherError> {
        let store = Arc::new(FsCacheStore::open(&config.output.cache_dir)?);
        let client = build_http_client(&config.user_agent)?;
        let logger = RemoteLogger::new(client.clone(), config.remote_log.as_ref());

        let mut queue = CrawlQueue::new(
            &config,
            client,
            Arc::clone(&store) as Arc<dyn CacheStore>,
            logger.clone(),
        )?;

        if let Some(name) = &options.only_source {
            queue.restrict_to_source(name)?;
        }

        if options.fresh {
            let removed = match &options.only_source {
                Some(name) => {
                    let prefix = config
                        .source_by_name(name)
                        .map(|source| source.key_prefix.as_str())
                        .ok_or_else(|| CacherError::UnknownSource(name.clone()))?;
                    store.remove_prefix(prefix)?
                }
                None => store.clear()?,
            };
            tracing::info!("Fresh crawl: removed {} cached pages", removed);
        }

        Ok(Self {
            config: Arc::new(config),
            store,
            queue,
            logger,
        })
    }

    pub fn store(&self) -> &FsCacheStore {
        &self.store
    }

    /// Runs the crawl to completion
    ///
    /// Individual page failures are logged and counted; they never end the
    /// run early.
    pub async fn run(&mut self) -> Result<CrawlSummary, CacherError> {
        let start_time = Instant::now();

        tracing::info!(
            "Caching {} sources into {}",
            self.config.sources.len(),
            self.store.root().display()
        );
        self.logger
            .send("[News Cache] Starting to Cache News Files, this could take some time...")
            .await;

        let seeded = self.queue.enqueue_all_seeds();
        tracing::info!("Seeded queue with {} section pages", seeded);

        let summary = self.queue.drain().await;

        let elapsed = start_time.elapsed();
        let message = format!(
            "[News Cache] Total time taken: {:.2} seconds",
            elapsed.as_secs_f64()
        );
        tracing::info!(
            "{} ({} pages cached, {} failures)",
            message,
            summary.pages_cached(),
            summary.total_failures()
        );
        self.logger.send(&message).await;

        Ok(summary)
    }
}

/// Runs one complete caching run
pub async fn run_crawl(config: Config, options: CrawlOptions) -> Result<CrawlSummary, CacherError> {
    let mut coordinator = Coordinator::new(config, options)?;
    coordinator.run().await
}
