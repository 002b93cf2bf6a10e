//! Bounded crawl queue
//!
//! A FIFO of pending URLs drained by at most `max-concurrent-fetches`
//! in-flight units. The drain loop runs on the calling task: units are polled
//! through a `FuturesUnordered` and their outcomes are applied between
//! awaits, so the visited set, queue, active count and quotas have exactly
//! one writer and need no locking.

use crate::cache::CacheStore;
use crate::config::{Config, CrawlerConfig};
use crate::crawler::rewrite::LinkRewriter;
use crate::crawler::unit::{process_url, UnitContext, UnitError, UnitOutcome};
use crate::output::{CrawlSummary, RemoteLogger, SourceTally};
use crate::state::{CrawlState, PendingUrl, QuotaCounters};
use crate::url::{normalize_url, SourceId, Sources, UrlClass};
use crate::{CacherError, UrlError};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Result of offering a URL to the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended to the tail
    Queued,
    /// Empty or whitespace-only input
    Empty,
    /// Not a parseable http(s) URL
    Invalid,
    /// Carries a fragment marker
    Fragment,
    /// Not an article or seed of a crawled source
    External,
    /// Already dispatched in this run
    AlreadyVisited,
    /// Already waiting in the queue
    AlreadyQueued,
    /// The article's source has reached its quota
    QuotaExhausted,
}

impl EnqueueOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::Queued)
    }

    /// Short name used when tallying drops
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Empty => "empty",
            Self::Invalid => "invalid",
            Self::Fragment => "fragment",
            Self::External => "external",
            Self::AlreadyVisited => "already-visited",
            Self::AlreadyQueued => "already-queued",
            Self::QuotaExhausted => "quota-exhausted",
        }
    }
}

/// What one completed unit reports back to the drain loop
struct Completion {
    url: Url,
    class: UrlClass,
    result: Result<UnitOutcome, UnitError>,
}

fn run_unit(ctx: Arc<UnitContext>, pending: PendingUrl) -> impl Future<Output = Completion> {
    async move {
        let PendingUrl { url, class } = pending;
        let result = process_url(&ctx, url.clone(), class).await;
        Completion { url, class, result }
    }
}

/// Bounded crawl queue for one run
pub struct CrawlQueue {
    ctx: Arc<UnitContext>,
    state: CrawlState,
    logger: RemoteLogger,
    concurrency: usize,
    log_every: u64,
    article_max_age: Option<chrono::Duration>,
    only_source: Option<SourceId>,
    quota_announced: bool,
    summary: CrawlSummary,
    started: Instant,
}

impl CrawlQueue {
    /// Creates an empty queue for the configured sources
    ///
    /// Crawler settings are taken as they are; `validate` is expected to
    /// have run on `config` already.
    pub fn new(
        config: &Config,
        client: Client,
        store: Arc<dyn CacheStore>,
        logger: RemoteLogger,
    ) -> Result<Self, UrlError> {
        let sources = Arc::new(Sources::from_config(config)?);
        Ok(Self::with_sources(&config.crawler, sources, client, store, logger))
    }

    /// Creates an empty queue over an already compiled source table
    pub fn with_sources(
        settings: &CrawlerConfig,
        sources: Arc<Sources>,
        client: Client,
        store: Arc<dyn CacheStore>,
        logger: RemoteLogger,
    ) -> Self {
        let quotas = QuotaCounters::from_sources(&sources, settings.strict_quota);

        let ctx = UnitContext {
            client,
            store,
            rewriter: LinkRewriter::new(Arc::clone(&sources)),
            sources,
            seed_timeout: Duration::from_millis(settings.seed_timeout_ms),
            article_timeout: Duration::from_millis(settings.article_timeout_ms),
        };

        Self {
            ctx: Arc::new(ctx),
            state: CrawlState::new(quotas),
            logger,
            concurrency: settings.max_concurrent_fetches.max(1) as usize,
            log_every: u64::from(settings.log_every.max(1)),
            article_max_age: settings
                .article_max_age_hours
                .and_then(|hours| i64::try_from(hours).ok())
                .map(chrono::Duration::hours),
            only_source: None,
            quota_announced: false,
            summary: CrawlSummary::default(),
            started: Instant::now(),
        }
    }

    /// Limits the crawl to pages of one source
    ///
    /// Links to other sources are still rewritten but never enqueued.
    pub fn restrict_to_source(&mut self, name: &str) -> Result<(), CacherError> {
        let id = self
            .ctx
            .sources
            .by_name(name)
            .map(|source| source.id)
            .ok_or_else(|| CacherError::UnknownSource(name.to_string()))?;
        self.only_source = Some(id);
        Ok(())
    }

    pub fn sources(&self) -> &Sources {
        &self.ctx.sources
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    /// Offers a URL to the queue
    ///
    /// The URL is appended to the tail unless it is empty, malformed,
    /// fragment-bearing, outside the crawled sources, already visited or
    /// queued, or an article of a source whose quota is exhausted. Seeds are
    /// recognized by exact match and never checked against quota.
    ///
    /// Enqueueing does not fetch anything: URLs added while `drain` runs are
    /// picked up by that drain, otherwise by the next call to `drain`.
    pub fn enqueue(&mut self, raw: &str) -> EnqueueOutcome {
        let outcome = self.offer(raw);
        self.tally(outcome);
        outcome
    }

    /// Enqueues a section page of `source`, bypassing quota
    pub fn enqueue_seed(&mut self, url: &str, source: SourceId) -> EnqueueOutcome {
        let outcome = match normalize_url(url) {
            Ok(url) => self.push(url, UrlClass::Seed(source)),
            Err(UrlError::Fragment(_)) => EnqueueOutcome::Fragment,
            Err(_) => EnqueueOutcome::Invalid,
        };
        self.tally(outcome);
        outcome
    }

    /// Enqueues the seeds of every source, or of the restricted one
    pub fn enqueue_all_seeds(&mut self) -> usize {
        let seeds: Vec<(Url, SourceId)> = self
            .ctx
            .sources
            .iter()
            .filter(|source| self.only_source.map_or(true, |only| only == source.id))
            .flat_map(|source| source.seeds.iter().map(move |seed| (seed.clone(), source.id)))
            .collect();

        seeds
            .into_iter()
            .filter(|(seed, id)| self.enqueue_seed(seed.as_str(), *id).is_queued())
            .count()
    }

    fn offer(&mut self, raw: &str) -> EnqueueOutcome {
        let raw = raw.trim();
        if raw.is_empty() {
            return EnqueueOutcome::Empty;
        }

        match normalize_url(raw) {
            Ok(url) => self.offer_url(url),
            Err(UrlError::Fragment(_)) => EnqueueOutcome::Fragment,
            Err(_) => EnqueueOutcome::Invalid,
        }
    }

    fn offer_url(&mut self, url: Url) -> EnqueueOutcome {
        let class = self.ctx.sources.classify_url(&url);

        if let Some(id) = class.source() {
            if self.only_source.map_or(false, |only| only != id) {
                return EnqueueOutcome::External;
            }
        }

        match class {
            UrlClass::External => EnqueueOutcome::External,
            UrlClass::Article(id) if !self.state.quotas.has_remaining(id) => {
                EnqueueOutcome::QuotaExhausted
            }
            _ => self.push(url, class),
        }
    }

    fn push(&mut self, url: Url, class: UrlClass) -> EnqueueOutcome {
        if self.state.is_visited(&url) {
            EnqueueOutcome::AlreadyVisited
        } else if self.state.is_queued(&url) {
            EnqueueOutcome::AlreadyQueued
        } else {
            self.state.push(PendingUrl { url, class });
            EnqueueOutcome::Queued
        }
    }

    fn tally(&mut self, outcome: EnqueueOutcome) {
        if !outcome.is_queued() {
            self.summary.record_drop(outcome.reason());
        }
    }

    /// Drains the queue
    ///
    /// Dispatches URLs in FIFO order while fewer than the concurrency cap are
    /// in flight, applies each completed unit (quota, discovered links), and
    /// returns once the queue is empty and nothing is in flight. Calling it
    /// again after further `enqueue` calls resumes with the same state.
    pub async fn drain(&mut self) -> CrawlSummary {
        let mut in_flight = FuturesUnordered::new();

        loop {
            while self.state.active() < self.concurrency {
                let Some(pending) = self.next_dispatchable() else {
                    break;
                };
                in_flight.push(run_unit(Arc::clone(&self.ctx), pending));
            }

            match in_flight.next().await {
                Some(completion) => {
                    self.state.finish_dispatch();
                    self.complete(completion);
                    tokio::task::yield_now().await;
                }
                None => break,
            }
        }

        self.summary()
    }

    /// Pops URLs until one may be fetched, marking it visited and active
    ///
    /// Articles of exhausted sources are dropped here, and once every source
    /// is exhausted so is everything else still queued. Fresh cached articles
    /// are counted without being fetched.
    fn next_dispatchable(&mut self) -> Option<PendingUrl> {
        while let Some(pending) = self.state.pop() {
            if !self.state.quotas.any_remaining() {
                tracing::debug!("All quotas reached, dropping {}", pending.url);
                self.summary
                    .record_drop(EnqueueOutcome::QuotaExhausted.reason());
                continue;
            }

            if let UrlClass::Article(id) = pending.class {
                if !self.state.quotas.has_remaining(id) {
                    tracing::debug!("Quota reached, dropping {}", pending.url);
                    self.summary
                        .record_drop(EnqueueOutcome::QuotaExhausted.reason());
                    continue;
                }

                if self.is_fresh(&pending) {
                    self.state.mark_visited(&pending.url);
                    self.state.quotas.record_success(id);
                    self.summary.fresh_skipped += 1;
                    tracing::debug!("Still fresh in cache, skipping {}", pending.url);
                    self.announce_if_exhausted();
                    continue;
                }

                self.state.quotas.reserve(id);
            }

            self.state.mark_visited(&pending.url);
            self.state.begin_dispatch();
            self.report_progress();
            return Some(pending);
        }

        None
    }

    fn is_fresh(&self, pending: &PendingUrl) -> bool {
        let (Some(max_age), Some(id)) = (self.article_max_age, pending.class.source()) else {
            return false;
        };

        let key = self.ctx.sources.get(id).cache_key(&pending.url);
        if !self.ctx.store.exists(&key) {
            return false;
        }

        self.ctx
            .store
            .mtime(&key)
            .map_or(false, |modified| Utc::now() - modified < max_age)
    }

    fn report_progress(&self) {
        let dequeued = self.state.dequeued();
        if dequeued % self.log_every == 0 {
            let message = format!(
                "[News Cache] Articles remaining: {}",
                self.state.pending_len()
            );
            tracing::info!("{} ({} fetched or in flight)", message, dequeued);
            self.logger.log(message);
        }
    }

    fn complete(&mut self, completion: Completion) {
        let Completion { url, class, result } = completion;

        if let UrlClass::Article(id) = class {
            self.state.quotas.release(id);
        }

        match result {
            Ok(outcome) => {
                self.summary.bytes_written += outcome.bytes_written as u64;

                match class {
                    UrlClass::Article(id) => {
                        let count = self.state.quotas.record_success(id);
                        self.summary.articles_cached += 1;
                        tracing::info!(
                            "Cached article {}/{} for {}: {}",
                            count,
                            self.state.quotas.limit(id),
                            self.ctx.sources.get(id).label,
                            outcome.title.as_deref().unwrap_or(url.as_str())
                        );
                        self.announce_if_exhausted();
                    }
                    _ => {
                        self.summary.seeds_cached += 1;
                        tracing::info!("Cached section page {}", url);
                    }
                }

                for target in outcome.discovered {
                    let enqueued = self.offer_url(target);
                    self.tally(enqueued);
                }
            }
            Err(e) => {
                tracing::warn!("Failed to cache {}: {}", url, e);
                self.summary.record_failure(e.kind());
            }
        }
    }

    fn announce_if_exhausted(&mut self) {
        if self.quota_announced || self.state.quotas.any_remaining() {
            return;
        }

        self.quota_announced = true;
        let message = "[News Cache] Reached article limit for every source.";
        tracing::info!("{}", message);
        self.logger.log(message);
    }

    /// Counters of the run so far
    pub fn summary(&self) -> CrawlSummary {
        let mut summary = self.summary.clone();
        summary.per_source = self
            .ctx
            .sources
            .iter()
            .map(|source| SourceTally {
                name: source.name.clone(),
                label: source.label.clone(),
                cached: self.state.quotas.count(source.id),
                quota: source.quota,
            })
            .collect();
        summary.peak_active = self.state.peak_active();
        summary.dequeued = self.state.dequeued();
        summary.elapsed = self.started.elapsed();
        summary
    }
}
