//! Crawler module for fetching and caching news pages
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with per-class timeouts
//! - HTML link extraction and in-place link rewriting
//! - The bounded crawl queue and its fetch units
//! - Overall run coordination

mod coordinator;
mod fetcher;
mod parser;
mod queue;
mod rewrite;
mod unit;

pub use coordinator::{run_crawl, Coordinator, CrawlOptions};
pub use fetcher::{build_http_client, fetch_page, FetchError, FetchedPage};
pub use parser::{extract_hrefs, extract_title, parse_html, ParsedPage};
pub use queue::{CrawlQueue, EnqueueOutcome};
pub use rewrite::{LinkRewriter, RewriteDecision};
pub use unit::{process_url, UnitContext, UnitError, UnitOutcome};

use crate::config::Config;
use crate::output::CrawlSummary;
use crate::CacherError;

/// Runs a complete caching run over every configured source
///
/// This is the main entry point for library users. It will:
/// 1. Open the cache directory
/// 2. Build the HTTP client and remote logger
/// 3. Seed the queue with every section page
/// 4. Fetch, rewrite and cache pages until the queue is drained
pub async fn crawl(config: Config) -> Result<CrawlSummary, CacherError> {
    run_crawl(config, CrawlOptions::default()).await
}
