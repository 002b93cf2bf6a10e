//! Output module for crawl reports
//!
//! This module handles:
//! - Mirroring progress messages to the remote status endpoint
//! - Summarizing a finished crawl
//! - Reporting what is currently in the cache

mod remote_log;
pub mod stats;

pub use remote_log::{LoggerError, RemoteLogger};
pub use stats::{
    collect_cache_statistics, print_cache_statistics, print_summary, CrawlSummary, SourceTally,
};
