//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `CrawlState`: visited set, FIFO queue and in-flight counter of one run
//! - `QuotaCounters`: per-source article counters and ceilings

mod crawl_state;
mod quota;

// Re-export main types
pub use crawl_state::{CrawlState, PendingUrl};
pub use quota::QuotaCounters;
