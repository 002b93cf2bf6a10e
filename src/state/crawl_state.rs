use crate::state::quota::QuotaCounters;
use crate::url::{strip_scheme, UrlClass};
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL waiting in the crawl queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUrl {
    pub url: Url,
    pub class: UrlClass,
}

/// Mutable state of one crawl run
///
/// Owned by a single `CrawlQueue` and only touched by the task driving it,
/// so none of the fields need locking. Created empty for every run and
/// dropped when the run ends.
#[derive(Debug)]
pub struct CrawlState {
    /// Pages handed to the fetcher; never shrinks
    visited: HashSet<String>,

    /// FIFO of URLs waiting for a fetch slot
    pending: VecDeque<PendingUrl>,

    /// Mirror of `pending` for duplicate checks
    queued: HashSet<String>,

    /// Fetches currently in flight
    active: usize,

    /// Highest value `active` has reached
    peak_active: usize,

    /// Number of URLs dispatched so far
    dequeued: u64,

    /// Per-source article counters
    pub quotas: QuotaCounters,
}

impl CrawlState {
    /// Creates an empty state with the given quota counters
    pub fn new(quotas: QuotaCounters) -> Self {
        Self {
            visited: HashSet::new(),
            pending: VecDeque::new(),
            queued: HashSet::new(),
            active: 0,
            peak_active: 0,
            dequeued: 0,
            quotas,
        }
    }

    /// Returns true if the URL was already dispatched in this run
    pub fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(page_identity(url))
    }

    /// Returns true if the URL is waiting in the queue
    pub fn is_queued(&self, url: &Url) -> bool {
        self.queued.contains(page_identity(url))
    }

    /// Marks a URL as dispatched
    ///
    /// Returns false if it had been dispatched before.
    pub fn mark_visited(&mut self, url: &Url) -> bool {
        self.visited.insert(page_identity(url).to_string())
    }

    /// Appends a URL to the tail of the queue
    ///
    /// Returns false, leaving the queue untouched, if the URL is already
    /// queued or was visited.
    pub fn push(&mut self, pending: PendingUrl) -> bool {
        if self.is_visited(&pending.url)
            || !self.queued.insert(page_identity(&pending.url).to_string())
        {
            return false;
        }
        self.pending.push_back(pending);
        true
    }

    /// Removes the URL at the head of the queue
    pub fn pop(&mut self) -> Option<PendingUrl> {
        let pending = self.pending.pop_front()?;
        self.queued.remove(page_identity(&pending.url));
        Some(pending)
    }

    /// Records the start of a fetch
    pub fn begin_dispatch(&mut self) {
        self.active += 1;
        self.dequeued += 1;
        self.peak_active = self.peak_active.max(self.active);
    }

    /// Records the completion of a fetch, successful or not
    pub fn finish_dispatch(&mut self) {
        self.active = self.active.saturating_sub(1);
    }

    pub fn active(&self) -> usize {
        self.active
    }

    pub fn peak_active(&self) -> usize {
        self.peak_active
    }

    pub fn dequeued(&self) -> u64 {
        self.dequeued
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    /// Returns true when nothing is queued and nothing is in flight
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.active == 0
    }
}

/// The part of a URL that names its cache file
///
/// http and https variants of a page share one cache file, so they count as
/// one page.
fn page_identity(url: &Url) -> &str {
    strip_scheme(url.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::SourceId;

    fn pending(path: &str) -> PendingUrl {
        PendingUrl {
            url: Url::parse(&format!("https://site.example{}", path)).unwrap(),
            class: UrlClass::Article(SourceId(0)),
        }
    }

    fn state() -> CrawlState {
        CrawlState::new(QuotaCounters::new([10], false))
    }

    #[test]
    fn test_new_state_is_idle() {
        let state = state();
        assert!(state.is_idle());
        assert_eq!(state.pending_len(), 0);
        assert_eq!(state.visited_len(), 0);
    }

    #[test]
    fn test_fifo_order() {
        let mut state = state();
        assert!(state.push(pending("/a")));
        assert!(state.push(pending("/b")));

        assert_eq!(state.pop().unwrap().url.path(), "/a");
        assert_eq!(state.pop().unwrap().url.path(), "/b");
        assert!(state.pop().is_none());
    }

    #[test]
    fn test_push_rejects_duplicates() {
        let mut state = state();
        assert!(state.push(pending("/a")));
        assert!(!state.push(pending("/a")));
        assert_eq!(state.pending_len(), 1);
    }

    #[test]
    fn test_push_rejects_visited() {
        let mut state = state();
        let item = pending("/a");
        assert!(state.mark_visited(&item.url));
        assert!(!state.mark_visited(&item.url));
        assert!(!state.push(item));
    }

    #[test]
    fn test_popped_url_can_not_be_requeued_once_visited() {
        let mut state = state();
        state.push(pending("/a"));
        let item = state.pop().unwrap();
        assert!(!state.is_queued(&item.url));
        state.mark_visited(&item.url);
        assert!(!state.push(item));
    }

    #[test]
    fn test_scheme_variants_are_one_page() {
        let mut state = state();
        let https = pending("/a");
        let mut http = https.clone();
        http.url = Url::parse("http://site.example/a").unwrap();

        assert!(state.push(https));
        assert!(state.is_queued(&http.url));
        assert!(!state.push(http.clone()));

        let item = state.pop().unwrap();
        state.mark_visited(&item.url);
        assert!(state.is_visited(&http.url));
        assert!(!state.push(http));
    }

    #[test]
    fn test_dispatch_counters() {
        let mut state = state();
        state.begin_dispatch();
        state.begin_dispatch();
        state.finish_dispatch();
        state.begin_dispatch();

        assert_eq!(state.active(), 2);
        assert_eq!(state.peak_active(), 2);
        assert_eq!(state.dequeued(), 3);

        state.finish_dispatch();
        state.finish_dispatch();
        assert!(state.is_idle());
    }
}
