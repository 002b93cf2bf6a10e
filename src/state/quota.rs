use crate::url::{SourceId, Sources};

/// Article counters of one source
#[derive(Debug, Clone, Default)]
struct SourceQuota {
    /// Ceiling on cached articles
    limit: u32,

    /// Articles cached so far in this run
    cached: u32,

    /// Articles dispatched but not yet completed (strict mode only)
    reserved: u32,
}

/// Per-source article quotas
///
/// Counters only ever grow during a run. In the default soft mode only
/// completed writes count, so fetches already in flight when a source
/// reaches its ceiling still land: the overshoot is bounded by the
/// concurrency cap minus one. In strict mode every dispatched article
/// reserves a slot, which makes the ceiling exact.
#[derive(Debug, Clone)]
pub struct QuotaCounters {
    sources: Vec<SourceQuota>,
    strict: bool,
}

impl QuotaCounters {
    /// Creates counters for the given ceilings, indexed by `SourceId`
    pub fn new(limits: impl IntoIterator<Item = u32>, strict: bool) -> Self {
        Self {
            sources: limits
                .into_iter()
                .map(|limit| SourceQuota {
                    limit,
                    ..SourceQuota::default()
                })
                .collect(),
            strict,
        }
    }

    /// Creates counters from the configured sources
    pub fn from_sources(sources: &Sources, strict: bool) -> Self {
        Self::new(sources.iter().map(|s| s.quota), strict)
    }

    /// Returns true if dispatch reserves quota
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Returns true if the source may take another article
    pub fn has_remaining(&self, id: SourceId) -> bool {
        self.sources.get(id.0).map_or(false, |q| {
            let committed = if self.strict {
                q.cached + q.reserved
            } else {
                q.cached
            };
            committed < q.limit
        })
    }

    /// Returns true if at least one source may take another article
    pub fn any_remaining(&self) -> bool {
        (0..self.sources.len()).any(|idx| self.has_remaining(SourceId(idx)))
    }

    /// Reserves a slot for an article about to be fetched (strict mode only)
    pub fn reserve(&mut self, id: SourceId) {
        if self.strict {
            if let Some(q) = self.sources.get_mut(id.0) {
                q.reserved += 1;
            }
        }
    }

    /// Returns a reserved slot after the fetch completed (strict mode only)
    pub fn release(&mut self, id: SourceId) {
        if self.strict {
            if let Some(q) = self.sources.get_mut(id.0) {
                q.reserved = q.reserved.saturating_sub(1);
            }
        }
    }

    /// Records a successfully cached article and returns the new count
    pub fn record_success(&mut self, id: SourceId) -> u32 {
        match self.sources.get_mut(id.0) {
            Some(q) => {
                q.cached += 1;
                q.cached
            }
            None => 0,
        }
    }

    /// Number of articles cached for a source
    pub fn count(&self, id: SourceId) -> u32 {
        self.sources.get(id.0).map_or(0, |q| q.cached)
    }

    /// The ceiling of a source
    pub fn limit(&self, id: SourceId) -> u32 {
        self.sources.get(id.0).map_or(0, |q| q.limit)
    }

    /// Number of tracked sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
