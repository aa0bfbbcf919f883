use super::{ProposalOutcome, RejectionReason};
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix prepended to every metric name on export
pub const METRIC_NAME_PREFIX: &str = "artemis.grouping.";

const ACCEPTED: &str = "proposals.accepted";
const REJECTED: &str = "proposals.rejected";
const TIMED_OUT: &str = "proposals.timeouts";
const REAPED: &str = "bindings.reaped";
const CACHE_HITS: &str = "cache.hits";
const CACHE_MISSES: &str = "cache.misses";
const CACHE_PUTS: &str = "cache.puts";

const CANONICAL_NAMES: [&str; 7] = [
    ACCEPTED,
    REJECTED,
    TIMED_OUT,
    REAPED,
    CACHE_HITS,
    CACHE_MISSES,
    CACHE_PUTS,
];

/// Minimal counting capability of a caching component
pub trait Counters {
    /// Records a successful operation
    fn success(&self);
    /// Records a failed operation
    fn failure(&self);
    /// Records a lookup that could be answered from the cache
    fn hit(&self);
    /// Records a lookup that could not be answered from the cache
    fn miss(&self);
    /// Records an insertion into the cache
    fn put(&self);
}

/// Counters kept by a coordinator
///
/// Each coordinator owns its own instance, there is no process-wide state.
#[derive(Debug, Default)]
pub struct GroupingMetrics {
    accepted: AtomicU64,
    rejected: AtomicU64,
    timed_out: AtomicU64,
    reaped: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    cache_puts: AtomicU64,
    exporter: MetricExporter,
}

impl GroupingMetrics {
    /// Creates a new set of counters, all starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts the outcome of a proposal, timeouts count as rejections too
    pub fn record_outcome(&self, outcome: &ProposalOutcome) {
        match outcome.rejection() {
            None => self.success(),
            Some(reason) => {
                if *reason == RejectionReason::Timeout {
                    self.timed_out.fetch_add(1, Ordering::Relaxed);
                }

                self.failure();
            }
        }
    }

    /// Counts bindings evicted by the reaper
    pub fn reaped(&self, count: usize) {
        self.reaped.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Reads all counters at once
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            accepted: self.accepted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            reaped: self.reaped.load(Ordering::Relaxed),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            cache_puts: self.cache_puts.load(Ordering::Relaxed),
        }
    }

    /// Current counter values keyed by their exported name
    pub fn exported(&self) -> Vec<(&str, u64)> {
        self.exporter.export(&self.snapshot())
    }
}

impl Counters for GroupingMetrics {
    fn success(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    fn failure(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    fn hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    fn miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    fn put(&self) {
        self.cache_puts.fetch_add(1, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`GroupingMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Proposals that resulted in a binding
    pub accepted: u64,
    /// Proposals that did not result in a binding
    pub rejected: u64,
    /// Proposals rejected because the authoritative node did not answer in time
    pub timed_out: u64,
    /// Bindings evicted due to inactivity
    pub reaped: u64,
    /// Proposals answered from a cached binding
    pub cache_hits: u64,
    /// Proposals that required a decision
    pub cache_misses: u64,
    /// Bindings stored
    pub cache_puts: u64,
}

impl MetricsSnapshot {
    fn value(&self, canonical: &str) -> u64 {
        match canonical {
            ACCEPTED => self.accepted,
            REJECTED => self.rejected,
            TIMED_OUT => self.timed_out,
            REAPED => self.reaped,
            CACHE_HITS => self.cache_hits,
            CACHE_MISSES => self.cache_misses,
            CACHE_PUTS => self.cache_puts,
            _ => 0,
        }
    }
}

/// Mapping from canonical metric names to the names they are exported under
///
/// The mapping is resolved once on creation.
#[derive(Debug, Clone)]
pub struct MetricExporter {
    names: Vec<(&'static str, String)>,
}

impl MetricExporter {
    /// Creates a new mapping prepending the given prefix to every canonical name
    pub fn new(prefix: &str) -> Self {
        let names = CANONICAL_NAMES
            .iter()
            .map(|canonical| (*canonical, format!("{}{}", prefix, canonical)))
            .collect();

        Self { names }
    }

    /// Exported name of a canonical metric name
    pub fn name_of(&self, canonical: &str) -> Option<&str> {
        self.names
            .iter()
            .find(|(name, _)| *name == canonical)
            .map(|(_, exported)| exported.as_str())
    }

    /// Pairs every exported name with its value from the snapshot
    pub fn export(&self, snapshot: &MetricsSnapshot) -> Vec<(&str, u64)> {
        self.names
            .iter()
            .map(|(canonical, exported)| (exported.as_str(), snapshot.value(canonical)))
            .collect()
    }
}

impl Default for MetricExporter {
    fn default() -> Self {
        Self::new(METRIC_NAME_PREFIX)
    }
}
