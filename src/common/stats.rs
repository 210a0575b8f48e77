use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of a reader's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// Range fetches issued for page reads
    pub total_requests: u64,
    /// Bytes received by range fetches; cache-served bytes never count
    pub total_bytes: u64,
    /// Size-discovery requests (HEAD and one-byte ranged probes)
    pub probe_requests: u64,
    /// Page lookups served from the cache
    pub cache_hits: u64,
    /// Page lookups that needed a fetch (or joined one in flight)
    pub cache_misses: u64,
}

impl Stats {
    /// Fraction of page lookups served from cache, 0.0 when nothing was read.
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

/// StatsCollector accumulates counters for a single file handle.
/// Owned by the reader and shared with its fetcher; never process-global.
#[derive(Debug, Default)]
pub struct StatsCollector {
    total_requests: AtomicU64,
    total_bytes: AtomicU64,
    probe_requests: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one network request that transferred `bytes` bytes.
    pub fn record_request(&self, bytes: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Records one size-discovery request. Kept apart from the read
    /// counters so they only reflect bytes fetched for reads.
    pub fn record_probe(&self) {
        self.probe_requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    pub fn probe_requests(&self) -> u64 {
        self.probe_requests.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Stats {
        Stats {
            total_requests: self.total_requests(),
            total_bytes: self.total_bytes(),
            probe_requests: self.probe_requests(),
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
        }
    }
}
