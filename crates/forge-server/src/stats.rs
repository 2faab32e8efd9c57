//! Request counters and STATS rendering.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use forge_core::ShardedStore;

/// Monotonic request counters, bumped with relaxed ordering; these are
/// statistics, not synchronization.
#[derive(Debug, Default)]
pub struct Counters {
    pub total_requests: AtomicU64,
    pub total_reads: AtomicU64,
    pub total_writes: AtomicU64,
    pub cache_hits: AtomicU64,
    pub cache_misses: AtomicU64,
}

impl Counters {
    /// Renders the STATS payload: comma-separated `name:number` pairs
    /// in a fixed order, combining request counters with the store's
    /// expiry/eviction totals, its current size, and server uptime.
    pub fn render(&self, store: &ShardedStore, started: Instant) -> String {
        format!(
            "total_requests:{},total_reads:{},total_writes:{},cache_hits:{},\
             cache_misses:{},expired_keys:{},evicted_keys:{},current_keys:{},\
             uptime_seconds:{}",
            self.total_requests.load(Ordering::Relaxed),
            self.total_reads.load(Ordering::Relaxed),
            self.total_writes.load(Ordering::Relaxed),
            self.cache_hits.load(Ordering::Relaxed),
            self.cache_misses.load(Ordering::Relaxed),
            store.expired_keys_count(),
            store.evicted_keys_count(),
            store.size(),
            started.elapsed().as_secs(),
        )
    }
}
