use parking_lot::Mutex;
use serde::Serialize;

/// Usage statistics of one cache manager.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_items: u64,
    pub total_size: u64,
    pub hit_count: u64,
    pub miss_count: u64,
    /// `hit_count / (hit_count + miss_count)`, `0.0` before the first read.
    pub hit_rate: f64,
    pub eviction_count: u64,
    /// Time of the last `cleanup()` pass, unix milliseconds. `0` if none ran yet.
    pub last_cleanup: i64,
    /// Smoothed `get` latency in milliseconds.
    pub memory_usage: f64,
    /// Smoothed `set` latency in milliseconds.
    pub storage_usage: f64,
}

#[derive(Debug, Default)]
struct Counters {
    hits: u64,
    misses: u64,
    evictions: u64,
    last_cleanup: i64,
    get_latency_ms: f64,
    set_latency_ms: f64,
}

/// Counter state shared by all operations of a manager.
#[derive(Debug, Default)]
pub(crate) struct StatsTracker {
    counters: Mutex<Counters>,
}

/// Latency smoothing: the new value is the mean of the old value and the sample.
fn halve(old: f64, sample_ms: f64) -> f64 {
    (old + sample_ms) / 2.0
}

impl StatsTracker {
    pub(crate) fn record_hit(&self) {
        self.counters.lock().hits += 1;
    }

    pub(crate) fn record_miss(&self) {
        self.counters.lock().misses += 1;
    }

    pub(crate) fn record_evictions(&self, count: u64) {
        self.counters.lock().evictions += count;
    }

    pub(crate) fn record_cleanup(&self, at_ms: i64) {
        self.counters.lock().last_cleanup = at_ms;
    }

    pub(crate) fn record_get_latency(&self, sample_ms: f64) {
        let mut counters = self.counters.lock();
        counters.get_latency_ms = halve(counters.get_latency_ms, sample_ms);
    }

    pub(crate) fn record_set_latency(&self, sample_ms: f64) {
        let mut counters = self.counters.lock();
        counters.set_latency_ms = halve(counters.set_latency_ms, sample_ms);
    }

    pub(crate) fn reset(&self) {
        *self.counters.lock() = Counters::default();
    }

    /// Snapshot the counters, combined with the store's current item count and byte usage.
    pub(crate) fn snapshot(&self, total_items: u64, total_size: u64) -> CacheStats {
        let counters = self.counters.lock();
        let reads = counters.hits + counters.misses;
        let hit_rate = if reads == 0 {
            0.0
        } else {
            counters.hits as f64 / reads as f64
        };

        CacheStats {
            total_items,
            total_size,
            hit_count: counters.hits,
            miss_count: counters.misses,
            hit_rate,
            eviction_count: counters.evictions,
            last_cleanup: counters.last_cleanup,
            memory_usage: counters.get_latency_ms,
            storage_usage: counters.set_latency_ms,
        }
    }
}
