//! Process-local cache performance metrics.
//!
//! All counters and latency sums live behind a single mutex; every
//! operation is O(1). The registry is constructed once at startup and
//! handed to the orchestrator and the stats endpoint.


use std::collections::BTreeMap;

use parking_lot::Mutex;
use serde::Serialize;

use crate::classifier::{QueryClass, Topic};

#[derive(Debug, Default)]
struct MetricsInner {
    total_queries: u64,
    cache_hits: u64,
    cache_misses: u64,
    backend_calls: u64,
    errors: u64,

    total_latency_ms: f64,
    cache_latency_ms: f64,
    backend_latency_ms: f64,

    time_sensitive_queries: u64,
    evergreen_queries: u64,

    topics: BTreeMap<&'static str, u64>,
}

/// Concurrent-safe metrics registry.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    inner: Mutex<MetricsInner>,
}

/// Latency averages by terminal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatencyStats {
    /// Average end-to-end latency across all queries.
    pub avg_total_ms: f64,
    /// Average latency of cache-hit terminals.
    pub avg_cache_ms: f64,
    /// Average latency of backend terminals.
    pub avg_backend_ms: f64,
}

/// Query-class counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryClassStats {
    /// Queries classified time-sensitive.
    pub time_sensitive: u64,
    /// Queries classified evergreen.
    pub evergreen: u64,
}

/// Point-in-time statistics snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Total queries processed.
    pub total_queries: u64,
    /// Queries answered from the cache.
    pub cache_hits: u64,
    /// Queries that fell through to the backend.
    pub cache_misses: u64,
    /// `cache_hits / total_queries`, as a percentage (0 when idle).
    pub hit_rate_percent: f64,
    /// Backend generate calls issued.
    pub backend_calls: u64,
    /// Errors recorded.
    pub errors: u64,
    /// Latency averages.
    pub latency: LatencyStats,
    /// Class histogram.
    pub query_classes: QueryClassStats,
    /// Topic histogram keyed by wire name.
    pub topics: BTreeMap<&'static str, u64>,
}

impl MetricsRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a cache hit with its end-to-end latency.
    pub fn record_cache_hit(&self, latency_ms: f64) {
        let mut inner = self.inner.lock();
        inner.total_queries += 1;
        inner.cache_hits += 1;
        inner.total_latency_ms += latency_ms;
        inner.cache_latency_ms += latency_ms;
    }

    /// Records a cache miss (one backend call) with its end-to-end latency.
    pub fn record_cache_miss(&self, latency_ms: f64) {
        let mut inner = self.inner.lock();
        inner.total_queries += 1;
        inner.cache_misses += 1;
        inner.backend_calls += 1;
        inner.total_latency_ms += latency_ms;
        inner.backend_latency_ms += latency_ms;
    }

    /// Records a query classification.
    pub fn record_query_class(&self, class: QueryClass) {
        let mut inner = self.inner.lock();
        match class {
            QueryClass::TimeSensitive => inner.time_sensitive_queries += 1,
            QueryClass::Evergreen => inner.evergreen_queries += 1,
        }
    }

    /// Records the topic partition a query landed in.
    pub fn record_topic(&self, topic: Topic) {
        let mut inner = self.inner.lock();
        *inner.topics.entry(topic.as_str()).or_insert(0) += 1;
    }

    /// Records an error.
    pub fn record_error(&self) {
        self.inner.lock().errors += 1;
    }

    /// Computes the current statistics with zero-safe divisions.
    pub fn snapshot(&self) -> CacheStats {
        let inner = self.inner.lock();

        let hit_rate_percent = if inner.total_queries > 0 {
            inner.cache_hits as f64 / inner.total_queries as f64 * 100.0
        } else {
            0.0
        };

        CacheStats {
            total_queries: inner.total_queries,
            cache_hits: inner.cache_hits,
            cache_misses: inner.cache_misses,
            hit_rate_percent: round2(hit_rate_percent),
            backend_calls: inner.backend_calls,
            errors: inner.errors,
            latency: LatencyStats {
                avg_total_ms: round2(avg(inner.total_latency_ms, inner.total_queries)),
                avg_cache_ms: round2(avg(inner.cache_latency_ms, inner.cache_hits)),
                avg_backend_ms: round2(avg(inner.backend_latency_ms, inner.backend_calls)),
            },
            query_classes: QueryClassStats {
                time_sensitive: inner.time_sensitive_queries,
                evergreen: inner.evergreen_queries,
            },
            topics: inner.topics.clone(),
        }
    }

    /// Resets every counter and sum to zero.
    pub fn reset(&self) {
        *self.inner.lock() = MetricsInner::default();
    }
}

fn avg(sum_ms: f64, count: u64) -> f64 {
    if count > 0 { sum_ms / count as f64 } else { 0.0 }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
