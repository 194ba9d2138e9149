//! Service Metrics
//!
//! Atomics-based counters with Prometheus text exposition for the
//! /metrics endpoint.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prometheus-compatible metrics registry
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    /// Inbound HTTP requests to the balance endpoint
    pub requests_total: AtomicU64,
    /// Requests rejected by the rate limiter
    pub rate_limited_total: AtomicU64,
    /// Requests rejected by authentication
    pub auth_failures_total: AtomicU64,

    /// Cache metrics
    pub cache_hits_total: AtomicU64,
    pub cache_misses_total: AtomicU64,

    /// Upstream RPC metrics
    pub upstream_calls_total: AtomicU64,
    pub upstream_failures_total: AtomicU64,
    pub upstream_timeouts_total: AtomicU64,

    /// Per-key validation rejections
    pub invalid_addresses_total: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rate_limited(&self) {
        self.rate_limited_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auth_failure(&self) {
        self.auth_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_access(&self, hit: bool) {
        if hit {
            self.cache_hits_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cache_misses_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_upstream_call(&self) {
        self.upstream_calls_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_failure(&self) {
        self.upstream_failures_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_upstream_timeout(&self) {
        self.upstream_timeouts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_address(&self) {
        self.invalid_addresses_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Ratio of cache hits to all cache lookups.
    pub fn cache_hit_ratio(&self) -> f64 {
        let hits = self.cache_hits_total.load(Ordering::Relaxed) as f64;
        let misses = self.cache_misses_total.load(Ordering::Relaxed) as f64;
        if hits + misses == 0.0 {
            0.0
        } else {
            hits / (hits + misses)
        }
    }

    /// Render all counters in Prometheus text exposition format.
    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        let counters: [(&str, &str, u64); 9] = [
            (
                "solbeam_requests_total",
                "Total balance requests received",
                self.requests_total.load(Ordering::Relaxed),
            ),
            (
                "solbeam_rate_limited_total",
                "Requests rejected by the rate limiter",
                self.rate_limited_total.load(Ordering::Relaxed),
            ),
            (
                "solbeam_auth_failures_total",
                "Requests rejected by authentication",
                self.auth_failures_total.load(Ordering::Relaxed),
            ),
            (
                "solbeam_cache_hits_total",
                "Balance cache hits",
                self.cache_hits_total.load(Ordering::Relaxed),
            ),
            (
                "solbeam_cache_misses_total",
                "Balance cache misses",
                self.cache_misses_total.load(Ordering::Relaxed),
            ),
            (
                "solbeam_upstream_calls_total",
                "RPC getBalance calls issued upstream",
                self.upstream_calls_total.load(Ordering::Relaxed),
            ),
            (
                "solbeam_upstream_failures_total",
                "Upstream calls that failed",
                self.upstream_failures_total.load(Ordering::Relaxed),
            ),
            (
                "solbeam_upstream_timeouts_total",
                "Upstream calls abandoned at the deadline",
                self.upstream_timeouts_total.load(Ordering::Relaxed),
            ),
            (
                "solbeam_invalid_addresses_total",
                "Per-key syntactic validation rejections",
                self.invalid_addresses_total.load(Ordering::Relaxed),
            ),
        ];

        for (name, help, value) in counters {
            output.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n\n"
            ));
        }

        output.push_str(&format!(
            "# HELP solbeam_cache_hit_ratio Cache hit ratio\n\
             # TYPE solbeam_cache_hit_ratio gauge\n\
             solbeam_cache_hit_ratio {}\n",
            self.cache_hit_ratio()
        ));

        output
    }

    /// Snapshot for JSON consumers and logs.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            rate_limited_total: self.rate_limited_total.load(Ordering::Relaxed),
            auth_failures_total: self.auth_failures_total.load(Ordering::Relaxed),
            cache_hits: self.cache_hits_total.load(Ordering::Relaxed),
            cache_misses: self.cache_misses_total.load(Ordering::Relaxed),
            cache_hit_ratio: self.cache_hit_ratio(),
            upstream_calls: self.upstream_calls_total.load(Ordering::Relaxed),
            upstream_failures: self.upstream_failures_total.load(Ordering::Relaxed),
            upstream_timeouts: self.upstream_timeouts_total.load(Ordering::Relaxed),
            invalid_addresses: self.invalid_addresses_total.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot for API responses
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub rate_limited_total: u64,
    pub auth_failures_total: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub cache_hit_ratio: f64,
    pub upstream_calls: u64,
    pub upstream_failures: u64,
    pub upstream_timeouts: u64,
    pub invalid_addresses: u64,
}
