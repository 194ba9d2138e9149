//! Per-Client Rate Limiting
//!
//! Token bucket per client identity (IP), created lazily on first request.
//! A request consumes exactly one token regardless of how many wallets the
//! batch carries.

use dashmap::DashMap;
use std::time::Instant;

use crate::config::RateLimitConfig;

/// Token bucket with continuous refill.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
    capacity: f64,
    /// tokens per second
    refill_rate: f64,
}

impl TokenBucket {
    fn new(capacity: u32, refill_per_minute: u32) -> Self {
        Self {
            tokens: capacity as f64,
            last_refill: Instant::now(),
            capacity: capacity as f64,
            refill_rate: refill_per_minute as f64 / 60.0,
        }
    }

    fn try_consume(&mut self, tokens: f64) -> bool {
        self.refill();
        if self.tokens >= tokens {
            self.tokens -= tokens;
            true
        } else {
            false
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }
}

/// Registry of token buckets keyed by client identity.
///
/// Lookup-or-create is atomic via the dashmap entry API; the bucket is
/// mutated under the shard guard, which is held only for the O(1) refill
/// and consume. Buckets are retained for every client ever seen; the
/// registry grows with distinct-client cardinality.
pub struct RateLimiterRegistry {
    limiters: DashMap<String, TokenBucket>,
    config: RateLimitConfig,
}

impl RateLimiterRegistry {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            limiters: DashMap::new(),
            config,
        }
    }

    /// Attempt to consume one token for this client. Returns whether the
    /// request is allowed.
    pub fn allow(&self, client_id: &str) -> bool {
        let mut bucket = self
            .limiters
            .entry(client_id.to_string())
            .or_insert_with(|| {
                TokenBucket::new(
                    self.config.burst_capacity,
                    self.config.requests_per_minute,
                )
            });
        bucket.try_consume(1.0)
    }

    /// Number of distinct clients with a bucket.
    pub fn len(&self) -> usize {
        self.limiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.limiters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn config(capacity: u32, per_minute: u32) -> RateLimitConfig {
        RateLimitConfig {
            burst_capacity: capacity,
            requests_per_minute: per_minute,
        }
    }

    #[test]
    fn allows_exactly_capacity_within_one_window() {
        let registry = RateLimiterRegistry::new(config(10, 10));

        for _ in 0..10 {
            assert!(registry.allow("1.2.3.4"));
        }
        assert!(!registry.allow("1.2.3.4"));
    }

    #[test]
    fn clients_are_throttled_independently() {
        let registry = RateLimiterRegistry::new(config(1, 1));

        assert!(registry.allow("1.2.3.4"));
        assert!(!registry.allow("1.2.3.4"));
        // a different client still has its own full bucket
        assert!(registry.allow("5.6.7.8"));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn one_token_returns_after_one_refill_interval() {
        let registry = RateLimiterRegistry::new(config(1, 60));

        assert!(registry.allow("1.2.3.4"));
        assert!(!registry.allow("1.2.3.4"));

        // 60/min refill: rewind the bucket one second to simulate elapsed time
        {
            let mut bucket = registry.limiters.get_mut("1.2.3.4").unwrap();
            bucket.last_refill -= Duration::from_secs(1);
        }
        assert!(registry.allow("1.2.3.4"));
        assert!(!registry.allow("1.2.3.4"));
    }

    #[test]
    fn bucket_never_exceeds_capacity() {
        let registry = RateLimiterRegistry::new(config(2, 60));
        assert!(registry.allow("1.2.3.4"));

        // long idle period refills at most back to capacity
        {
            let mut bucket = registry.limiters.get_mut("1.2.3.4").unwrap();
            bucket.last_refill -= Duration::from_secs(3600);
        }
        assert!(registry.allow("1.2.3.4"));
        assert!(registry.allow("1.2.3.4"));
        assert!(!registry.allow("1.2.3.4"));
    }
}
