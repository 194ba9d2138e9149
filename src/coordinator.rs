//! Concurrent Balance Resolution Coordinator
//!
//! Orchestrates one resolution attempt per address: acquire the per-address
//! lock, re-check the cache, fetch upstream on a miss, populate the cache,
//! release the lock. Batches fan out concurrently with positional results.

use futures::future::join_all;
use std::{sync::Arc, time::Duration};
use tracing::{debug, warn};

use crate::{
    cache::BalanceCache,
    errors::ResolveError,
    locks::KeyLockRegistry,
    monitoring::MetricsRegistry,
    upstream::{validate_address, BalanceSource},
};

/// Outcome of resolving a single address within a batch.
#[derive(Debug)]
pub struct BalanceResolution {
    pub address: String,
    pub outcome: Result<f64, ResolveError>,
}

/// Pure orchestration over the cache, lock registry, and upstream source.
/// Owns no long-lived state of its own; everything is injected.
pub struct BalanceCoordinator {
    cache: Arc<BalanceCache>,
    locks: KeyLockRegistry,
    source: Arc<dyn BalanceSource>,
    metrics: Arc<MetricsRegistry>,
    upstream_timeout: Duration,
}

impl BalanceCoordinator {
    pub fn new(
        cache: Arc<BalanceCache>,
        source: Arc<dyn BalanceSource>,
        metrics: Arc<MetricsRegistry>,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            locks: KeyLockRegistry::new(),
            source,
            metrics,
            upstream_timeout,
        }
    }

    /// Resolve one address.
    ///
    /// The per-address lock serializes concurrent resolvers for the same
    /// address; the cache re-check under the lock collapses N concurrent
    /// cold-key requesters into exactly one upstream call. The lock guard is
    /// released on every exit path.
    pub async fn resolve(&self, address: &str) -> Result<f64, ResolveError> {
        let lock = self.locks.lock_for(address);
        let _guard = lock.lock().await;

        // A concurrent holder may have populated the cache while we waited.
        if let Some(balance) = self.cache.get(address) {
            self.metrics.record_cache_access(true);
            debug!("cache hit for {}", address);
            return Ok(balance);
        }
        self.metrics.record_cache_access(false);

        if let Err(e) = validate_address(address) {
            self.metrics.record_invalid_address();
            return Err(e);
        }

        self.metrics.record_upstream_call();
        let balance = match tokio::time::timeout(
            self.upstream_timeout,
            self.source.fetch_balance(address),
        )
        .await
        {
            Err(_) => {
                self.metrics.record_upstream_timeout();
                warn!(
                    "upstream call for {} abandoned after {}s",
                    address,
                    self.upstream_timeout.as_secs()
                );
                return Err(ResolveError::Timeout(self.upstream_timeout.as_secs()));
            }
            Ok(Err(e)) => {
                self.metrics.record_upstream_failure();
                warn!("upstream call for {} failed: {}", address, e);
                return Err(e.into());
            }
            Ok(Ok(balance)) => balance,
        };

        // Failures are never cached; only successful balances enter.
        self.cache.put(address.to_string(), balance);
        Ok(balance)
    }

    /// Resolve a batch of addresses concurrently.
    ///
    /// Result `i` always corresponds to input `i` regardless of completion
    /// order, and one address failing never cancels or blocks its siblings.
    /// Shape constraints (non-empty, max size) are enforced by the caller
    /// before fan-out.
    pub async fn resolve_batch(&self, wallets: &[String]) -> Vec<BalanceResolution> {
        join_all(wallets.iter().map(|address| async move {
            BalanceResolution {
                address: address.clone(),
                outcome: self.resolve(address).await,
            }
        }))
        .await
    }

    /// Number of distinct addresses with a per-key lock.
    pub fn tracked_addresses(&self) -> usize {
        self.locks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::UpstreamError;
    use async_trait::async_trait;
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicU64, Ordering},
    };
    use tokio::time::sleep;

    /// Mock upstream with scripted responses and a call counter.
    struct MockSource {
        balances: HashMap<String, f64>,
        failing: Vec<String>,
        delay: Duration,
        calls: AtomicU64,
    }

    impl MockSource {
        fn new(balances: &[(&str, f64)]) -> Self {
            Self {
                balances: balances
                    .iter()
                    .map(|(a, b)| (a.to_string(), *b))
                    .collect(),
                failing: Vec::new(),
                delay: Duration::ZERO,
                calls: AtomicU64::new(0),
            }
        }

        fn with_failure(mut self, address: &str) -> Self {
            self.failing.push(address.to_string());
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn call_count(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl BalanceSource for MockSource {
        async fn fetch_balance(&self, address: &str) -> Result<f64, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            if self.failing.iter().any(|a| a == address) {
                return Err(UpstreamError::Rpc {
                    code: -32000,
                    message: "node is behind".to_string(),
                });
            }
            self.balances
                .get(address)
                .copied()
                .ok_or_else(|| UpstreamError::Transport("connection refused".to_string()))
        }
    }

    /// Base58 address that decodes to 32 bytes, distinct per seed byte.
    fn addr(seed: u8) -> String {
        bs58::encode([seed; 32]).into_string()
    }

    fn coordinator(source: Arc<MockSource>, ttl: Duration, timeout: Duration) -> BalanceCoordinator {
        BalanceCoordinator::new(
            Arc::new(BalanceCache::new(ttl)),
            source,
            Arc::new(MetricsRegistry::new()),
            timeout,
        )
    }

    #[tokio::test]
    async fn concurrent_resolutions_of_one_cold_key_hit_upstream_once() {
        let a = addr(1);
        let source = Arc::new(
            MockSource::new(&[(a.as_str(), 1.5)]).with_delay(Duration::from_millis(30)),
        );
        let coordinator = Arc::new(coordinator(
            source.clone(),
            Duration::from_secs(10),
            Duration::from_secs(10),
        ));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let coordinator = coordinator.clone();
            let a = a.clone();
            handles.push(tokio::spawn(async move { coordinator.resolve(&a).await }));
        }

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), 1.5);
        }
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn fresh_cache_hits_are_idempotent() {
        let a = addr(2);
        let source = Arc::new(MockSource::new(&[(a.as_str(), 2.25)]));
        let coordinator = coordinator(
            source.clone(),
            Duration::from_secs(10),
            Duration::from_secs(10),
        );

        for _ in 0..5 {
            assert_eq!(coordinator.resolve(&a).await.unwrap(), 2.25);
        }
        assert_eq!(source.call_count(), 1);
    }

    #[tokio::test]
    async fn expired_entry_triggers_a_fresh_upstream_call() {
        let a = addr(3);
        let source = Arc::new(MockSource::new(&[(a.as_str(), 0.5)]));
        let coordinator = coordinator(
            source.clone(),
            Duration::from_millis(20),
            Duration::from_secs(10),
        );

        assert_eq!(coordinator.resolve(&a).await.unwrap(), 0.5);
        sleep(Duration::from_millis(40)).await;
        assert_eq!(coordinator.resolve(&a).await.unwrap(), 0.5);
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn invalid_address_fails_without_upstream_call_or_cache_write() {
        let source = Arc::new(MockSource::new(&[]));
        let cache = Arc::new(BalanceCache::new(Duration::from_secs(10)));
        let coordinator = BalanceCoordinator::new(
            cache.clone(),
            source.clone(),
            Arc::new(MetricsRegistry::new()),
            Duration::from_secs(10),
        );

        let err = coordinator.resolve("definitely-not-base58!").await.unwrap_err();
        assert!(matches!(err, ResolveError::InvalidAddress(_)));
        assert_eq!(source.call_count(), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_is_not_cached() {
        let a = addr(4);
        let source = Arc::new(MockSource::new(&[]).with_failure(&a));
        let cache = Arc::new(BalanceCache::new(Duration::from_secs(10)));
        let coordinator = BalanceCoordinator::new(
            cache.clone(),
            source.clone(),
            Arc::new(MetricsRegistry::new()),
            Duration::from_secs(10),
        );

        let err = coordinator.resolve(&a).await.unwrap_err();
        assert!(matches!(err, ResolveError::Upstream(_)));
        assert!(cache.is_empty());

        // every retry goes upstream again
        let _ = coordinator.resolve(&a).await;
        assert_eq!(source.call_count(), 2);
    }

    #[tokio::test]
    async fn slow_upstream_is_abandoned_at_the_deadline() {
        let a = addr(5);
        let source = Arc::new(
            MockSource::new(&[(a.as_str(), 1.0)]).with_delay(Duration::from_millis(200)),
        );
        let coordinator = coordinator(
            source,
            Duration::from_secs(10),
            Duration::from_millis(20),
        );

        let err = coordinator.resolve(&a).await.unwrap_err();
        assert!(matches!(err, ResolveError::Timeout(_)));
    }

    #[tokio::test]
    async fn batch_output_is_positional_with_isolated_failures() {
        let (a, b, c) = (addr(6), addr(7), addr(8));
        let source = Arc::new(
            MockSource::new(&[(a.as_str(), 1.5), (c.as_str(), 3.0)]).with_failure(&b),
        );
        let coordinator = coordinator(
            source,
            Duration::from_secs(10),
            Duration::from_secs(10),
        );

        let wallets = vec![a.clone(), b.clone(), c.clone()];
        let results = coordinator.resolve_batch(&wallets).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].address, a);
        assert_eq!(*results[0].outcome.as_ref().unwrap(), 1.5);
        assert_eq!(results[1].address, b);
        assert!(results[1].outcome.is_err());
        assert_eq!(results[2].address, c);
        assert_eq!(*results[2].outcome.as_ref().unwrap(), 3.0);
    }

    #[tokio::test]
    async fn failing_key_does_not_delay_fast_siblings() {
        let (a, b) = (addr(9), addr(10));
        // the failing key is also slow; the sibling must still resolve
        let source = Arc::new(
            MockSource::new(&[(a.as_str(), 1.0), (b.as_str(), 2.0)])
                .with_failure(&b)
                .with_delay(Duration::from_millis(10)),
        );
        let coordinator = coordinator(
            source,
            Duration::from_secs(10),
            Duration::from_secs(10),
        );

        let wallets = vec![b.clone(), a.clone()];
        let results = coordinator.resolve_batch(&wallets).await;

        assert!(results[0].outcome.is_err());
        assert_eq!(*results[1].outcome.as_ref().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn distinct_addresses_resolve_in_parallel() {
        let (a, b) = (addr(11), addr(12));
        let source = Arc::new(
            MockSource::new(&[(a.as_str(), 1.0), (b.as_str(), 2.0)])
                .with_delay(Duration::from_millis(50)),
        );
        let coordinator = coordinator(
            source,
            Duration::from_secs(10),
            Duration::from_secs(10),
        );

        let start = std::time::Instant::now();
        let wallets = vec![a, b];
        let results = coordinator.resolve_batch(&wallets).await;
        let elapsed = start.elapsed();

        assert!(results.iter().all(|r| r.outcome.is_ok()));
        // serialized execution would take >= 100ms
        assert!(elapsed < Duration::from_millis(95), "batch took {:?}", elapsed);
    }
}
