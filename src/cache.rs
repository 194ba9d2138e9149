//! TTL Balance Cache
//!
//! Short-lived cache for resolved balances:
//! - Staleness checked lazily on every read
//! - Unconditional overwrite on write
//! - Background janitor evicts expired entries
//! - Thread-safe concurrent access

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};
use tokio::task::JoinHandle;
use tracing::debug;

/// Cache entry with its storage timestamp
#[derive(Clone, Debug)]
struct CacheEntry {
    balance: f64,
    stored_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Duration) -> bool {
        self.stored_at.elapsed() < ttl
    }
}

/// TTL cache mapping addresses to balances.
///
/// `get` never removes entries, even stale ones, so the read path only ever
/// takes the read lock; eviction is left to the janitor sweep. The freshness
/// check in `get` is the correctness boundary, the janitor is housekeeping.
pub struct BalanceCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl BalanceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Get a cached balance if present and still fresh.
    pub fn get(&self, address: &str) -> Option<f64> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries
            .get(address)
            .filter(|entry| entry.is_fresh(self.ttl))
            .map(|entry| entry.balance)
    }

    /// Store a balance, overwriting any existing entry.
    pub fn put(&self, address: String, balance: f64) {
        let entry = CacheEntry {
            balance,
            stored_at: Instant::now(),
        };
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(address, entry);
    }

    /// Number of entries currently held, fresh or stale.
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every expired entry. Returns the number removed.
    ///
    /// Holds the write lock only for the duration of the sweep; the sweep
    /// itself performs no blocking calls.
    pub fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| entry.is_fresh(ttl));
        before - entries.len()
    }

    /// Start the background janitor that periodically sweeps expired
    /// entries. The returned handle is aborted on shutdown.
    pub fn start_janitor(cache: Arc<BalanceCache>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the first tick fires immediately; skip it
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.sweep_expired();
                if removed > 0 {
                    debug!("cache janitor removed {} expired entries", removed);
                }
            }
        })
    }
}
