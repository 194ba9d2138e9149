//! Key-Scoped Lock Registry
//!
//! One async mutex per wallet address, created lazily on first use, so
//! concurrent resolutions of the same address serialize instead of
//! duplicating upstream work while distinct addresses never block each other.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Registry of per-address locks.
///
/// Lookup-or-create goes through the dashmap entry API, which is atomic per
/// shard: two concurrent first-time callers for the same address always get
/// the same lock. The shard guard is held only for the lookup-or-insert,
/// never across the caller's hold of the per-address lock itself.
///
/// Locks are retained for every address ever seen, so the registry grows
/// with distinct-address cardinality. Known caveat; a bounded variant can
/// replace this behind the same method.
#[derive(Default)]
pub struct KeyLockRegistry {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyLockRegistry {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Get the lock for an address, creating it on first reference.
    pub fn lock_for(&self, address: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(address.to_string())
            .or_default()
            .clone()
    }

    /// Number of distinct addresses that have a lock.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
