//! API Key Authentication
//!
//! Credential store seam plus the default implementation holding SHA-256
//! digests of authorized keys. Keys are hashed at load time so the raw
//! values never sit in memory longer than necessary.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use tokio::sync::RwLock;

/// Yes/no oracle for client credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn validate(&self, api_key: &str) -> bool;
}

/// Credential store backed by an in-memory set of SHA-256 key digests.
pub struct HashedKeyStore {
    key_hashes: RwLock<HashSet<String>>,
}

impl HashedKeyStore {
    pub fn new(api_keys: &[String]) -> Self {
        let key_hashes = api_keys.iter().map(|k| hash_api_key(k)).collect();
        Self {
            key_hashes: RwLock::new(key_hashes),
        }
    }

    /// Replace the authorized key set, e.g. after a config reload.
    pub async fn replace_keys(&self, api_keys: &[String]) {
        let hashes: HashSet<String> = api_keys.iter().map(|k| hash_api_key(k)).collect();
        *self.key_hashes.write().await = hashes;
    }

    pub async fn key_count(&self) -> usize {
        self.key_hashes.read().await.len()
    }
}

#[async_trait]
impl CredentialStore for HashedKeyStore {
    async fn validate(&self, api_key: &str) -> bool {
        let hash = hash_api_key(api_key);
        self.key_hashes.read().await.contains(&hash)
    }
}

/// Hash an API key using SHA-256.
fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}
