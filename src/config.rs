//! Configuration management with validation and defaults
//!
//! Layered configuration: built-in defaults, optional TOML file,
//! environment variables, then CLI flags (applied in `main.rs`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ConfigError;

/// Top-level service configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SolbeamConfig {
    pub server: ServerConfig,
    pub upstream: UpstreamConfig,
    pub cache: CacheConfig,
    pub rate_limit: RateLimitConfig,
    pub auth: AuthConfig,
}

/// HTTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Maximum number of wallets accepted in a single batch request
    pub max_batch_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
            max_batch_size: 100,
        }
    }
}

/// Upstream Solana RPC configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    pub rpc_url: String,
    /// Deadline for a single getBalance call, seconds
    pub timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            timeout_secs: 10,
        }
    }
}

impl UpstreamConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Balance cache configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long a cached balance stays valid, seconds
    pub ttl_secs: u64,
    /// How often the janitor sweeps expired entries, seconds
    pub janitor_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 10,
            janitor_interval_secs: 60,
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn janitor_interval(&self) -> Duration {
        Duration::from_secs(self.janitor_interval_secs)
    }
}

/// Per-client rate limiting configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Token bucket capacity (burst size)
    pub burst_capacity: u32,
    /// Refill rate, requests per minute
    pub requests_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            burst_capacity: 10,
            requests_per_minute: 10,
        }
    }
}

/// API key authentication configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Authorized API keys (plaintext in config; hashed at load time).
    /// Also populated from the SOLBEAM_API_KEYS env var (comma-separated).
    pub api_keys: Vec<String>,
}

impl SolbeamConfig {
    /// Load configuration from a TOML file, falling back to defaults
    /// for any missing section.
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadFailed(format!("{}: {}", path, e)))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::LoadFailed(format!("{}: {}", path, e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// `SOLBEAM_RPC_URL` replaces the upstream endpoint; `SOLBEAM_API_KEYS`
    /// (comma-separated) extends the authorized key set.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("SOLBEAM_RPC_URL") {
            if !url.is_empty() {
                self.upstream.rpc_url = url;
            }
        }
        if let Ok(keys) = std::env::var("SOLBEAM_API_KEYS") {
            self.auth.api_keys.extend(
                keys.split(',')
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty()),
            );
        }
    }

    /// Validate cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.cache.ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache.ttl_secs".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }
        if self.rate_limit.burst_capacity == 0 || self.rate_limit.requests_per_minute == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limit".to_string(),
                reason: "burst_capacity and requests_per_minute must be non-zero".to_string(),
            });
        }
        if self.upstream.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "upstream.timeout_secs".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }
        Ok(())
    }
}
