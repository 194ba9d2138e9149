//! Domain error types for the balance resolution service
//!
//! Request-level failures (shape, auth, rate limit) are handled at the HTTP
//! layer in `api::errors`; the types here cover per-key resolution failures
//! and process bootstrap.

use thiserror::Error;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Failures talking to the upstream Solana RPC endpoint
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Error object reported inside a JSON-RPC response, surfaced verbatim.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed upstream response: {0}")]
    Malformed(String),
}

/// Per-key resolution failure, isolated from sibling keys in a batch
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("failed to get balance: {0}")]
    Upstream(#[from] UpstreamError),

    #[error("upstream call timed out after {0}s")]
    Timeout(u64),
}
