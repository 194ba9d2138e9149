//! Solbeam - Concurrent Solana Balance Resolution API
//!
//! HTTP service that resolves account balances for Solana addresses while
//! shielding the upstream RPC endpoint from redundant load: concurrent
//! requests for the same address collapse into one upstream call, fresh
//! results come from a short-TTL cache, and each client is throttled by a
//! token bucket.

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod coordinator;
pub mod errors;
pub mod locks;
pub mod monitoring;
pub mod rate_limit;
pub mod upstream;
