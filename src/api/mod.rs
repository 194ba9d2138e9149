//! Balance Resolution HTTP API
//!
//! Axum service exposing the batch balance endpoint plus health and
//! metrics, with API-key authentication and per-client rate limiting.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;

pub use server::ApiServer;
