//! Route Definitions
//!
//! Maps URLs to handlers. The /api subtree carries authentication and rate
//! limiting; health and metrics stay open.

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::{
    handlers::{get_balance_handler, health_handler, metrics_handler, AppState},
    middleware::{auth_middleware, rate_limit_middleware},
};

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    // layers run outermost-last: auth is added after rate limiting so it
    // executes first, and a rejected key never consumes a token
    let protected = Router::new()
        .route("/api/get-balance", post(get_balance_handler))
        .layer(from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .merge(protected)
        .with_state(state)
}
