//! Request Handlers
//!
//! Shape checks happen here, before any resolution work; per-wallet
//! failures ride inside a successful response.

use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;

use super::{
    errors::ApiError,
    middleware::RequestId,
    models::{BalanceItem, GetBalanceRequest, GetBalanceResponse, HealthResponse},
};
use crate::{
    auth::CredentialStore, cache::BalanceCache, coordinator::BalanceCoordinator,
    monitoring::MetricsRegistry, rate_limit::RateLimiterRegistry,
};

/// Shared application state
pub struct AppState {
    pub coordinator: Arc<BalanceCoordinator>,
    pub cache: Arc<BalanceCache>,
    pub credentials: Arc<dyn CredentialStore>,
    pub rate_limiters: Arc<RateLimiterRegistry>,
    pub metrics: Arc<MetricsRegistry>,
    pub max_batch_size: usize,
    pub rate_limit_per_minute: u32,
}

/// Health check handler - no authentication
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: Utc::now().timestamp(),
        service: "solbeam".to_string(),
    })
}

/// Prometheus metrics handler
/// GET /metrics
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> String {
    state.metrics.to_prometheus_format()
}

/// Batch balance handler
/// POST /api/get-balance
pub async fn get_balance_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    body: Result<Json<GetBalanceRequest>, JsonRejection>,
) -> Result<Json<GetBalanceResponse>, ApiError> {
    state.metrics.record_request();

    let Json(request) = body.map_err(|e| {
        ApiError::bad_request(
            request_id.0.clone(),
            format!("Invalid request format: {}", e.body_text()),
        )
    })?;

    if request.wallets.is_empty() {
        return Err(ApiError::bad_request(
            request_id.0,
            "At least one wallet address is required".to_string(),
        ));
    }
    if request.wallets.len() > state.max_batch_size {
        return Err(ApiError::bad_request(
            request_id.0,
            format!(
                "Maximum {} wallets allowed per request",
                state.max_batch_size
            ),
        ));
    }

    let results: Vec<BalanceItem> = state
        .coordinator
        .resolve_batch(&request.wallets)
        .await
        .into_iter()
        .map(BalanceItem::from)
        .collect();

    Ok(Json(GetBalanceResponse {
        success: true,
        results,
    }))
}
