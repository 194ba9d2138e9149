//! Middleware Components
//!
//! Request IDs, CORS, API-key authentication, and per-client rate limiting.
//! Auth runs before rate limiting; both run only on the /api subtree.

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderName},
    middleware::Next,
    response::Response,
};
use std::{net::IpAddr, sync::Arc};
use tower_http::cors::{Any, CorsLayer, ExposeHeaders};
use tracing::warn;
use uuid::Uuid;

use super::{errors::ApiError, handlers::AppState};

/// Request ID header key
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// API key header key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Request ID wrapper for extracting in handlers
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Create CORS middleware with configurable origins
pub fn create_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
            .expose_headers(ExposeHeaders::list([HeaderName::from_static(
                REQUEST_ID_HEADER,
            )]))
    } else {
        CorsLayer::new()
            .allow_origin(
                allowed_origins
                    .iter()
                    .filter_map(|o| o.parse().ok())
                    .collect::<Vec<_>>(),
            )
            .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
            .allow_headers(Any)
            .expose_headers(ExposeHeaders::list([HeaderName::from_static(
                REQUEST_ID_HEADER,
            )]))
    }
}

/// Middleware to attach a request ID to every request and response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = request_id.parse() {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// API-key authentication middleware. Rejects before any rate-limit token
/// is consumed.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let request_id = extract_request_id(&request);

    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let api_key = match api_key {
        Some(key) if !key.is_empty() => key,
        _ => {
            state.metrics.record_auth_failure();
            return Err(ApiError::unauthorized(
                request_id,
                "API key required".to_string(),
            ));
        }
    };

    if !state.credentials.validate(&api_key).await {
        state.metrics.record_auth_failure();
        warn!("rejected request with invalid API key");
        return Err(ApiError::unauthorized(
            request_id,
            "Invalid API key".to_string(),
        ));
    }

    Ok(next.run(request).await)
}

/// Per-client rate limiting middleware. One token per inbound request, no
/// matter how many wallets the batch carries.
pub async fn rate_limit_middleware(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<std::net::SocketAddr>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let request_id = extract_request_id(&request);
    let client_ip = extract_client_ip(request.headers(), Some(addr));

    if !state.rate_limiters.allow(&client_ip.to_string()) {
        state.metrics.record_rate_limited();
        warn!("rate limit exceeded for {}", client_ip);
        return Err(ApiError::rate_limited(
            request_id,
            format!(
                "Rate limit exceeded. Maximum {} requests per minute.",
                state.rate_limit_per_minute
            ),
        ));
    }

    Ok(next.run(request).await)
}

fn extract_request_id(request: &Request) -> String {
    request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default()
}

/// Extract client IP from request, handling proxies.
pub fn extract_client_ip(headers: &HeaderMap, connect_info: Option<std::net::SocketAddr>) -> IpAddr {
    // X-Forwarded-For from a load balancer/proxy takes precedence
    if let Some(forwarded) = headers.get("X-Forwarded-For") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next() {
                if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                    return ip;
                }
            }
        }
    }

    if let Some(real_ip) = headers.get("X-Real-IP") {
        if let Ok(real_ip_str) = real_ip.to_str() {
            if let Ok(ip) = real_ip_str.parse::<IpAddr>() {
                return ip;
            }
        }
    }

    connect_info
        .map(|addr| addr.ip())
        .unwrap_or_else(|| IpAddr::from([127, 0, 0, 1]))
}
