//! API Server
//!
//! Wires the registries, coordinator, and middleware stack together and
//! runs the HTTP server with graceful shutdown.

use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    routes::create_router,
};
use crate::{
    auth::HashedKeyStore,
    cache::BalanceCache,
    config::SolbeamConfig,
    coordinator::BalanceCoordinator,
    monitoring::MetricsRegistry,
    rate_limit::RateLimiterRegistry,
    upstream::{BalanceSource, RpcBalanceSource},
};

/// Balance resolution API server
pub struct ApiServer {
    config: SolbeamConfig,
}

impl ApiServer {
    pub fn new(config: SolbeamConfig) -> Self {
        Self { config }
    }

    /// Start the API server. Returns when a shutdown signal arrives.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        let source: Arc<dyn BalanceSource> = Arc::new(RpcBalanceSource::new(
            self.config.upstream.rpc_url.clone(),
            self.config.upstream.timeout(),
        )?);
        self.run_with_source(source).await
    }

    /// Start the server against an explicit upstream source (tests inject
    /// mocks here).
    pub async fn run_with_source(
        self,
        source: Arc<dyn BalanceSource>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let cache = Arc::new(BalanceCache::new(self.config.cache.ttl()));
        let janitor = BalanceCache::start_janitor(
            cache.clone(),
            self.config.cache.janitor_interval(),
        );

        let metrics = Arc::new(MetricsRegistry::new());
        let coordinator = Arc::new(BalanceCoordinator::new(
            cache.clone(),
            source,
            metrics.clone(),
            self.config.upstream.timeout(),
        ));

        let state = Arc::new(AppState {
            coordinator,
            cache,
            credentials: Arc::new(HashedKeyStore::new(&self.config.auth.api_keys)),
            rate_limiters: Arc::new(RateLimiterRegistry::new(self.config.rate_limit.clone())),
            metrics,
            max_batch_size: self.config.server.max_batch_size,
            rate_limit_per_minute: self.config.rate_limit.requests_per_minute,
        });

        let app = create_router(state)
            // request ID first so every later layer can see it
            .layer(axum::middleware::from_fn(request_id_middleware))
            .layer(create_cors_layer(&self.config.server.allowed_origins))
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.server.request_timeout_secs,
            )))
            .layer(TraceLayer::new_for_http());

        let addr = SocketAddr::from((
            self.config.server.host.parse::<std::net::IpAddr>()?,
            self.config.server.port,
        ));

        self.log_server_info(&addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("balance API listening on http://{}", addr);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        // the janitor has no work once the server stops accepting requests
        janitor.abort();
        info!("API server stopped gracefully");
        Ok(())
    }

    fn log_server_info(&self, addr: &SocketAddr) {
        info!("Server configuration:");
        info!("   Listen: {}", addr);
        info!("   Upstream RPC: {}", self.config.upstream.rpc_url);
        info!("   Cache TTL: {}s", self.config.cache.ttl_secs);
        info!(
            "   Rate limit: {}/min per client (burst {})",
            self.config.rate_limit.requests_per_minute, self.config.rate_limit.burst_capacity
        );
        info!("   Max batch size: {}", self.config.server.max_batch_size);
        info!("   Authorized API keys: {}", self.config.auth.api_keys.len());
        info!("Available endpoints:");
        info!("   GET  /health           - Health check");
        info!("   GET  /metrics          - Prometheus metrics");
        info!("   POST /api/get-balance  - Batch balance resolution");
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
