//! Solbeam API Server Binary
//!
//! Configuration precedence: defaults, then TOML file, then environment
//! variables, then CLI flags.

use clap::Parser;
use solbeam::{api::ApiServer, config::SolbeamConfig};

#[derive(Parser, Debug)]
#[command(name = "solbeam")]
#[command(about = "Solana balance resolution API server", long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// API server host
    #[arg(long)]
    host: Option<String>,

    /// API server port
    #[arg(long)]
    port: Option<u16>,

    /// Upstream Solana RPC endpoint
    #[arg(long)]
    rpc_url: Option<String>,

    /// Allowed CORS origins (comma-separated, use * for all)
    #[arg(long)]
    cors_origins: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "solbeam=info,tower_http=info".into()),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SolbeamConfig::from_file(path)?,
        None => SolbeamConfig::default(),
    };
    config.apply_env();

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(rpc_url) = args.rpc_url {
        config.upstream.rpc_url = rpc_url;
    }
    if let Some(origins) = args.cors_origins {
        config.server.allowed_origins = origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(timeout) = args.timeout {
        config.server.request_timeout_secs = timeout;
    }

    config.validate()?;

    if config.auth.api_keys.is_empty() {
        tracing::warn!(
            "no API keys configured; every /api request will be rejected \
             (set SOLBEAM_API_KEYS or auth.api_keys)"
        );
    }

    ApiServer::new(config).run().await
}
