//! Upstream Solana RPC Client
//!
//! `BalanceSource` is the seam between the coordinator and the network;
//! production uses the JSON-RPC `getBalance` call, tests substitute mocks.
//! Also hosts the syntactic address check performed before any upstream call.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::errors::{ResolveError, UpstreamError};

/// Lamports per SOL.
const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Size of a Solana public key in bytes.
const PUBKEY_BYTES: usize = 32;

/// Opaque balance fetcher for a validated address.
#[async_trait]
pub trait BalanceSource: Send + Sync {
    /// Fetch the balance in SOL for an address. The implementation carries
    /// its own transport-level timeout; the coordinator wraps the call in a
    /// deadline as well.
    async fn fetch_balance(&self, address: &str) -> Result<f64, UpstreamError>;
}

/// Syntactic address validation: base58 decoding to exactly 32 bytes.
pub fn validate_address(address: &str) -> Result<(), ResolveError> {
    let decoded = bs58::decode(address)
        .into_vec()
        .map_err(|e| ResolveError::InvalidAddress(e.to_string()))?;
    if decoded.len() != PUBKEY_BYTES {
        return Err(ResolveError::InvalidAddress(format!(
            "expected {} bytes, got {}",
            PUBKEY_BYTES,
            decoded.len()
        )));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: (&'a str, serde_json::Value),
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: Option<RpcBalanceResult>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcBalanceResult {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// `BalanceSource` backed by a Solana JSON-RPC endpoint.
pub struct RpcBalanceSource {
    client: Client,
    rpc_url: String,
}

impl RpcBalanceSource {
    pub fn new(rpc_url: String, timeout: Duration) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;
        Ok(Self { client, rpc_url })
    }
}

#[async_trait]
impl BalanceSource for RpcBalanceSource {
    async fn fetch_balance(&self, address: &str) -> Result<f64, UpstreamError> {
        let request = RpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: "getBalance",
            params: (address, json!({ "commitment": "confirmed" })),
        };

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let rpc: RpcResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Malformed(e.to_string()))?;

        if let Some(error) = rpc.error {
            return Err(UpstreamError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        let result = rpc
            .result
            .ok_or_else(|| UpstreamError::Malformed("response has neither result nor error".to_string()))?;

        let sol = result.value as f64 / LAMPORTS_PER_SOL;
        debug!("fetched balance for {}: {} SOL", address, sol);
        Ok(sol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_wellformed_solana_address() {
        // system program id, the canonical 32-byte base58 address
        assert!(validate_address("11111111111111111111111111111111").is_ok());
        assert!(validate_address("Vote111111111111111111111111111111111111111").is_ok());
    }

    #[test]
    fn rejects_non_base58_input() {
        let err = validate_address("not-an-address!").unwrap_err();
        assert!(err.to_string().contains("invalid address"));
    }

    #[test]
    fn rejects_wrong_length_payload() {
        // valid base58 but decodes to fewer than 32 bytes
        let err = validate_address("abc").unwrap_err();
        assert!(err.to_string().contains("invalid address"));
    }

    #[test]
    fn parses_rpc_success_payload() {
        let raw = r#"{"jsonrpc":"2.0","result":{"context":{"slot":1},"value":1500000000},"id":1}"#;
        let response: RpcResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.result.unwrap().value, 1_500_000_000);
        assert!(response.error.is_none());
    }

    #[test]
    fn parses_rpc_error_payload() {
        let raw = r#"{"jsonrpc":"2.0","error":{"code":-32602,"message":"Invalid param"},"id":1}"#;
        let response: RpcResponse = serde_json::from_str(raw).unwrap();
        let error = response.error.unwrap();
        assert_eq!(error.code, -32602);
        assert_eq!(error.message, "Invalid param");
    }
}
