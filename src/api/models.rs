//! API Request & Response Models

use serde::{Deserialize, Serialize};

use crate::coordinator::BalanceResolution;

/// Batch balance request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBalanceRequest {
    pub wallets: Vec<String>,
}

/// Per-wallet result: either a balance or an error, never both
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceItem {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<BalanceResolution> for BalanceItem {
    fn from(resolution: BalanceResolution) -> Self {
        match resolution.outcome {
            Ok(balance) => Self {
                address: resolution.address,
                balance: Some(balance),
                error: None,
            },
            Err(e) => Self {
                address: resolution.address,
                balance: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Batch balance response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetBalanceResponse {
    pub success: bool,
    pub results: Vec<BalanceItem>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: i64,
    pub service: String,
}
