//! TronGrid chain-oracle client.
//!
//! Queries the Tron network for a transaction by id. The response shape for
//! TRC20 transfers varies by provider, so everything beyond the execution
//! status is kept as raw JSON and interpreted by the transfer matcher.

use crate::config::TronConfig;
use crate::services::verification::ChainOracle;
use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::ExposeSecret;
use serde_json::json;
use service_core::error::AppError;

/// Header TronGrid uses for API-key authentication.
const TRON_API_KEY_HEADER: &str = "TRON-PRO-API-KEY";

/// TronGrid client.
#[derive(Clone)]
pub struct TronClient {
    client: Client,
    config: TronConfig,
}

impl TronClient {
    /// Create a new TronGrid client.
    pub fn new(config: TronConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// The platform wallet address incoming transfers must target.
    pub fn platform_address(&self) -> &str {
        &self.config.platform_address
    }

    /// Fetch a transaction by id.
    ///
    /// Returns `None` when the chain has no record of the transaction;
    /// TronGrid signals this with an empty JSON object.
    pub async fn get_transaction_by_id(
        &self,
        txid: &str,
    ) -> anyhow::Result<Option<serde_json::Value>> {
        let url = format!("{}/wallet/gettransactionbyid", self.config.api_base_url);

        let mut request = self.client.post(&url).json(&json!({ "value": txid }));
        if let Some(key) = &self.config.api_key {
            request = request.header(TRON_API_KEY_HEADER, key.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(txid = %txid, status = %status, "TronGrid gettransactionbyid response");

        if !status.is_success() {
            return Err(anyhow!("TronGrid error: {} - {}", status, body));
        }

        let value: serde_json::Value = serde_json::from_str(&body)?;
        if value.as_object().map(|o| o.is_empty()).unwrap_or(true) {
            return Ok(None);
        }

        Ok(Some(value))
    }
}

#[async_trait]
impl ChainOracle for TronClient {
    async fn transaction_by_id(&self, txid: &str) -> Result<Option<serde_json::Value>, AppError> {
        // Transport failures are internal errors, distinct from a well-formed
        // negative verification result.
        self.get_transaction_by_id(txid).await.map_err(|e| {
            tracing::error!(txid = %txid, error = %e, "Chain oracle query failed");
            AppError::InternalError(anyhow!("Chain oracle query failed: {}", e))
        })
    }
}
