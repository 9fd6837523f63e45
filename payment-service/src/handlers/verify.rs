//! On-chain payment verification endpoint.

use axum::extract::State;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use service_core::extract::Json;

use crate::AppState;

/// Request to verify an on-chain transaction.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub txid: String,
    pub expected_amount: Option<Decimal>,
}

/// Verification result. A negative result is a 200 business outcome.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    pub message: String,
}

/// Verify a claimed USDT transfer against the chain oracle.
pub async fn verify_payment(
    State(state): State<AppState>,
    Json(payload): Json<VerifyPaymentRequest>,
) -> Result<Json<VerifyPaymentResponse>, AppError> {
    if payload.txid.trim().is_empty() {
        return Err(AppError::BadRequest(anyhow::anyhow!("txid is required")));
    }

    tracing::info!(
        txid = %payload.txid,
        expected_amount = ?payload.expected_amount,
        "Verifying payment"
    );

    let outcome = state
        .verification
        .verify(payload.txid.trim(), payload.expected_amount)
        .await?;

    Ok(Json(VerifyPaymentResponse {
        verified: outcome.verified(),
        amount: outcome.amount(),
        message: outcome.message(),
    }))
}
