//! Admin review surface.
//!
//! Lists payments awaiting a decision and applies operator outcomes via the
//! same reconciliation step the automatic path uses. A thin dispatcher, no
//! extra business logic.

use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use service_core::extract::Json;
use uuid::Uuid;
use validator::Validate;

use crate::{models::Payment, models::ReviewOutcome, services::metrics, AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentView {
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Uuid,
    pub amount_usd: Decimal,
    pub method: String,
    pub tx_id: Option<String>,
    pub receipt_url: Option<String>,
    pub status: String,
    pub created_utc: DateTime<Utc>,
}

impl From<Payment> for PaymentView {
    fn from(p: Payment) -> Self {
        Self {
            payment_id: p.payment_id,
            user_id: p.user_id,
            subscription_id: p.subscription_id,
            amount_usd: p.amount_usd,
            method: p.method,
            tx_id: p.tx_id,
            receipt_url: p.receipt_url,
            status: p.status,
            created_utc: p.created_utc,
        }
    }
}

/// List payments with status pending, waiting, or needs_review.
pub async fn list_review_queue(
    State(state): State<AppState>,
) -> Result<Json<Vec<PaymentView>>, AppError> {
    let payments = state.db.list_review_queue().await?;
    Ok(Json(payments.into_iter().map(PaymentView::from).collect()))
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub outcome: ReviewOutcome,
    #[validate(range(min = 1, max = 36))]
    pub months: i32,
}

#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    pub success: bool,
}

/// Apply an operator decision to a payment under review.
pub async fn review_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<Uuid>,
    Json(payload): Json<ReviewRequest>,
) -> Result<Json<ReviewResponse>, AppError> {
    payload.validate()?;

    state
        .db
        .get_payment(payment_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment not found")))?;

    tracing::info!(
        payment_id = %payment_id,
        outcome = payload.outcome.as_str(),
        months = payload.months,
        "Applying operator review decision"
    );

    state
        .db
        .apply_reconciliation(payment_id, payload.months, payload.outcome)
        .await?;
    metrics::record_reconciliation(payload.outcome.as_str());

    Ok(Json(ReviewResponse { success: true }))
}
