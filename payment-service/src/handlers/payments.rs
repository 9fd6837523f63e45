//! Payment submission handlers.
//!
//! Implements the direct ledger writers (`/api/payments/submit-tx`,
//! `/api/payments/manual-receipt`) and the combined `/api/process-payment`
//! action dispatcher used by the dashboard.

use axum::{extract::State, http::StatusCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use service_core::extract::Json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    models::{CreatePayment, CreateSubscription, PaymentMethod, ReviewOutcome},
    services::metrics,
    AppState,
};

/// Review-queue reason recorded when automatic verification does not pass.
pub const AUTO_VERIFICATION_FAILED_REASON: &str = "Automatic verification failed";

fn default_plan() -> String {
    "Premium".to_string()
}

/// Request to submit an on-chain USDT payment.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitTxRequest {
    pub user_id: Uuid,
    #[serde(default = "default_plan")]
    pub plan: String,
    #[serde(alias = "months")]
    #[validate(range(min = 1, max = 36))]
    pub duration_months: i32,
    pub amount_usd: Decimal,
    pub tx_id: Option<String>,
}

/// Request to submit a manually uploaded payment receipt.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ManualReceiptRequest {
    pub user_id: Uuid,
    #[serde(default = "default_plan")]
    pub plan: String,
    #[serde(alias = "months")]
    #[validate(range(min = 1, max = 36))]
    pub duration_months: i32,
    pub amount_usd: Decimal,
    pub receipt_url: Option<String>,
}

/// Response after creating a submission.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionResponse {
    pub subscription_id: Uuid,
    pub payment_id: Uuid,
    pub status: String,
}

/// Submit an on-chain transaction id as payment for a subscription.
///
/// Creates the pending subscription and payment pair; verification happens
/// separately (either via `/api/process-payment` or `/api/verifyPayment`).
pub async fn submit_tx(
    State(state): State<AppState>,
    Json(payload): Json<SubmitTxRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>), AppError> {
    payload.validate()?;

    let tx_id = match payload.tx_id.as_deref() {
        Some(tx_id) if !tx_id.trim().is_empty() => tx_id.trim().to_string(),
        _ => {
            return Err(AppError::BadRequest(anyhow::anyhow!("txId is required")));
        }
    };

    tracing::info!(
        user_id = %payload.user_id,
        months = payload.duration_months,
        amount_usd = %payload.amount_usd,
        "Submitting on-chain payment"
    );

    let (subscription, payment) = state
        .db
        .create_submission(
            &CreateSubscription {
                user_id: payload.user_id,
                plan: payload.plan,
                duration_months: payload.duration_months,
            },
            &CreatePayment {
                amount_usd: payload.amount_usd,
                method: PaymentMethod::UsdtTrc20,
                tx_id: Some(tx_id),
                receipt_url: None,
            },
        )
        .await?;

    metrics::record_submission(PaymentMethod::UsdtTrc20.as_str());

    Ok((
        StatusCode::OK,
        Json(SubmissionResponse {
            subscription_id: subscription.subscription_id,
            payment_id: payment.payment_id,
            status: payment.status,
        }),
    ))
}

/// Submit a manually uploaded receipt as payment for a subscription.
///
/// Also enqueues a review entry so an operator can approve or reject it.
pub async fn manual_receipt(
    State(state): State<AppState>,
    Json(payload): Json<ManualReceiptRequest>,
) -> Result<(StatusCode, Json<SubmissionResponse>), AppError> {
    payload.validate()?;

    let receipt_url = match payload.receipt_url.as_deref() {
        Some(url) if !url.trim().is_empty() => url.trim().to_string(),
        _ => {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "receiptUrl is required"
            )));
        }
    };

    tracing::info!(
        user_id = %payload.user_id,
        months = payload.duration_months,
        amount_usd = %payload.amount_usd,
        "Submitting manual receipt payment"
    );

    let (subscription, payment) = state
        .db
        .create_submission(
            &CreateSubscription {
                user_id: payload.user_id,
                plan: payload.plan,
                duration_months: payload.duration_months,
            },
            &CreatePayment {
                amount_usd: payload.amount_usd,
                method: PaymentMethod::Receipt,
                tx_id: None,
                receipt_url: Some(receipt_url),
            },
        )
        .await?;

    metrics::record_submission(PaymentMethod::Receipt.as_str());

    Ok((
        StatusCode::OK,
        Json(SubmissionResponse {
            subscription_id: subscription.subscription_id,
            payment_id: payment.payment_id,
            status: payment.status,
        }),
    ))
}

/// Submission payload carried by the `SUBMIT` action.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequestData {
    pub user_id: Uuid,
    #[serde(default = "default_plan")]
    pub plan: String,
    #[serde(alias = "months")]
    #[validate(range(min = 1, max = 36))]
    pub duration_months: i32,
    pub amount_usd: Decimal,
    pub tx_id: Option<String>,
    pub receipt_url: Option<String>,
}

/// `/api/process-payment` request body, dispatched on `action`.
#[derive(Debug, Deserialize)]
#[serde(tag = "action")]
pub enum ProcessPaymentRequest {
    #[serde(rename = "SUBMIT")]
    Submit {
        #[serde(rename = "requestData")]
        request_data: SubmitRequestData,
    },
    #[serde(rename = "PROCESS", rename_all = "camelCase")]
    Process {
        request_id: Uuid,
        user_id: Uuid,
        status: ReviewOutcome,
        months: i32,
    },
}

/// Disposition of a `SUBMIT` action.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubmissionDisposition {
    AutoApproved,
    PendingReview,
}

/// `/api/process-payment` response; shape depends on the action.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ProcessPaymentResponse {
    Submitted { status: SubmissionDisposition },
    Processed { success: bool },
}

/// Combined submission/decision endpoint used by the dashboard.
///
/// `SUBMIT` creates the pending pair and, for on-chain submissions, runs
/// verification immediately: verified payments are auto-approved, anything
/// else lands in the manual review queue. `PROCESS` applies an operator
/// decision to an existing payment.
pub async fn process_payment(
    State(state): State<AppState>,
    Json(payload): Json<ProcessPaymentRequest>,
) -> Result<Json<ProcessPaymentResponse>, AppError> {
    match payload {
        ProcessPaymentRequest::Submit { request_data } => {
            submit_action(&state, request_data).await
        }
        ProcessPaymentRequest::Process {
            request_id,
            user_id,
            status,
            months,
        } => process_action(&state, request_id, user_id, status, months).await,
    }
}

async fn submit_action(
    state: &AppState,
    data: SubmitRequestData,
) -> Result<Json<ProcessPaymentResponse>, AppError> {
    data.validate()?;

    let tx_id = data
        .tx_id
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    let receipt_url = data
        .receipt_url
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    if tx_id.is_none() && receipt_url.is_none() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Either txId or receiptUrl is required"
        )));
    }

    let method = if tx_id.is_some() {
        PaymentMethod::UsdtTrc20
    } else {
        PaymentMethod::Receipt
    };

    let (_, payment) = state
        .db
        .create_submission(
            &CreateSubscription {
                user_id: data.user_id,
                plan: data.plan,
                duration_months: data.duration_months,
            },
            &CreatePayment {
                amount_usd: data.amount_usd,
                method,
                tx_id: tx_id.clone(),
                receipt_url,
            },
        )
        .await?;

    metrics::record_submission(method.as_str());

    let disposition = match tx_id {
        Some(tx_id) => {
            let outcome = state
                .verification
                .verify(&tx_id, Some(data.amount_usd))
                .await?;

            if outcome.verified() {
                state
                    .db
                    .apply_reconciliation(
                        payment.payment_id,
                        data.duration_months,
                        ReviewOutcome::Approved,
                    )
                    .await?;
                metrics::record_reconciliation(ReviewOutcome::Approved.as_str());
                SubmissionDisposition::AutoApproved
            } else {
                tracing::info!(
                    payment_id = %payment.payment_id,
                    reason = %outcome.message(),
                    "Automatic verification failed, queueing for review"
                );
                state
                    .db
                    .flag_for_review(
                        payment.payment_id,
                        data.user_id,
                        AUTO_VERIFICATION_FAILED_REASON,
                    )
                    .await?;
                SubmissionDisposition::PendingReview
            }
        }
        None => SubmissionDisposition::PendingReview,
    };

    Ok(Json(ProcessPaymentResponse::Submitted {
        status: disposition,
    }))
}

async fn process_action(
    state: &AppState,
    request_id: Uuid,
    user_id: Uuid,
    status: ReviewOutcome,
    months: i32,
) -> Result<Json<ProcessPaymentResponse>, AppError> {
    let payment = state
        .db
        .get_payment(request_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Payment not found")))?;

    if payment.user_id != user_id {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "userId does not match the payment"
        )));
    }

    state
        .db
        .apply_reconciliation(request_id, months, status)
        .await?;
    metrics::record_reconciliation(status.as_str());

    Ok(Json(ProcessPaymentResponse::Processed { success: true }))
}
