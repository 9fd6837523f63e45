//! Payment model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// How the user claims to have paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    UsdtTrc20,
    Receipt,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::UsdtTrc20 => "usdt_trc20",
            PaymentMethod::Receipt => "receipt",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "receipt" => PaymentMethod::Receipt,
            _ => PaymentMethod::UsdtTrc20,
        }
    }
}

/// Payment status. `Succeeded` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Waiting,
    NeedsReview,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Waiting => "waiting",
            PaymentStatus::NeedsReview => "needs_review",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "waiting" => PaymentStatus::Waiting,
            "needs_review" => PaymentStatus::NeedsReview,
            "succeeded" => PaymentStatus::Succeeded,
            "failed" => PaymentStatus::Failed,
            _ => PaymentStatus::Pending,
        }
    }

    /// Terminal payments admit no further transition.
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Succeeded | PaymentStatus::Failed)
    }
}

/// Operator decision on a payment under review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOutcome {
    // The published API sends capitalized values; accept both.
    #[serde(alias = "Approved")]
    Approved,
    #[serde(alias = "Rejected")]
    Rejected,
}

impl ReviewOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewOutcome::Approved => "approved",
            ReviewOutcome::Rejected => "rejected",
        }
    }
}

/// Payment. One-to-one with its Subscription at creation time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Payment {
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub subscription_id: Uuid,
    pub amount_usd: Decimal,
    pub method: String,
    pub tx_id: Option<String>,
    pub receipt_url: Option<String>,
    pub status: String,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Input for creating a payment alongside its subscription.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub amount_usd: Decimal,
    pub method: PaymentMethod,
    pub tx_id: Option<String>,
    pub receipt_url: Option<String>,
}
