//! Subscription model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Subscription status.
///
/// `Expired` is never written by the workflow itself; read paths compute
/// effective expiry from `expiry_date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "active" => SubscriptionStatus::Active,
            "expired" => SubscriptionStatus::Expired,
            _ => SubscriptionStatus::Pending,
        }
    }
}

/// Subscription.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Subscription {
    pub subscription_id: Uuid,
    pub user_id: Uuid,
    pub plan: String,
    pub duration_months: i32,
    pub status: String,
    pub expiry_date: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl Subscription {
    /// Whether this subscription is active right now. Expiry is evaluated at
    /// read time; there is no stored `expired` transition.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active.as_str()
            && self.expiry_date.map(|e| e > now).unwrap_or(false)
    }
}

/// Input for creating a subscription.
#[derive(Debug, Clone)]
pub struct CreateSubscription {
    pub user_id: Uuid,
    pub plan: String,
    pub duration_months: i32,
}
