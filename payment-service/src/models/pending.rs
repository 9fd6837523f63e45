//! Manual review queue model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A payment flagged for operator review.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingPayment {
    pub pending_id: Uuid,
    pub payment_id: Uuid,
    pub user_id: Uuid,
    pub reason: String,
    pub created_utc: DateTime<Utc>,
}
