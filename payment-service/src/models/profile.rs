//! User profile view of subscription state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// The user-facing subscription fields on a profile. Mutated only by
/// reconciliation after an approved payment.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub user_id: Uuid,
    pub subscription_tier: Option<String>,
    pub subscription_status: Option<String>,
    pub subscription_expiry_date: Option<DateTime<Utc>>,
    pub updated_utc: DateTime<Utc>,
}
