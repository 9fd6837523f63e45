//! Verification attempt audit model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// One audit record of a single oracle query and its outcome. Append-only;
/// written for every query regardless of the result.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct VerificationAttempt {
    pub attempt_id: Uuid,
    pub txid: String,
    pub platform_address: String,
    pub amount_usdt: Option<Decimal>,
    pub verified: bool,
    pub raw_response: serde_json::Value,
    pub created_utc: DateTime<Utc>,
}

/// Input for recording a verification attempt.
#[derive(Debug, Clone)]
pub struct RecordVerification {
    pub txid: String,
    pub platform_address: String,
    pub amount_usdt: Option<Decimal>,
    pub verified: bool,
    pub raw_response: serde_json::Value,
}
