//! Subscription status endpoint.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use uuid::Uuid;

use crate::{models::Subscription, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusParams {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionView {
    pub subscription_id: Uuid,
    pub plan: String,
    pub duration_months: i32,
    pub status: String,
    pub expiry_date: Option<DateTime<Utc>>,
}

impl From<Subscription> for SubscriptionView {
    fn from(s: Subscription) -> Self {
        Self {
            subscription_id: s.subscription_id,
            plan: s.plan,
            duration_months: s.duration_months,
            status: s.status,
            expiry_date: s.expiry_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatusResponse {
    pub active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription: Option<SubscriptionView>,
}

/// Report whether the user currently has an active subscription. Expiry is
/// evaluated at read time; nothing is mutated here.
pub async fn status(
    State(state): State<AppState>,
    Query(params): Query<StatusParams>,
) -> Result<Json<SubscriptionStatusResponse>, AppError> {
    let subscription = state.db.get_active_subscription(params.user_id).await?;

    Ok(Json(SubscriptionStatusResponse {
        active: subscription.is_some(),
        subscription: subscription.map(SubscriptionView::from),
    }))
}
