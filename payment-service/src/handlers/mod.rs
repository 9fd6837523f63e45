//! HTTP handlers for payment-service.

pub mod admin;
pub mod payments;
pub mod subscriptions;
pub mod verify;

use crate::services::get_metrics;
use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "payment-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness probe; fails when the database is unreachable.
pub async fn readiness_check(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    state.db.health_check().await?;
    Ok((StatusCode::OK, Json(json!({ "status": "ready" }))))
}

/// Prometheus metrics endpoint.
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
