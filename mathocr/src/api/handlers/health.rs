use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::state::AppState;

/// Health data returned by `GET /health`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct HealthData {
    pub status: String,
    pub version: String,
    /// `available` or `unavailable`.
    pub ocr: String,
}

/// `GET /health`
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service health status", body = HealthData),
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthData> {
    let ocr = if state.pipeline.engine_available() {
        "available"
    } else {
        "unavailable"
    };

    Json(HealthData {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        ocr: ocr.to_string(),
    })
}
