use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::{services::get_metrics, AppState};

/// Liveness probe.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "order-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness probe. Not ready until the store connection is open.
pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state
        .database
        .as_ref()
        .map_or(true, |database| database.is_open());

    if ready {
        (StatusCode::OK, Json(json!({ "status": "ready" })))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "starting" })),
        )
    }
}

/// Prometheus metrics endpoint.
pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
