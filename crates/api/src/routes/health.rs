//! Liveness endpoint.

use axum::Json;
use saga::order_fulfillment::SAGA_TYPE;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub saga: &'static str,
}

/// GET /health
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        saga: SAGA_TYPE,
    })
}
