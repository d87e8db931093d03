//! Health check endpoint.

use axum::Json;
use serde::Serialize;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// `GET /health`: liveness check. Always `{"status":"ok"}` while the process
/// serves requests; model availability is logged at startup instead.
pub async fn check() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
