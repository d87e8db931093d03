//! Symptom-photo prediction endpoint.

use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::RiskAssessment;
use crate::pipeline::assess_vision;

/// `POST /predict/vision` — heuristic scoring of an uploaded photograph,
/// in the server's configured vision mode.
pub async fn predict(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<RiskAssessment>, ApiError> {
    let bytes = super::read_upload(multipart).await?;
    let mode = ctx.vision_mode;

    let assessment = super::run_blocking(move || assess_vision(&bytes, mode)).await?;
    Ok(Json(assessment))
}
