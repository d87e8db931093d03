//! Document (text-image) prediction endpoint.

use axum::extract::{Multipart, State};
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::RiskAssessment;
use crate::pipeline::assess_document;

/// `POST /predict/text-image` — OCR keyword triage of an uploaded document photo.
pub async fn predict(
    State(ctx): State<ApiContext>,
    multipart: Multipart,
) -> Result<Json<RiskAssessment>, ApiError> {
    let bytes = super::read_upload(multipart).await?;
    let ocr = ctx.ocr.clone();

    let assessment = super::run_blocking(move || assess_document(&bytes, ocr.as_ref())).await?;
    Ok(Json(assessment))
}
