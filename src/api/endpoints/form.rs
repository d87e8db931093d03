//! Structured-form prediction endpoint.

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ModelState};
use crate::models::{FormRecord, RiskAssessment};
use crate::pipeline::assess_form;

/// `POST /predict/form` — classify a JSON form record.
///
/// Malformed JSON is a 400; out-of-range fields are a 422 listing every
/// violation, so the classifier only ever sees validated records.
pub async fn predict(
    State(ctx): State<ApiContext>,
    payload: Result<Json<FormRecord>, JsonRejection>,
) -> Result<Json<RiskAssessment>, ApiError> {
    let Json(record) = payload?;
    record.validate()?;

    let artifact = match ctx.model.as_ref() {
        ModelState::Ready(store) => store.clone(),
        ModelState::Unavailable(reason) => return Err(ApiError::ModelUnavailable(reason.clone())),
    };

    let assessment = super::run_blocking(move || assess_form(&record, &artifact)).await?;
    Ok(Json(assessment))
}
