//! API error types with structured JSON responses.

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::models::{FieldViolation, FormValidationError};
use crate::pipeline::TriageError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldViolation>,
}

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),
    #[error("Validation failed: {0}")]
    Validation(FormValidationError),
    #[error("Unreadable input: {0}")]
    InputDecode(String),
    #[error("Upload too large")]
    PayloadTooLarge,
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, fields) = match self {
            ApiError::BadRequest(detail) => {
                (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail, Vec::new())
            }
            ApiError::Validation(err) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_FAILED",
                format!("{} field(s) out of range", err.violations.len()),
                err.violations,
            ),
            ApiError::InputDecode(detail) => {
                (StatusCode::BAD_REQUEST, "INPUT_DECODE", detail, Vec::new())
            }
            ApiError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "Upload exceeds the configured size limit".to_string(),
                Vec::new(),
            ),
            ApiError::ModelUnavailable(detail) => {
                tracing::warn!(detail, "Form request while model artifact unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "ARTIFACT_UNAVAILABLE",
                    "The form classification model is not loaded".to_string(),
                    Vec::new(),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    Vec::new(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                fields,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<TriageError> for ApiError {
    fn from(err: TriageError) -> Self {
        match err {
            TriageError::InputDecode(detail) => ApiError::InputDecode(detail),
            TriageError::ArtifactLoad(detail) => ApiError::ModelUnavailable(detail),
            TriageError::Inference(detail) => ApiError::Internal(detail),
        }
    }
}

impl From<FormValidationError> for ApiError {
    fn from(err: FormValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest(err.body_text())
        }
    }
}
