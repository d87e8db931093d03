//! API endpoint handlers, one module per route.

pub mod form;
pub mod health;
pub mod text_image;
pub mod vision;

use axum::extract::Multipart;

use crate::api::error::ApiError;

/// Multipart field carrying the uploaded image.
pub const UPLOAD_FIELD: &str = "file";

/// Pull the bytes of the `file` field out of a multipart body.
///
/// Other fields are ignored. A missing or empty file is a bad request.
pub(crate) async fn read_upload(mut multipart: Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let bytes = field.bytes().await?;
        if bytes.is_empty() {
            return Err(ApiError::BadRequest("Uploaded file is empty".into()));
        }
        return Ok(bytes.to_vec());
    }
    Err(ApiError::BadRequest(format!(
        "Multipart field '{UPLOAD_FIELD}' is required"
    )))
}

/// Run a pathway on the blocking pool so decoding and OCR never stall the runtime.
pub(crate) async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, crate::pipeline::TriageError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError::Internal(format!("Triage task failed: {e}")))?
        .map_err(ApiError::from)
}
