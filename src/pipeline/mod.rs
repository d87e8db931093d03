//! Triage pathways: structured form, document image and symptom photo.
//!
//! Each pathway is a synchronous, request-scoped computation returning a
//! `RiskAssessment`. Callers on an async runtime should run them on the
//! blocking pool.

pub mod document;
pub mod form;
pub mod imaging;
pub mod ocr;
pub mod vision;

pub use document::assess_document;
pub use form::assess_form;
pub use vision::{assess_vision, assess_vision_with_rng, VisionMode};

use thiserror::Error;

/// Failure taxonomy shared by every pathway.
///
/// Library errors (image decoding, OCR, artifact parsing) are narrowed into
/// one of these kinds at the boundary where they occur.
#[derive(Error, Debug)]
pub enum TriageError {
    /// The classification artifact could not be loaded. Fatal for the form pathway.
    #[error("Model artifact unavailable: {0}")]
    ArtifactLoad(String),

    /// Uploaded bytes could not be decoded, or OCR could not read them.
    #[error("Input could not be decoded: {0}")]
    InputDecode(String),

    /// Feature mapping or model evaluation failed unexpectedly.
    #[error("Inference failed: {0}")]
    Inference(String),
}

impl TriageError {
    pub fn kind(&self) -> &'static str {
        match self {
            TriageError::ArtifactLoad(_) => "artifact_load",
            TriageError::InputDecode(_) => "input_decode",
            TriageError::Inference(_) => "inference",
        }
    }
}
