//! One-shot assessment of a local file, without the HTTP server.

use std::path::Path;

use tracing::debug;

use super::{read_file, CommandError};
use crate::artifact::ArtifactStore;
use crate::config::{AssessTarget, OcrArgs};
use crate::models::{FormRecord, RiskAssessment};
use crate::pipeline::{assess_document, assess_form, assess_vision, ocr, VisionMode};

pub fn run(
    model_path: &Path,
    ocr_args: &OcrArgs,
    target: AssessTarget,
) -> Result<RiskAssessment, CommandError> {
    match target {
        AssessTarget::Form { record } => {
            let record = read_record(&record)?;
            record.validate()?;
            let artifact = ArtifactStore::load(model_path)?;
            Ok(assess_form(&record, &artifact)?)
        }
        AssessTarget::TextImage { image } => {
            let bytes = read_file(&image)?;
            let engine = ocr::default_engine(ocr_args.tessdata_dir.clone(), &ocr_args.ocr_lang)?;
            debug!(engine = engine.name(), "OCR engine ready");
            Ok(assess_document(&bytes, engine.as_ref())?)
        }
        AssessTarget::Vision { image, exploratory } => {
            let bytes = read_file(&image)?;
            let mode = if exploratory {
                VisionMode::Exploratory
            } else {
                VisionMode::Deterministic
            };
            Ok(assess_vision(&bytes, mode)?)
        }
    }
}

fn read_record(path: &Path) -> Result<FormRecord, CommandError> {
    let bytes = read_file(path)?;
    serde_json::from_slice(&bytes).map_err(|e| CommandError::Record(e.to_string()))
}
