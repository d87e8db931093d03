//! Document triage: OCR text scanned for a fixed set of risk keywords.

use tracing::{debug, info};

use super::imaging::{decode_image, encode_png};
use super::ocr::OcrEngine;
use super::TriageError;
use crate::models::{Mode, RiskAssessment, RiskTier};

/// Lower-case keywords whose presence flags a document for review.
pub const RISK_KEYWORDS: [&str; 4] = ["pain", "headache", "prescription", "dose"];

const FLAGGED_CONFIDENCE: f64 = 0.8;
const CLEAR_CONFIDENCE: f64 = 0.5;

/// Run the text-image pathway on raw upload bytes.
///
/// The bytes are decoded first so that non-images fail fast with
/// `InputDecode` before any OCR work; the engine then receives a lossless,
/// orientation-corrected PNG.
pub fn assess_document(
    image_bytes: &[u8],
    ocr: &dyn OcrEngine,
) -> Result<RiskAssessment, TriageError> {
    let image = decode_image(image_bytes)?;
    let png = encode_png(&image)?;

    let page = ocr.ocr_image(&png)?;
    debug!(
        engine = ocr.name(),
        chars = page.text.len(),
        ocr_confidence = page.confidence,
        "Document text extracted"
    );

    let assessment = triage_text(&page.text);
    info!(
        prediction = assessment.prediction.as_str(),
        "Document triage complete"
    );
    Ok(assessment)
}

/// Classify already-extracted text.
pub fn triage_text(text: &str) -> RiskAssessment {
    let flagged = contains_risk_keyword(text);

    let (tier, confidence, factor) = if flagged {
        (RiskTier::Medium, FLAGGED_CONFIDENCE, "keyword_match")
    } else {
        (RiskTier::Low, CLEAR_CONFIDENCE, "no_keywords")
    };

    RiskAssessment::assemble(Mode::TextImage, tier, confidence, vec![factor.to_string()])
}

/// Case-insensitive substring test against `RISK_KEYWORDS`.
pub fn contains_risk_keyword(text: &str) -> bool {
    let lowered = text.to_lowercase();
    RISK_KEYWORDS.iter().any(|k| lowered.contains(k))
}
