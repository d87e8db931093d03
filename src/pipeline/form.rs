//! Structured-form pathway: form record → training feature schema → classifier → tier.

use tracing::{debug, info};

use super::TriageError;
use crate::artifact::{ArtifactStore, FeatureRow};
use crate::models::{FormRecord, Mode, RiskAssessment, RiskTier};

pub const HIGH_RISK_PROBABILITY: f64 = 0.70;
pub const MEDIUM_RISK_PROBABILITY: f64 = 0.40;

/// Systolic pressure above which the record is treated as febrile.
const FEVER_SYSTOLIC: f64 = 130.0;
/// Systolic pressure above which blood pressure is categorized `High`.
const HIGH_SYSTOLIC: f64 = 140.0;
const HIGH_CHOLESTEROL: f64 = 240.0;

const MAX_FACTORS: usize = 2;

// Columns the form does not capture; filled with fixed placeholders.
const PLACEHOLDER_SYMPTOM: &str = "No";
const PLACEHOLDER_GENDER: &str = "Male";

/// Run the form pathway against the loaded artifact.
///
/// The record must already be validated; a record that is out of range here
/// is a caller bug and surfaces as `Inference`.
pub fn assess_form(
    record: &FormRecord,
    artifact: &ArtifactStore,
) -> Result<RiskAssessment, TriageError> {
    let row = feature_row(record)?;

    let probability = artifact.classifier().predict_proba(&row)?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(TriageError::Inference(format!(
            "classifier returned probability {probability} outside [0, 1]"
        )));
    }

    let tier = tier_for_probability(probability);
    let factors = contributing_factors(record);
    debug!(
        model = artifact.classifier().name(),
        probability,
        "Form classified"
    );

    let assessment = RiskAssessment::assemble(Mode::Form, tier, probability, factors);
    info!(
        prediction = assessment.prediction.as_str(),
        confidence = assessment.confidence,
        "Form triage complete"
    );
    Ok(assessment)
}

/// Map a form record onto the column layout the classifier was trained on.
pub fn feature_row(record: &FormRecord) -> Result<FeatureRow, TriageError> {
    record
        .validate()
        .map_err(|e| TriageError::Inference(format!("unvalidated form record reached the classifier: {e}")))?;

    let fever = if record.systolic_bp > FEVER_SYSTOLIC { "Yes" } else { "No" };
    let blood_pressure = if record.systolic_bp > HIGH_SYSTOLIC { "High" } else { "Normal" };
    let cholesterol = if record.cholesterol > HIGH_CHOLESTEROL { "High" } else { "Normal" };

    Ok(FeatureRow::new()
        .numeric("Age", f64::from(record.age))
        .category("Fever", fever)
        .category("Cough", PLACEHOLDER_SYMPTOM)
        .category("Fatigue", PLACEHOLDER_SYMPTOM)
        .category("Difficulty Breathing", PLACEHOLDER_SYMPTOM)
        .category("Gender", PLACEHOLDER_GENDER)
        .category("Blood Pressure", blood_pressure)
        .category("Cholesterol Level", cholesterol))
}

/// Bucket a raw (unrounded) probability into a tier.
pub fn tier_for_probability(probability: f64) -> RiskTier {
    if probability >= HIGH_RISK_PROBABILITY {
        RiskTier::High
    } else if probability >= MEDIUM_RISK_PROBABILITY {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

/// Rule-derived factors, in evaluation order, at most two.
pub fn contributing_factors(record: &FormRecord) -> Vec<String> {
    let mut factors = Vec::new();
    if record.systolic_bp > HIGH_SYSTOLIC {
        factors.push("high_systolic_bp");
    }
    if record.cholesterol > HIGH_CHOLESTEROL {
        factors.push("high_cholesterol");
    }
    if record.family_history {
        factors.push("family_history");
    }
    if factors.is_empty() {
        factors.push("age_factor");
    }
    factors.truncate(MAX_FACTORS);
    factors.into_iter().map(String::from).collect()
}
