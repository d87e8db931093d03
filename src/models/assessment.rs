//! The normalized result every triage pathway returns.

use serde::{Deserialize, Serialize};

/// Which pathway produced an assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    #[serde(rename = "form")]
    Form,
    #[serde(rename = "text-image")]
    TextImage,
    #[serde(rename = "vision")]
    Vision,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Form => "form",
            Mode::TextImage => "text-image",
            Mode::Vision => "vision",
        }
    }

    /// Fixed factor applied to confidence to obtain the readmission probability.
    pub fn readmission_scale(self) -> f64 {
        match self {
            Mode::Form => 0.9,
            Mode::TextImage => 0.7,
            Mode::Vision => 0.95,
        }
    }

    /// Document triage never predicts readmission; the other pathways flag it
    /// for high-risk results only.
    pub fn flags_readmission(self, tier: RiskTier) -> bool {
        match self {
            Mode::TextImage => false,
            Mode::Form | Mode::Vision => tier == RiskTier::High,
        }
    }
}

/// Primary triage output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    #[serde(rename = "low_risk")]
    Low,
    #[serde(rename = "medium_risk")]
    Medium,
    #[serde(rename = "high_risk")]
    High,
}

impl RiskTier {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskTier::Low => "low_risk",
            RiskTier::Medium => "medium_risk",
            RiskTier::High => "high_risk",
        }
    }

    pub fn urgency(self) -> Urgency {
        match self {
            RiskTier::Low => Urgency::Low,
            RiskTier::Medium => Urgency::Medium,
            RiskTier::High => Urgency::High,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

/// Unified response contract shared by the form, text-image and vision pathways.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub mode: Mode,
    pub prediction: RiskTier,
    pub confidence: f64,
    pub top_factors: Vec<String>,
    pub description: String,
    pub recommended_actions: Vec<String>,
    pub urgency: Urgency,
    pub hospital_readmission: bool,
    pub readmission_probability: f64,
}

impl RiskAssessment {
    /// Assemble an assessment from a pathway verdict.
    ///
    /// Urgency, readmission fields and the narrative are derived here so every
    /// pathway stays consistent. `confidence` is rounded to three decimals and
    /// the readmission probability is computed from the rounded value.
    pub fn assemble(mode: Mode, tier: RiskTier, confidence: f64, top_factors: Vec<String>) -> Self {
        let confidence = round3(confidence);
        let (description, actions) = narrative(mode, tier);

        Self {
            mode,
            prediction: tier,
            confidence,
            top_factors,
            description: description.to_string(),
            recommended_actions: actions.iter().map(|a| a.to_string()).collect(),
            urgency: tier.urgency(),
            hospital_readmission: mode.flags_readmission(tier),
            readmission_probability: round3(confidence * mode.readmission_scale()),
        }
    }
}

/// Round to three decimals, half away from zero.
pub fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

fn narrative(mode: Mode, tier: RiskTier) -> (&'static str, &'static [&'static str]) {
    match (mode, tier) {
        (Mode::Form, RiskTier::High) => (
            "Submitted vitals indicate an elevated cardiovascular risk profile.",
            &[
                "Schedule a physician consultation within one week",
                "Monitor blood pressure daily",
                "Review cholesterol management with a clinician",
            ],
        ),
        (Mode::Form, RiskTier::Medium) => (
            "Submitted vitals show moderate risk markers worth following up.",
            &[
                "Book a routine check-up",
                "Track blood pressure weekly",
                "Adopt a heart-healthy diet",
            ],
        ),
        (Mode::Form, RiskTier::Low) => (
            "Submitted vitals are within a low-risk profile.",
            &["Maintain current lifestyle", "Repeat screening annually"],
        ),
        (Mode::TextImage, RiskTier::Low) => (
            "No risk-related keywords were found in the document.",
            &["No immediate action required", "Keep the document for your records"],
        ),
        (Mode::TextImage, _) => (
            "The document mentions symptoms or medication dosing that may need review.",
            &[
                "Review the document with a pharmacist or physician",
                "Confirm dosage instructions before the next dose",
            ],
        ),
        (Mode::Vision, RiskTier::Low) => (
            "No strong visual indicators of inflammation were detected.",
            &["Keep monitoring the area", "Retake the photo in good lighting if symptoms change"],
        ),
        (Mode::Vision, _) => (
            "Visual indicators such as redness or irregular texture suggest possible inflammation.",
            &[
                "Have the affected area examined by a clinician",
                "Avoid irritating the area",
                "Seek urgent care if swelling, heat or fever develop",
            ],
        ),
    }
}
