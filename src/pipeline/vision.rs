//! Vision heuristic scorer for symptom photographs.
//!
//! The photo is reduced to a handful of pixel statistics and scored with
//! fixed threshold rules. The deterministic scorer is the reference
//! behaviour; `VisionMode::Exploratory` layers simulated uncertainty on top
//! and must be requested explicitly.

use image::RgbImage;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::imaging::{
    channel_means, compute_edge_density, compute_laplacian_variance, decode_rgb,
    mean_brightness, rgb_to_gray,
};
use super::TriageError;
use crate::models::{Mode, RiskAssessment, RiskTier};

// ═══════════════════════════════════════════════════════════
// Thresholds
// ═══════════════════════════════════════════════════════════

const RED_HIGH: f32 = 100.0;
const RED_VERY_HIGH: f32 = 120.0;
const DOMINANCE_MARGIN: f32 = 20.0;
const UNDEREXPOSED_BELOW: f32 = 50.0;
const OVEREXPOSED_ABOVE: f32 = 200.0;
const BLURRY_BELOW: f32 = 100.0;
const EDGE_DENSITY_HIGH: f32 = 0.05;

const HIGH_RISK_CONFIDENCE: f64 = 0.85;
const LOW_RISK_CONFIDENCE: f64 = 0.4;

/// Exploratory mode: maximum absolute confidence jitter.
const JITTER: f64 = 0.05;
const MAX_BONUS_ITEMS: usize = 2;

const BONUS_FACTORS: [&str; 4] = [
    "elevated_heart_rate",
    "skin_texture_irregularity",
    "possible_swelling",
    "temperature_variation",
];

const BONUS_ACTIONS: [&str; 4] = [
    "Record your heart rate twice daily",
    "Photograph the area daily to track changes",
    "Apply a cold compress for 15 minutes",
    "Stay well hydrated",
];

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// How the vision pathway turns a verdict into an assessment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum VisionMode {
    /// Fixed confidences, factors from the threshold rules only.
    #[default]
    Deterministic,
    /// Simulated clinical uncertainty: jittered confidence plus randomly drawn
    /// extra factors and recommendations. Not reproducible.
    Exploratory,
}

/// Pixel statistics the heuristic rules run on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageStats {
    pub red_mean: f32,
    pub green_mean: f32,
    pub blue_mean: f32,
    /// Mean grayscale intensity.
    pub brightness: f32,
    /// Laplacian variance.
    pub sharpness: f32,
    /// Fraction of pixels on a detected edge.
    pub edge_density: f32,
}

impl ImageStats {
    pub fn measure(rgb: &RgbImage) -> Self {
        let [red_mean, green_mean, blue_mean] = channel_means(rgb);
        let gray = rgb_to_gray(rgb);

        Self {
            red_mean,
            green_mean,
            blue_mean,
            brightness: mean_brightness(&gray),
            sharpness: compute_laplacian_variance(&gray),
            edge_density: compute_edge_density(&gray),
        }
    }
}

/// Outcome of the threshold rules.
#[derive(Debug, Clone, PartialEq)]
pub struct VisionVerdict {
    pub high_risk: bool,
    /// One tag per category: redness, colour balance, brightness, sharpness, edges.
    pub factors: Vec<&'static str>,
}

// ═══════════════════════════════════════════════════════════
// Scoring
// ═══════════════════════════════════════════════════════════

/// Apply the threshold rules to measured statistics.
pub fn score(stats: &ImageStats) -> VisionVerdict {
    let high_risk = stats.red_mean > RED_HIGH || stats.edge_density > EDGE_DENSITY_HIGH;

    let redness = if stats.red_mean > RED_VERY_HIGH {
        "very_high_redness"
    } else if stats.red_mean > RED_HIGH {
        "high_redness"
    } else {
        "normal_redness"
    };

    let balance = if stats.red_mean - stats.green_mean > DOMINANCE_MARGIN {
        "red_dominant"
    } else if stats.green_mean - stats.red_mean > DOMINANCE_MARGIN {
        "green_dominant"
    } else {
        "balanced_color"
    };

    let exposure = if stats.brightness < UNDEREXPOSED_BELOW {
        "underexposed"
    } else if stats.brightness > OVEREXPOSED_ABOVE {
        "overexposed"
    } else {
        "normal_brightness"
    };

    let sharpness = if stats.sharpness < BLURRY_BELOW {
        "blurry_image"
    } else {
        "sharp_image"
    };

    let edges = if stats.edge_density > EDGE_DENSITY_HIGH {
        "high_edge_activity"
    } else {
        "low_edge_activity"
    };

    VisionVerdict {
        high_risk,
        factors: vec![redness, balance, exposure, sharpness, edges],
    }
}

/// Deterministic assessment for measured statistics.
pub fn assess_stats(stats: &ImageStats) -> RiskAssessment {
    let verdict = score(stats);
    let (tier, confidence) = if verdict.high_risk {
        (RiskTier::High, HIGH_RISK_CONFIDENCE)
    } else {
        (RiskTier::Low, LOW_RISK_CONFIDENCE)
    };

    RiskAssessment::assemble(
        Mode::Vision,
        tier,
        confidence,
        verdict.factors.iter().map(|f| f.to_string()).collect(),
    )
}

/// Run the vision pathway on raw upload bytes.
pub fn assess_vision(image_bytes: &[u8], mode: VisionMode) -> Result<RiskAssessment, TriageError> {
    assess_vision_with_rng(image_bytes, mode, &mut rand::thread_rng())
}

/// Same as [`assess_vision`] with an explicit randomness source for the
/// exploratory mode. Deterministic mode never touches `rng`.
pub fn assess_vision_with_rng<R: Rng + ?Sized>(
    image_bytes: &[u8],
    mode: VisionMode,
    rng: &mut R,
) -> Result<RiskAssessment, TriageError> {
    let rgb = decode_rgb(image_bytes)?;
    let stats = ImageStats::measure(&rgb);
    debug!(
        width = rgb.width(),
        height = rgb.height(),
        red = stats.red_mean,
        green = stats.green_mean,
        blue = stats.blue_mean,
        brightness = stats.brightness,
        sharpness = stats.sharpness,
        edge_density = stats.edge_density,
        "Vision statistics measured"
    );

    let assessment = match mode {
        VisionMode::Deterministic => assess_stats(&stats),
        VisionMode::Exploratory => {
            warn!("Vision scorer running in exploratory mode, output is randomized");
            apply_simulated_uncertainty(assess_stats(&stats), rng)
        }
    };

    info!(
        prediction = assessment.prediction.as_str(),
        confidence = assessment.confidence,
        ?mode,
        "Vision assessment complete"
    );
    Ok(assessment)
}

/// Jitter the confidence and append randomly drawn bonus factors and actions.
fn apply_simulated_uncertainty<R: Rng + ?Sized>(base: RiskAssessment, rng: &mut R) -> RiskAssessment {
    let confidence = (base.confidence + rng.gen_range(-JITTER..=JITTER)).clamp(0.0, 1.0);
    let mut jittered =
        RiskAssessment::assemble(Mode::Vision, base.prediction, confidence, base.top_factors);

    let factor_count = rng.gen_range(0..=MAX_BONUS_ITEMS);
    jittered
        .top_factors
        .extend(BONUS_FACTORS.choose_multiple(rng, factor_count).map(|f| f.to_string()));

    let action_count = rng.gen_range(0..=MAX_BONUS_ITEMS);
    jittered
        .recommended_actions
        .extend(BONUS_ACTIONS.choose_multiple(rng, action_count).map(|a| a.to_string()));

    jittered
        .description
        .push_str(" Simulated uncertainty applied (exploratory mode).");
    jittered
}
