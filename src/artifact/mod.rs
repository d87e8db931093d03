//! Artifact store: the pre-trained classification pipeline used by the form pathway.
//!
//! The artifact is loaded once at process start into an immutable
//! `ArtifactStore`, then shared read-only (`Arc`) by every request. There
//! is no global cache and no reload path; replacing the model means a
//! restart.

pub mod schema;

pub use schema::ExportedPipeline;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::pipeline::TriageError;

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed artifact: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Unsupported artifact format version {0}")]
    UnsupportedVersion(u32),

    #[error("Invalid artifact: {0}")]
    Invalid(String),
}

impl From<ArtifactError> for TriageError {
    fn from(err: ArtifactError) -> Self {
        TriageError::ArtifactLoad(err.to_string())
    }
}

// ═══════════════════════════════════════════════════════════
// Feature rows
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureValue {
    Numeric(f64),
    Category(String),
}

/// Named input columns for one prediction, in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRow {
    columns: Vec<(String, FeatureValue)>,
}

impl FeatureRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn numeric(mut self, column: &str, value: f64) -> Self {
        self.columns
            .push((column.to_string(), FeatureValue::Numeric(value)));
        self
    }

    pub fn category(mut self, column: &str, value: &str) -> Self {
        self.columns
            .push((column.to_string(), FeatureValue::Category(value.to_string())));
        self
    }

    pub fn get(&self, column: &str) -> Option<&FeatureValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }
}

// ═══════════════════════════════════════════════════════════
// Classifier seam
// ═══════════════════════════════════════════════════════════

/// Anything that turns a feature row into a positive-class probability.
pub trait RiskClassifier: Send + Sync {
    fn predict_proba(&self, row: &FeatureRow) -> Result<f64, TriageError>;

    fn name(&self) -> &str;
}

/// Immutable handle to the loaded classification pipeline.
#[derive(Clone)]
pub struct ArtifactStore {
    source: Option<PathBuf>,
    classifier: Arc<dyn RiskClassifier>,
}

impl std::fmt::Debug for ArtifactStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactStore")
            .field("source", &self.source)
            .field("classifier", &self.classifier.name())
            .finish()
    }
}

impl ArtifactStore {
    /// Read, parse and validate the exported pipeline at `path`.
    pub fn load(path: &Path) -> Result<Self, TriageError> {
        let json = std::fs::read_to_string(path).map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let pipeline = ExportedPipeline::from_json(&json)?;

        info!(
            path = %path.display(),
            name = %pipeline.name,
            features = pipeline.encoded_width(),
            trained_at = ?pipeline.trained_at,
            "Model artifact loaded"
        );

        Ok(Self {
            source: Some(path.to_path_buf()),
            classifier: Arc::new(pipeline),
        })
    }

    /// Wrap an already-built classifier (tests, embedded models).
    pub fn from_classifier(classifier: Arc<dyn RiskClassifier>) -> Self {
        Self {
            source: None,
            classifier,
        }
    }

    pub fn classifier(&self) -> &dyn RiskClassifier {
        self.classifier.as_ref()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}
