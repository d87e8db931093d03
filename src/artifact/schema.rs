//! JSON export format of the offline-trained classification pipeline.
//!
//! Mirrors the training pipeline: a standard scaler over numeric columns, a
//! one-hot encoder (unknown categories encode to all zeros) over categorical
//! columns, then either a logistic regression or a boosted tree ensemble.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ArtifactError, FeatureRow, FeatureValue, RiskClassifier};
use crate::pipeline::TriageError;

/// The only export format version this build understands.
pub const SUPPORTED_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportedPipeline {
    pub format_version: u32,
    pub name: String,
    #[serde(default)]
    pub trained_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub numeric: Vec<NumericColumn>,
    #[serde(default)]
    pub categorical: Vec<CategoricalColumn>,
    pub classifier: ClassifierSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericColumn {
    pub column: String,
    pub mean: f64,
    pub scale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub column: String,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierSpec {
    LogisticRegression {
        coefficients: Vec<f64>,
        intercept: f64,
    },
    TreeEnsemble {
        base_score: f64,
        trees: Vec<Tree>,
    },
}

/// One boosted tree. Node 0 is the root; children always have larger indices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<TreeNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go `left` when the encoded feature is below `threshold`.
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

impl ExportedPipeline {
    /// Parse and validate an exported pipeline.
    pub fn from_json(json: &str) -> Result<Self, ArtifactError> {
        let pipeline: Self = serde_json::from_str(json)?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// Width of the encoded feature vector.
    pub fn encoded_width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    fn validate(&self) -> Result<(), ArtifactError> {
        if self.format_version != SUPPORTED_FORMAT_VERSION {
            return Err(ArtifactError::UnsupportedVersion(self.format_version));
        }
        if self.numeric.is_empty() && self.categorical.is_empty() {
            return Err(ArtifactError::Invalid("pipeline has no input columns".into()));
        }
        for col in &self.numeric {
            if !col.mean.is_finite() || !col.scale.is_finite() {
                return Err(ArtifactError::Invalid(format!(
                    "numeric column '{}' has non-finite scaler parameters",
                    col.column
                )));
            }
        }
        for col in &self.categorical {
            if col.categories.is_empty() {
                return Err(ArtifactError::Invalid(format!(
                    "categorical column '{}' has no categories",
                    col.column
                )));
            }
        }

        let width = self.encoded_width();
        match &self.classifier {
            ClassifierSpec::LogisticRegression {
                coefficients,
                intercept,
            } => {
                if coefficients.len() != width {
                    return Err(ArtifactError::Invalid(format!(
                        "expected {width} coefficients, found {}",
                        coefficients.len()
                    )));
                }
                if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(ArtifactError::Invalid("non-finite coefficient".into()));
                }
            }
            ClassifierSpec::TreeEnsemble { trees, .. } => {
                if trees.is_empty() {
                    return Err(ArtifactError::Invalid("tree ensemble is empty".into()));
                }
                for (t, tree) in trees.iter().enumerate() {
                    validate_tree(t, tree, width)?;
                }
            }
        }
        Ok(())
    }

    /// Scale and one-hot encode a feature row in training column order.
    pub fn encode(&self, row: &FeatureRow) -> Result<Vec<f64>, TriageError> {
        let mut encoded = Vec::with_capacity(self.encoded_width());

        for col in &self.numeric {
            let value = match row.get(&col.column) {
                Some(FeatureValue::Numeric(v)) => *v,
                Some(FeatureValue::Category(_)) => {
                    return Err(TriageError::Inference(format!(
                        "feature '{}' must be numeric",
                        col.column
                    )))
                }
                None => {
                    return Err(TriageError::Inference(format!(
                        "missing numeric feature '{}'",
                        col.column
                    )))
                }
            };
            let scale = if col.scale == 0.0 { 1.0 } else { col.scale };
            encoded.push((value - col.mean) / scale);
        }

        for col in &self.categorical {
            let value = match row.get(&col.column) {
                Some(FeatureValue::Category(c)) => c.as_str(),
                Some(FeatureValue::Numeric(_)) => {
                    return Err(TriageError::Inference(format!(
                        "feature '{}' must be categorical",
                        col.column
                    )))
                }
                None => {
                    return Err(TriageError::Inference(format!(
                        "missing categorical feature '{}'",
                        col.column
                    )))
                }
            };
            encoded.extend(
                col.categories
                    .iter()
                    .map(|c| if c == value { 1.0 } else { 0.0 }),
            );
        }

        Ok(encoded)
    }

    fn margin(&self, x: &[f64]) -> f64 {
        match &self.classifier {
            ClassifierSpec::LogisticRegression {
                coefficients,
                intercept,
            } => intercept + coefficients.iter().zip(x).map(|(w, v)| w * v).sum::<f64>(),
            ClassifierSpec::TreeEnsemble { base_score, trees } => {
                base_score + trees.iter().map(|t| t.leaf_value(x)).sum::<f64>()
            }
        }
    }
}

impl Tree {
    fn leaf_value(&self, x: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes[idx] {
                TreeNode::Leaf { value } => return value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => idx = if x[feature] < threshold { left } else { right },
            }
        }
    }
}

fn validate_tree(t: usize, tree: &Tree, width: usize) -> Result<(), ArtifactError> {
    if tree.nodes.is_empty() {
        return Err(ArtifactError::Invalid(format!("tree {t} has no nodes")));
    }
    for (idx, node) in tree.nodes.iter().enumerate() {
        match *node {
            TreeNode::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if feature >= width {
                    return Err(ArtifactError::Invalid(format!(
                        "tree {t} node {idx} splits on feature {feature}, width is {width}"
                    )));
                }
                // Forward-only children rule out cycles, so evaluation terminates
                let in_bounds = |c: usize| c > idx && c < tree.nodes.len();
                if !in_bounds(left) || !in_bounds(right) {
                    return Err(ArtifactError::Invalid(format!(
                        "tree {t} node {idx} has out-of-order children"
                    )));
                }
                if !threshold.is_finite() {
                    return Err(ArtifactError::Invalid(format!(
                        "tree {t} node {idx} has a non-finite threshold"
                    )));
                }
            }
            TreeNode::Leaf { value } => {
                if !value.is_finite() {
                    return Err(ArtifactError::Invalid(format!(
                        "tree {t} leaf {idx} is non-finite"
                    )));
                }
            }
        }
    }
    Ok(())
}

impl RiskClassifier for ExportedPipeline {
    fn predict_proba(&self, row: &FeatureRow) -> Result<f64, TriageError> {
        let x = self.encode(row)?;
        let probability = sigmoid(self.margin(&x));
        if !probability.is_finite() {
            return Err(TriageError::Inference("classifier produced a non-finite score".into()));
        }
        Ok(probability)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}
