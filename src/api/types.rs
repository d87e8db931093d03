//! Shared types for the triage API layer.

use std::sync::Arc;

use crate::artifact::ArtifactStore;
use crate::config::DEFAULT_MAX_UPLOAD_MB;
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::VisionMode;

// ═══════════════════════════════════════════════════════════
// Model state
// ═══════════════════════════════════════════════════════════

/// Outcome of loading the form-pathway artifact at startup.
#[derive(Debug, Clone)]
pub enum ModelState {
    Ready(ArtifactStore),
    /// Load failed and the server was told to keep running without it.
    Unavailable(String),
}

// ═══════════════════════════════════════════════════════════
// API context — shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared, read-only context for all routes. Cloned per request.
#[derive(Clone)]
pub struct ApiContext {
    pub model: Arc<ModelState>,
    pub ocr: Arc<dyn OcrEngine>,
    pub vision_mode: VisionMode,
    pub max_upload_bytes: usize,
}

impl ApiContext {
    pub fn new(artifact: ArtifactStore, ocr: Arc<dyn OcrEngine>) -> Self {
        Self::with_model(ModelState::Ready(artifact), ocr)
    }

    /// Context for a server whose artifact failed to load.
    pub fn without_model(reason: impl Into<String>, ocr: Arc<dyn OcrEngine>) -> Self {
        Self::with_model(ModelState::Unavailable(reason.into()), ocr)
    }

    fn with_model(model: ModelState, ocr: Arc<dyn OcrEngine>) -> Self {
        Self {
            model: Arc::new(model),
            ocr,
            vision_mode: VisionMode::Deterministic,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_MB * 1024 * 1024,
        }
    }

    pub fn vision_mode(mut self, mode: VisionMode) -> Self {
        self.vision_mode = mode;
        self
    }

    pub fn max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}
