//! OCR engines for the document pathway.
//!
//! Engines receive lossless PNG bytes (already decoded and orientation-fixed
//! by the caller) and return plain text. Any engine failure is reported as
//! `TriageError::InputDecode`: the upload could not be read.

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;

use super::TriageError;

/// Raw OCR result from the engine
#[derive(Debug, Clone)]
pub struct OcrPageResult {
    pub text: String,
    /// Mean word confidence in [0,1], when the engine reports one.
    pub confidence: Option<f32>,
}

/// OCR engine abstraction (allows mocking for tests)
pub trait OcrEngine: Send + Sync {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, TriageError>;

    /// Short engine name for logs.
    fn name(&self) -> &'static str;
}

// ═══════════════════════════════════════════════════════════
// Tesseract command-line engine
// ═══════════════════════════════════════════════════════════

/// Runs the `tesseract` executable, piping the image through stdin/stdout.
///
/// Needs only the binary on `PATH` (or an explicit path), no native linking.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    binary: PathBuf,
    lang: String,
    tessdata_dir: Option<PathBuf>,
}

impl TesseractCli {
    pub fn new(lang: &str) -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            lang: lang.to_string(),
            tessdata_dir: None,
        }
    }

    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn with_tessdata_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.tessdata_dir = dir;
        self
    }
}

impl OcrEngine for TesseractCli {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, TriageError> {
        let mut cmd = Command::new(&self.binary);
        cmd.arg("stdin").arg("stdout").arg("-l").arg(&self.lang);
        if let Some(ref dir) = self.tessdata_dir {
            cmd.arg("--tessdata-dir").arg(dir);
        }

        let mut child = cmd
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TriageError::InputDecode(format!(
                    "Cannot start OCR engine {}: {e}",
                    self.binary.display()
                ))
            })?;

        // Tesseract reads the whole image before writing, so a plain write is safe.
        // A write error still falls through to the wait so the child is reaped
        // and its stderr reported.
        let write_result = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(image_bytes),
            None => Ok(()),
        };

        let output = child
            .wait_with_output()
            .map_err(|e| TriageError::InputDecode(format!("OCR engine did not finish: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TriageError::InputDecode(format!(
                "OCR extraction failed ({}): {}",
                output.status,
                stderr.trim()
            )));
        }
        if let Err(e) = write_result {
            return Err(TriageError::InputDecode(format!(
                "OCR engine exited before reading the image: {e}"
            )));
        }

        Ok(OcrPageResult {
            text: String::from_utf8_lossy(&output.stdout).into_owned(),
            confidence: None,
        })
    }

    fn name(&self) -> &'static str {
        "tesseract-cli"
    }
}

// ═══════════════════════════════════════════════════════════
// Linked Tesseract engine
// ═══════════════════════════════════════════════════════════

/// Bundled Tesseract OCR engine.
/// Only available when compiled with the `ocr` feature flag.
#[cfg(feature = "ocr")]
pub struct BundledTesseract {
    tessdata_dir: Option<PathBuf>,
    lang: String,
}

#[cfg(feature = "ocr")]
impl BundledTesseract {
    /// Initialize with an optional tessdata directory.
    /// Fails early when the directory is given but lacks the language data.
    pub fn new(tessdata_dir: Option<PathBuf>, lang: &str) -> Result<Self, TriageError> {
        if let Some(ref dir) = tessdata_dir {
            let primary = lang.split('+').next().unwrap_or(lang);
            if !dir.join(format!("{primary}.traineddata")).exists() {
                return Err(TriageError::InputDecode(format!(
                    "Tessdata for '{primary}' not found at {}",
                    dir.display()
                )));
            }
        }
        Ok(Self {
            tessdata_dir,
            lang: lang.to_string(),
        })
    }
}

#[cfg(feature = "ocr")]
impl OcrEngine for BundledTesseract {
    fn ocr_image(&self, image_bytes: &[u8]) -> Result<OcrPageResult, TriageError> {
        let datapath = match self.tessdata_dir {
            Some(ref dir) => Some(
                dir.to_str()
                    .ok_or_else(|| TriageError::InputDecode("Invalid tessdata path".into()))?,
            ),
            None => None,
        };

        let tess = tesseract::Tesseract::new(datapath, Some(&self.lang))
            .map_err(|e| TriageError::InputDecode(format!("OCR initialization failed: {e:?}")))?;

        let mut tess = tess
            .set_image_from_mem(image_bytes)
            .map_err(|e| TriageError::InputDecode(format!("OCR could not load image: {e:?}")))?;

        let text = tess
            .get_text()
            .map_err(|e| TriageError::InputDecode(format!("OCR processing failed: {e:?}")))?;

        let confidence = tess.mean_text_conf().max(0) as f32 / 100.0;

        Ok(OcrPageResult {
            text,
            confidence: Some(confidence),
        })
    }

    fn name(&self) -> &'static str {
        "tesseract-linked"
    }
}

/// Engine used by the service and CLI: linked Tesseract when built with the
/// `ocr` feature, the command-line engine otherwise.
pub fn default_engine(
    tessdata_dir: Option<PathBuf>,
    lang: &str,
) -> Result<Arc<dyn OcrEngine>, TriageError> {
    #[cfg(feature = "ocr")]
    {
        Ok(Arc::new(BundledTesseract::new(tessdata_dir, lang)?))
    }
    #[cfg(not(feature = "ocr"))]
    {
        Ok(Arc::new(TesseractCli::new(lang).with_tessdata_dir(tessdata_dir)))
    }
}

// ═══════════════════════════════════════════════════════════
// Mock engine
// ═══════════════════════════════════════════════════════════

/// Mock OCR engine for unit testing without Tesseract.
pub struct MockOcrEngine {
    text: Option<String>,
}

impl MockOcrEngine {
    pub fn new(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
        }
    }

    /// An engine that fails every extraction.
    pub fn failing() -> Self {
        Self { text: None }
    }
}

impl OcrEngine for MockOcrEngine {
    fn ocr_image(&self, _image_bytes: &[u8]) -> Result<OcrPageResult, TriageError> {
        match self.text {
            Some(ref text) => Ok(OcrPageResult {
                text: text.clone(),
                confidence: Some(1.0),
            }),
            None => Err(TriageError::InputDecode("Mock OCR failure".into())),
        }
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
