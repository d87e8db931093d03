use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::pipeline::VisionMode;

/// Application-level constants
pub const APP_NAME: &str = "HealthProj";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_MODEL_PATH: &str = "resources/form_model.json";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MAX_UPLOAD_MB: usize = 10;

/// Tracing filter used when neither `RUST_LOG` nor `LOG_LEVEL` says otherwise.
pub fn default_log_filter() -> String {
    log_filter("info")
}

/// Filter directive scoping `level` to this crate and the HTTP stack.
pub fn log_filter(level: &str) -> String {
    format!("healthproj={level},tower_http={level}")
}

// ═══════════════════════════════════════════════════════════
// Command line
// ═══════════════════════════════════════════════════════════

/// Multi-modal health risk triage: structured forms, document photos and
/// symptom photographs.
#[derive(Parser, Debug)]
#[command(name = "healthproj", version, about, long_about = None)]
pub struct Cli {
    /// Log format.
    #[arg(long, env = "LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Log level for this crate (`RUST_LOG` takes precedence).
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// Exported classification pipeline used by the form pathway.
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH, global = true)]
    pub model_path: PathBuf,

    #[command(flatten)]
    pub ocr: OcrArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct OcrArgs {
    /// Directory holding Tesseract `*.traineddata` files.
    #[arg(long, env = "TESSDATA_PREFIX", global = true)]
    pub tessdata_dir: Option<PathBuf>,

    /// Tesseract language(s), e.g. `eng` or `eng+fra`.
    #[arg(long, env = "OCR_LANG", default_value = "eng", global = true)]
    pub ocr_lang: String,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP triage service.
    Serve(ServeArgs),

    /// Run a single pathway on a local file and print the assessment as JSON.
    Assess {
        #[command(subcommand)]
        target: AssessTarget,
    },
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Allowed CORS origins, comma separated; `*` allows any.
    #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Upload size limit for the image endpoints, in megabytes.
    #[arg(long, env = "MAX_UPLOAD_MB", default_value_t = DEFAULT_MAX_UPLOAD_MB)]
    pub max_upload_mb: usize,

    #[arg(long, env = "VISION_MODE", default_value = "deterministic")]
    pub vision_mode: VisionMode,

    /// Keep serving the image pathways when the model artifact fails to load.
    #[arg(long, env = "ALLOW_MISSING_ARTIFACT")]
    pub allow_missing_artifact: bool,
}

impl ServeArgs {
    /// Bind address; IPv6 hosts may be given bare (`::`) or bracketed (`[::1]`).
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        let ip: IpAddr = host.parse()?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// Explicit origins, or `None` when any origin is allowed.
    pub fn allowed_origins(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .cors_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum AssessTarget {
    /// Classify a JSON form record.
    Form { record: PathBuf },

    /// Keyword-triage a photographed or scanned document.
    TextImage { image: PathBuf },

    /// Score a symptom photograph.
    Vision {
        image: PathBuf,

        /// Apply simulated uncertainty (non-deterministic).
        #[arg(long)]
        exploratory: bool,
    },
}
