//! `healthproj serve`: load the model, start the HTTP server, stop on Ctrl-C.

use std::path::Path;

use tracing::{info, warn};

use super::CommandError;
use crate::api::{start_triage_server, ApiContext};
use crate::artifact::ArtifactStore;
use crate::config::{OcrArgs, ServeArgs, APP_NAME, APP_VERSION};
use crate::pipeline::{ocr, VisionMode};

pub async fn run(model_path: &Path, ocr_args: &OcrArgs, args: ServeArgs) -> Result<(), CommandError> {
    let addr = args.socket_addr()?;
    let engine = ocr::default_engine(ocr_args.tessdata_dir.clone(), &ocr_args.ocr_lang)?;

    let ctx = match ArtifactStore::load(model_path) {
        Ok(store) => {
            info!(model = store.classifier().name(), "Form pathway ready");
            ApiContext::new(store, engine)
        }
        Err(e) if args.allow_missing_artifact => {
            warn!(error = %e, "Serving without the form model; /predict/form will answer 503");
            ApiContext::without_model(e.to_string(), engine)
        }
        Err(e) => return Err(e.into()),
    }
    .vision_mode(args.vision_mode)
    .max_upload_bytes(args.max_upload_bytes());

    if args.vision_mode == VisionMode::Exploratory {
        warn!("Vision pathway runs in exploratory mode; results are not reproducible");
    }

    let mut server = start_triage_server(ctx, addr, args.allowed_origins())
        .await
        .map_err(CommandError::Server)?;
    info!(addr = %server.addr, version = APP_VERSION, "{APP_NAME} listening");

    let signal = tokio::signal::ctrl_c().await;
    server.shutdown();
    server.stopped().await;

    signal.map_err(|e| CommandError::Server(format!("Cannot listen for Ctrl-C: {e}")))
}
