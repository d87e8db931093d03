use std::process::ExitCode;

use clap::Parser;

use healthproj::config::{Cli, APP_NAME, APP_VERSION};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    healthproj::init_tracing(cli.log_format, &cli.log_level);
    tracing::debug!("{APP_NAME} starting v{APP_VERSION}");

    match healthproj::commands::run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "{APP_NAME} failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
