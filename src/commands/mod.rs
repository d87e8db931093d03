//! Command dispatch for the `healthproj` binary.

pub mod assess;
pub mod serve;

use std::path::PathBuf;

use thiserror::Error;

use crate::config::{Cli, Command};
use crate::models::FormValidationError;
use crate::pipeline::TriageError;

#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Triage(#[from] TriageError),

    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid form record: {0}")]
    Record(String),

    #[error("Form record rejected: {0}")]
    Validation(#[from] FormValidationError),

    #[error("Invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Cannot write assessment: {0}")]
    Output(String),
}

/// Run the parsed command line to completion.
pub async fn run(cli: Cli) -> Result<(), CommandError> {
    match cli.command {
        Command::Serve(args) => serve::run(&cli.model_path, &cli.ocr, args).await,
        Command::Assess { target } => {
            let assessment = assess::run(&cli.model_path, &cli.ocr, target)?;
            let json = serde_json::to_string_pretty(&assessment)
                .map_err(|e| CommandError::Output(e.to_string()))?;
            println!("{json}");
            Ok(())
        }
    }
}

pub(crate) fn read_file(path: &std::path::Path) -> Result<Vec<u8>, CommandError> {
    std::fs::read(path).map_err(|source| CommandError::Read {
        path: path.to_path_buf(),
        source,
    })
}
