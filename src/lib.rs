pub mod api;
pub mod artifact;
pub mod commands;
pub mod config;
pub mod models;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

use config::LogFormat;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `log_level` when set.
pub fn init_tracing(format: LogFormat, log_level: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config::log_filter(log_level)))
        .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter()));

    match format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}
