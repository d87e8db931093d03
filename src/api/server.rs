//! Triage server lifecycle: bind → spawn background task → return handle
//! with a shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::triage_router;
use crate::api::types::ApiContext;

/// Handle to a running triage server.
pub struct TriageServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TriageServer {
    /// Ask the server to stop accepting connections. In-flight requests finish.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Triage server shutdown signal sent");
        }
    }

    /// Wait for the server task to exit.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            tracing::error!("Triage server task failed: {e}");
        }
    }
}

/// Bind `addr` and serve the triage router in a background task.
///
/// Port 0 picks an ephemeral port; the bound address is on the handle.
pub async fn start_triage_server(
    ctx: ApiContext,
    addr: SocketAddr,
    allowed_origins: Option<Vec<String>>,
) -> Result<TriageServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind triage server on {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = triage_router(ctx, allowed_origins.as_deref());
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Triage server received shutdown signal");
        };

        tracing::info!(%addr, "Triage server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("Triage server error: {e}");
        }

        tracing::info!("Triage server stopped");
    });

    Ok(TriageServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}
