//! Validation API server lifecycle.
//!
//! `start_api_server` binds the listener, mounts `api_router` over the shared
//! `GroundingValidator` and spawns `axum::serve` on the current runtime. The
//! returned `ApiServer` carries the session metadata reported at start-up
//! (id, bound address, start time) and owns the shutdown channel. After
//! `shutdown`, in-flight validations finish before `stopped` resolves. The
//! validator `Arc` held by the router is released when the task ends.

use std::net::SocketAddr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::api::router::api_router;
use crate::pipeline::validation::GroundingValidator;

// ═══════════════════════════════════════════════════════════
// Public types
// ═══════════════════════════════════════════════════════════

/// Session metadata for a running API server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSession {
    pub session_id: String,
    pub server_addr: String,
    pub port: u16,
    pub started_at: String,
}

impl ApiSession {
    fn new(addr: SocketAddr) -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            server_addr: addr.to_string(),
            port: addr.port(),
            started_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Handle to a running API server.
pub struct ApiServer {
    pub session: ApiSession,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ApiServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("Validation API shutdown signal sent");
        }
    }

    /// Wait for the server task to finish serving in-flight requests.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            tracing::error!("Validation API task failed: {e}");
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Start the API server on `addr` (port 0 picks an ephemeral port).
pub async fn start_api_server(
    validator: Arc<GroundingValidator>,
    addr: SocketAddr,
) -> Result<ApiServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind API server: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = api_router(validator);
    let session = ApiSession::new(addr);
    let session_id = session.session_id.clone();

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("Validation API draining in-flight requests");
        };

        tracing::info!(%addr, %session_id, "Validation API listening");

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await;
        match served {
            Ok(()) => tracing::info!(%session_id, "Validation API stopped"),
            Err(e) => tracing::error!(%session_id, "Validation API server error: {e}"),
        }
    });

    Ok(ApiServer {
        session,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
