//! Axum server: the WebSocket endpoint plus the HTTP status surface.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::connection::handle_connection;
use crate::state::ServerState;

/// A running server. Call [`ServerHandle::shutdown`] to stop accepting,
/// drain in-flight connections, and close the listener.
pub struct ServerHandle {
    addr: SocketAddr,
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

impl ServerHandle {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Graceful shutdown.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}

/// Bind `addr` and serve until shutdown. Returns once the listener is bound,
/// so the handle's address is immediately usable.
pub async fn start_server(state: Arc<ServerState>, addr: &str) -> anyhow::Result<ServerHandle> {
    let app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health_handler))
        .route("/status/{session_id}", get(status_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;
    info!(%addr, "Server listening");

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    let task = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;
        if let Err(e) = result {
            error!(%e, "Server exited with error");
        }
    });

    Ok(ServerHandle { addr, cancel, task })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(state, socket))
}

async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    axum::Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.registry.len().await,
    }))
}

/// Whether `session_id` currently owns a registered session.
async fn status_handler(
    Path(session_id): Path<String>,
    State(state): State<Arc<ServerState>>,
) -> impl IntoResponse {
    match state.registry.connected_since(&session_id).await {
        Some(since) => axum::Json(json!({
            "status": "connected",
            "session_id": session_id,
            "connected_since": since.to_rfc3339(),
        })),
        None => axum::Json(json!({
            "status": "disconnected",
            "session_id": session_id,
        })),
    }
}
