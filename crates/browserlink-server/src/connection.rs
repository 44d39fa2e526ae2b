//! Per-connection lifecycle: session setup, receive/dispatch/reply loop,
//! guaranteed teardown.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use browserlink_core::protocol::{self, Response};

use crate::dispatch::dispatch_command;
use crate::registry::Session;
use crate::state::ServerState;

/// Handle one WebSocket connection for its entire lifetime.
///
/// The session's browser context is created before the command loop starts
/// and released through the registry on every exit path. Context creation
/// failure aborts the handshake: the connection closes without entering the
/// loop.
pub async fn handle_connection(state: Arc<ServerState>, ws: WebSocket) {
    let conn_id = Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, "Connection established");

    let session = match state.registry.open(&conn_id).await {
        Ok(session) => session,
        Err(e) => {
            warn!(conn_id = %conn_id, %e, "Session setup failed, dropping connection");
            return;
        }
    };

    command_loop(&state, &conn_id, session, ws).await;

    state.registry.close(&conn_id).await;
    info!(conn_id = %conn_id, "Connection closed");
}

/// Receive one frame, decode, dispatch, reply — until the peer disconnects,
/// the transport fails, or a frame cannot be decoded.
async fn command_loop(
    state: &Arc<ServerState>,
    conn_id: &str,
    session: Arc<Mutex<Session>>,
    ws: WebSocket,
) {
    let (mut tx, mut rx) = ws.split();

    while let Some(message) = rx.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let text = text.to_string();
                let command = match protocol::decode_command(&text) {
                    Ok(command) => command,
                    Err(e) => {
                        // Decode failures are connection-fatal: the frame
                        // cannot be paired with any response.
                        warn!(conn_id = %conn_id, %e, "Malformed frame, dropping connection");
                        let farewell = protocol::encode_response(&Response::error(e.to_string()));
                        let _ = tx.send(Message::Text(farewell.into())).await;
                        break;
                    }
                };

                let response = {
                    let mut session = session.lock().await;
                    dispatch_command(state, &mut session, command).await
                };

                let encoded = protocol::encode_response(&response);
                if tx.send(Message::Text(encoded.into())).await.is_err() {
                    debug!(conn_id = %conn_id, "Send failed, peer gone");
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                debug!(conn_id = %conn_id, "Peer requested close");
                break;
            }
            Ok(_) => {
                // Axum answers ping/pong itself; binary frames are ignored.
            }
            Err(e) => {
                warn!(conn_id = %conn_id, %e, "Transport error");
                break;
            }
        }
    }
}
