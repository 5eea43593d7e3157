//! `WebSocket` transport for game clients.
//!
//! Each accepted socket gets a fresh [`ConnectionId`] and a bounded
//! outbound queue registered with the coordinator. One task per connection then
//! multiplexes three sources until the client goes away:
//!
//! - frames queued by the coordinator (replies and broadcasts)
//! - inbound client frames, handed to the coordinator as text
//! - the keep-alive timer, which pings idle clients
//!
//! A client that stops reading fills its queue and is dropped by the
//! coordinator, which closes the queue and ends the loop. However the loop
//! ends, the connection is run through the coordinator's disconnect
//! handling.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use tictac_types::ConnectionId;
use tracing::{debug, info};

use crate::state::AppState;

/// Upgrade an HTTP request to a game connection.
///
/// # Route
///
/// `GET /` and `GET /ws`
pub async fn ws_session(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

/// Drive one connection until either side closes it.
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
    let connection = ConnectionId::new();
    let (outbox, mut frames) = tictac_core::outbox();
    let coordinator = Arc::clone(&state.coordinator);
    let participant = coordinator.connect(connection, outbox).await;
    info!(%connection, %participant, "client connected");

    let mut keepalive = tokio::time::interval(state.keepalive);
    // First ping one full period after connecting.
    keepalive.reset();

    loop {
        tokio::select! {
            // Frame queued by the coordinator.
            frame = frames.recv() => {
                let Some(frame) = frame else {
                    debug!(%connection, "outbox closed");
                    break;
                };
                if socket.send(Message::Text(frame.to_string().into())).await.is_err() {
                    debug!(%connection, "client disconnected (send failed)");
                    break;
                }
            }
            // Frame from the client.
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        coordinator.handle_text(connection, text.as_str()).await;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!(%connection, "client disconnected (pong failed)");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(%connection, "client closed connection");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!(%connection, "WebSocket error: {e}");
                        break;
                    }
                    _ => {
                        // Binary frames and pongs carry nothing for us.
                    }
                }
            }
            _ = keepalive.tick() => {
                if socket.send(Message::Ping(Bytes::new())).await.is_err() {
                    debug!(%connection, "client disconnected (ping failed)");
                    break;
                }
            }
        }
    }

    coordinator.disconnect(connection).await;
    info!(%connection, %participant, "client disconnected");
}
