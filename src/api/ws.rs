// =============================================================================
// WebSocket handler — push-based snapshot feed
// =============================================================================
//
// Clients connect to `/api/v1/ws?token=<token>` and receive:
//   1. An immediate snapshot wrapped as `{"type": "initial", "data": ...}`.
//   2. Periodic snapshots wrapped as `{"type": "update", "data": ...}`,
//      forwarded from the engine's broadcast channel rather than polled —
//      the tick producer never waits on a slow subscriber; a subscriber
//      that falls behind the channel's backlog just skips ahead.
//
// Also responds to Ping with Pong and treats inbound text as a heartbeat.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::api::auth::validate_token;
use crate::app_state::AppState;
use crate::engine::ExternalSnapshot;

#[derive(Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<WsQuery>,
) -> impl IntoResponse {
    let token = query.token.unwrap_or_default();
    if !validate_token(&token) {
        warn!("WebSocket connection rejected: invalid token");
        return (
            axum::http::StatusCode::FORBIDDEN,
            "Invalid or missing token",
        )
            .into_response();
    }

    info!("WebSocket connection accepted — upgrading");
    ws.on_upgrade(move |socket| handle_ws_connection(socket, state))
        .into_response()
}

#[derive(serde::Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Envelope<'a> {
    Initial { data: &'a ExternalSnapshot },
    Update { data: &'a ExternalSnapshot },
}

async fn handle_ws_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscriber = state.new_subscriber();

    let initial = state.snapshot_external();
    if let Err(err) = send_envelope(&mut sender, &Envelope::Initial { data: &initial }).await {
        warn!(error = %err, "failed to send initial snapshot, closing connection");
        return;
    }

    loop {
        tokio::select! {
            recv = subscriber.recv() => {
                match recv {
                    Ok(snapshot) => {
                        if let Err(err) = send_envelope(&mut sender, &Envelope::Update { data: &snapshot }).await {
                            debug!(error = %err, "WebSocket send failed, disconnecting");
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!(skipped, "subscriber lagged behind broadcast channel, skipping ahead");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                        info!("broadcast channel closed, ending WebSocket connection");
                        break;
                    }
                }
            }

            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!(msg = %text, "WebSocket text message received (heartbeat)");
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        info!("WebSocket Close frame received, disconnecting");
                        break;
                    }
                    Some(Ok(Message::Binary(_))) => {}
                    Some(Err(err)) => {
                        warn!(error = %err, "WebSocket receive error, disconnecting");
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    info!("WebSocket connection closed");
}

async fn send_envelope<S>(sender: &mut S, envelope: &Envelope<'_>) -> Result<(), axum::Error>
where
    S: futures_util::Sink<Message, Error = axum::Error> + Unpin,
{
    match serde_json::to_string(envelope) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(err) => {
            warn!(error = %err, "failed to serialize snapshot envelope");
            Ok(())
        }
    }
}
