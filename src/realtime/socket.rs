use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use super::holds::HoldRegistry;
use super::hub::{ClientMessage, SeatEvent, SeatEventHub};
use crate::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let hub = state.hub.clone();
    let holds = state.holds.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub, holds))
}

/// Forwards every hub event to the client and applies inbound hold
/// commands. Holds placed by a client survive its disconnect until they
/// expire or are released.
async fn handle_socket(socket: WebSocket, hub: SeatEventHub, holds: HoldRegistry) {
    let client_id = uuid::Uuid::new_v4().to_string();
    info!(client_id = %client_id, "WebSocket connected");

    let mut rx = hub.subscribe();
    hub.publish(SeatEvent::ClientConnected {
        client_id: client_id.clone(),
    });

    let (mut sink, mut stream) = socket.split();

    let sender_id = client_id.clone();
    let send_task = tokio::spawn(async move {
        loop {
            let event = match rx.recv().await {
                Ok(event) => event,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(client_id = %sender_id, skipped, "WebSocket client lagging");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if sink.send(Message::Text(json.into())).await.is_err() {
                debug!(client_id = %sender_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(text.as_str()) {
                Ok(ClientMessage::HoldSeat { seat_id, user_id }) => {
                    // Refusals are broadcast as seat_hold_failed.
                    let _ = holds.hold(seat_id, &user_id);
                }
                Ok(ClientMessage::ReleaseSeat { seat_id }) => {
                    holds.release(seat_id);
                }
                Err(e) => {
                    debug!(client_id = %client_id, error = %e, "Ignoring malformed message");
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(client_id = %client_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    send_task.abort();
    info!(client_id = %client_id, "WebSocket disconnected");
}
