//! WebSocket API handler and session management.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message as AxumMessage, WebSocket},
        Extension, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use plank_events::{BoardEvent, ControlEvent};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::AppState;

/// Bound on each session's outbound queue. 256 events is ample for normal
/// operation; a client that falls further behind than that can no longer
/// render a consistent board and is dropped by the broker.
const OUTBOUND_BUFFER: usize = 256;

/// WebSocket handler: `GET /ws`.
///
/// The HTTP upgrade itself and any authentication in front of it are the
/// deployment's concern; the core session protocol starts once the socket
/// is open.
pub async fn ws_handler(
    Extension(state): Extension<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handles one WebSocket session from open to close.
///
/// Inbound text frames are decoded as control events and forwarded to the
/// broker; outbound events arrive through the session's bounded channel and
/// are written by a dedicated sender task. On close the connection is
/// removed from the broker exactly once.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection = Uuid::new_v4();
    let broker = state.documents.broker().clone();

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_BUFFER);

    broker.register(connection, tx.clone()).await;
    tracing::debug!(%connection, "websocket session opened");

    // Forward queued events to the socket; exits when the channel closes or
    // the peer goes away.
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(AxumMessage::Text(msg.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            AxumMessage::Text(text) => match plank_events::decode_control(text.as_str()) {
                Ok(ControlEvent::Subscribe { board_id }) => {
                    // board_id 0 is the unsubscribe sentinel; the broker
                    // handles both cases.
                    broker.subscribe(connection, board_id).await;
                    tracing::debug!(%connection, board_id, "subscription updated");
                    send_event(&tx, &BoardEvent::Ack);
                }
                Err(e) => {
                    // Malformed frames are discarded; the connection stays
                    // open.
                    tracing::warn!(%connection, "discarding malformed control frame: {}", e);
                    send_event(
                        &tx,
                        &BoardEvent::Error {
                            message: "malformed control event".to_string(),
                        },
                    );
                }
            },
            AxumMessage::Close(_) => break,
            // Ping/pong is handled by axum; binary frames are not part of
            // the protocol.
            _ => {}
        }
    }

    broker.remove_connection(connection).await;
    send_task.abort();
    tracing::debug!(%connection, "websocket session closed");
}

/// Queues a single event on the session's outbound channel.
fn send_event(tx: &mpsc::Sender<String>, event: &BoardEvent) {
    match plank_events::encode(event) {
        Ok(json) => {
            if let Err(e) = tx.try_send(json) {
                tracing::warn!("failed to queue {} event for client: {}", event.kind(), e);
            }
        }
        Err(e) => {
            tracing::error!("failed to serialize {} event: {}", event.kind(), e);
        }
    }
}
