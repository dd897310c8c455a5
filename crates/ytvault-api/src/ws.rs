//! WebSocket feed of bus events.
//!
//! Every connected client is one subscriber on the `ChannelTransport`; each
//! `ServerEvent` is forwarded as a JSON text frame
//! (`{"event": "...", "data": ...}`).

use std::sync::atomic::{AtomicI64, Ordering};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use ytvault_models::{Notification, ServerEvent};
use ytvault_worker::{ChannelTransport, NotificationTransport, SubscriberId};

use crate::metrics;
use crate::state::AppState;

static ACTIVE_WS_CONNECTIONS: AtomicI64 = AtomicI64::new(0);

pub async fn ws_events(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    metrics::record_ws_connection();
    ws.on_upgrade(|socket| async move {
        let count = ACTIVE_WS_CONNECTIONS.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::set_ws_active_connections(count);

        handle_socket(socket, state).await;

        let count = ACTIVE_WS_CONNECTIONS.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::set_ws_active_connections(count);
    })
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (subscriber, mut events) = state.transport.subscribe();
    info!(subscriber, "Client connected");

    greet(&state.transport, subscriber).await;

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode {} event: {}", event.name(), e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
            metrics::record_ws_message_sent(event.name());
        }
    });

    // Clients only listen; inbound frames are drained until close.
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = receiver.next().await {
            if let Message::Close(_) = message {
                break;
            }
            metrics::record_ws_message_received();
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    state.transport.unsubscribe(subscriber);
    debug!(remaining = state.transport.len(), "Subscriber removed");
    info!(subscriber, "Client disconnected");
}

/// Welcome a new client; other subscribers are not told.
async fn greet(transport: &ChannelTransport, subscriber: SubscriberId) {
    let event = ServerEvent::Notify(Notification::success("Connected"));
    if let Err(e) = transport.push(subscriber, &event).await {
        warn!(subscriber, "Failed to greet client: {}", e);
    }
}
