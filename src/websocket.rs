//! WebSocket handlers for real-time updates
//!
//! This module streams session events (tab selections and appended turns)
//! to connected clients. Supports ping/pong for connection keepalive.

use crate::api::utils::SharedState;
use crate::session::{Role, TabId};
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// WebSocket message types for real-time communication
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type")]
pub enum SessionEvent {
    /// A session activated a tab
    #[serde(rename = "tab_selected")]
    TabSelected {
        /// Session whose tab changed
        session_id: String,
        /// Newly active tab
        tab: TabId,
        /// Whether the conversation log was reset by the switch
        reset: bool,
    },
    /// A turn was appended to a session's conversation log
    #[serde(rename = "turn_appended")]
    TurnAppended {
        /// Session the turn belongs to
        session_id: String,
        /// Author of the turn
        role: Role,
        /// Turn content
        content: String,
    },
    /// Ping message for connection keepalive
    #[serde(rename = "ping")]
    Ping,
    /// Pong message responding to ping
    #[serde(rename = "pong")]
    Pong,
}

/// WebSocket upgrade handler
///
/// Handles WebSocket connection upgrade and sets up message handlers.
/// Forwards broadcast session events and maintains the connection with
/// ping/pong.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<SharedState>,
) -> Response {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: SharedState) {
    let (mut sender, mut receiver) = socket.split();

    info!("WebSocket client connected");

    // Use a channel to send messages from the event and receiver tasks
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Message>();

    // Task to forward messages from channel to sender
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = sender.send(msg).await {
                error!("Failed to send message: {}", e);
                break;
            }
        }
    });

    // Task to forward broadcast session events
    let mut events = state.events.subscribe();
    let event_tx = tx.clone();
    let mut event_task = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        if event_tx.send(Message::Text(json)).is_err() {
                            break;
                        }
                    }
                    Err(e) => error!("Failed to serialize session event: {}", e),
                },
                // Slow consumers skip missed events and keep going
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("WebSocket client lagged, skipped {} events", skipped);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // Task to send periodic pings
    let ping_tx = tx.clone();
    let mut ping_task = tokio::spawn(async move {
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(30)).await;
            if ping_tx.send(Message::Ping(vec![])).is_err() {
                break;
            }
        }
    });

    // Receive messages
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    if let Ok(event) = serde_json::from_str::<SessionEvent>(&text) {
                        match event {
                            SessionEvent::Ping => {
                                if let Ok(pong) = serde_json::to_string(&SessionEvent::Pong) {
                                    if tx.send(Message::Text(pong)).is_err() {
                                        break;
                                    }
                                }
                            }
                            _ => {
                                warn!("Received unhandled WebSocket message: {:?}", event);
                            }
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    info!("WebSocket client disconnected");
                    break;
                }
                Ok(Message::Pong(_)) => {
                    // Client responded to ping
                }
                Err(e) => {
                    error!("WebSocket error: {}", e);
                    break;
                }
                _ => {}
            }
        }
    });

    // Wait for any task to complete
    tokio::select! {
        _ = &mut send_task => {
            event_task.abort();
            ping_task.abort();
            recv_task.abort();
        }
        _ = &mut event_task => {
            send_task.abort();
            ping_task.abort();
            recv_task.abort();
        }
        _ = &mut ping_task => {
            send_task.abort();
            event_task.abort();
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
            event_task.abort();
            ping_task.abort();
        }
    }

    info!("WebSocket connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_event_serializes_with_type_tag() {
        let event = SessionEvent::TabSelected {
            session_id: "abc".to_string(),
            tab: TabId::Chat,
            reset: true,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"tab_selected""#));
        assert!(json.contains(r#""tab":"chat""#));
    }

    #[test]
    fn test_ping_round_trips() {
        let json = serde_json::to_string(&SessionEvent::Ping).unwrap();
        let event: SessionEvent = serde_json::from_str(&json).unwrap();
        assert!(matches!(event, SessionEvent::Ping));
    }
}
