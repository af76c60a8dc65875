pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::Coordinator;

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(coord): State<Arc<Coordinator>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, coord))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, coord: Arc<Coordinator>) {
    let (mut sender, mut receiver) = socket.split();

    let connection_id = ulid::Ulid::new().to_string();
    let mut outbox = coord.state.register_connection(&connection_id).await;
    tracing::info!(connection = %connection_id, "WebSocket connected");

    loop {
        tokio::select! {
            // Events queued for this connection by the coordinator
            queued = outbox.recv() => {
                let Some(msg) = queued else { break };
                if let Ok(json) = serde_json::to_string(&msg) {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(connection = %connection_id, "Received message: {}", text);

                        let response = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                handlers::handle_message(&coord, &connection_id, client_msg).await
                            }
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                Some(ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    message: format!("Invalid message format: {}", e),
                                })
                            }
                        };

                        if let Some(response) = response {
                            // Through the outbox so it stays ordered after any
                            // events the command already queued
                            coord.state.send_to(&connection_id, response).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!(connection = %connection_id, "WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!(connection = %connection_id, "WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    coord.disconnect(&connection_id).await;
    tracing::info!(connection = %connection_id, "WebSocket connection closed");
}
