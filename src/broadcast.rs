//! Per-connection outboxes and room-scoped fan-out
//!
//! Every live WebSocket registers an unbounded queue here. Room broadcasts
//! look up the current members' connections at send time, so a player who
//! reconnected on a new socket receives events on that socket only.

use crate::protocol::ServerMessage;
use crate::state::AppState;
use tokio::sync::mpsc;

impl AppState {
    /// Register an outbox for a new connection
    pub async fn register_connection(
        &self,
        connection_id: &str,
    ) -> mpsc::UnboundedReceiver<ServerMessage> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.outboxes
            .write()
            .await
            .insert(connection_id.to_string(), tx);
        rx
    }

    pub async fn unregister_connection(&self, connection_id: &str) {
        self.outboxes.write().await.remove(connection_id);
    }

    /// Send to a single connection. Returns false if it is gone.
    pub async fn send_to(&self, connection_id: &str, msg: ServerMessage) -> bool {
        match self.outboxes.read().await.get(connection_id) {
            Some(tx) => tx.send(msg).is_ok(),
            None => false,
        }
    }

    /// Send to every member of a room that currently has a live connection
    pub async fn broadcast_to_room(&self, room_id: &str, msg: ServerMessage) {
        let connections: Vec<String> = self
            .players_in_room(room_id)
            .await
            .into_iter()
            .map(|p| p.connection_id)
            .collect();

        let outboxes = self.outboxes.read().await;
        let mut delivered = 0;
        for connection_id in &connections {
            // Disconnected members are skipped; they get a snapshot on rejoin
            if let Some(tx) = outboxes.get(connection_id) {
                if tx.send(msg.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        tracing::trace!(room_id, delivered, members = connections.len(), "Broadcast");
    }
}
