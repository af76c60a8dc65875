use super::{new_id, AppState};
use crate::types::*;

impl AppState {
    /// Append a chat message to the room's history, keeping at most `keep`
    /// messages
    pub async fn record_chat(
        &self,
        room_id: &str,
        player: &Player,
        message: String,
        keep: usize,
    ) -> ChatMessage {
        let chat = ChatMessage {
            id: new_id(),
            player_id: player.id.clone(),
            player_nickname: player.nickname.clone(),
            message,
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        if keep > 0 {
            let mut history = self.chat.write().await;
            let messages = history.entry(room_id.to_string()).or_default();
            messages.push_back(chat.clone());
            while messages.len() > keep {
                messages.pop_front();
            }
        }

        chat
    }

    /// Chat history for a room, oldest first
    pub async fn recent_chat(&self, room_id: &str) -> Vec<ChatMessage> {
        self.chat
            .read()
            .await
            .get(room_id)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }
}
