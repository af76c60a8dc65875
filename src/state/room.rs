use super::{new_id, AppState};
use crate::error::{GameError, GameResult};
use crate::types::*;
use rand::Rng;

/// Generate a random room code
fn generate_room_code() -> RoomCode {
    let mut rng = rand::rng();
    (0..ROOM_CODE_LENGTH)
        .map(|_| ROOM_CODE_CHARS[rng.random_range(0..ROOM_CODE_CHARS.len())] as char)
        .collect()
}

/// Normalize user input for room code lookup
fn normalize_room_code(code: &str) -> RoomCode {
    code.trim().to_uppercase()
}

impl AppState {
    /// Create a room in the waiting state with a unique code
    pub async fn create_room(
        &self,
        host_connection_id: &str,
        total_rounds: u32,
        allow_self_vote: bool,
    ) -> GameResult<Room> {
        if !(MIN_ROUNDS..=MAX_ROUNDS).contains(&total_rounds) {
            return Err(GameError::InvalidRoundCount(total_rounds));
        }

        let mut rooms = self.rooms.write().await;
        let code = loop {
            let code = generate_room_code();
            if !rooms.values().any(|r| r.code == code) {
                break code;
            }
            // Collision, try again (36^6 codes)
        };

        let room = Room {
            id: new_id(),
            code,
            host_connection_id: host_connection_id.to_string(),
            status: RoomStatus::Waiting,
            total_rounds,
            allow_self_vote,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        rooms.insert(room.id.clone(), room.clone());

        tracing::info!(room = %room.code, total_rounds, allow_self_vote, "Room created");
        Ok(room)
    }

    /// Find a room by its code (case-insensitive)
    pub async fn find_room_by_code(&self, code: &str) -> Option<Room> {
        let code = normalize_room_code(code);
        self.rooms
            .read()
            .await
            .values()
            .find(|r| r.code == code)
            .cloned()
    }

    pub async fn get_room(&self, room_id: &str) -> Option<Room> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Unconditionally set the room status
    pub async fn set_room_status(&self, room_id: &str, status: RoomStatus) -> GameResult<()> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(room_id).ok_or(GameError::RoomNotFound)?;
        room.status = status;
        Ok(())
    }

    /// Move the room from `from` to `to` only if it is still in `from`.
    /// Returns false when another command got there first.
    pub async fn transition_room_status(
        &self,
        room_id: &str,
        from: RoomStatus,
        to: RoomStatus,
    ) -> GameResult<bool> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(room_id).ok_or(GameError::RoomNotFound)?;
        if room.status != from {
            return Ok(false);
        }
        room.status = to;
        Ok(true)
    }

    pub async fn set_room_host_connection(&self, room_id: &str, connection_id: &str) {
        if let Some(room) = self.rooms.write().await.get_mut(room_id) {
            room.host_connection_id = connection_id.to_string();
        }
    }

    /// Delete a room together with everything it owns
    pub async fn delete_room(&self, room_id: &str) -> Option<Room> {
        let room = self.rooms.write().await.remove(room_id)?;

        self.delete_players_in_room(room_id).await;
        self.delete_rounds_in_room(room_id).await;
        self.chat.write().await.remove(room_id);

        tracing::info!(room = %room.code, "Room deleted");
        Some(room)
    }

    /// Put the room back into the lobby: status waiting, scores zeroed,
    /// previous rounds dropped, membership kept
    pub async fn restart_room(&self, room_id: &str) -> GameResult<()> {
        self.set_room_status(room_id, RoomStatus::Waiting).await?;
        self.reset_scores(room_id).await;
        self.delete_rounds_in_room(room_id).await;
        Ok(())
    }
}
