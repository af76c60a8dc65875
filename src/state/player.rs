use super::{new_id, AppState};
use crate::error::{GameError, GameResult};
use crate::types::*;
use std::collections::HashMap;

/// How a join request was resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// A new player record was created
    Joined,
    /// An existing player with the same nickname got the new connection
    Reconnected,
}

fn count_in_room(players: &HashMap<PlayerId, Player>, room_id: &str) -> usize {
    players.values().filter(|p| p.room_id == room_id).count()
}

/// Registry order: host first, then by join order
fn sort_for_room(players: &mut [Player]) {
    players.sort_by(|a, b| {
        b.is_host
            .cmp(&a.is_host)
            .then(a.joined_seq.cmp(&b.joined_seq))
    });
}

impl AppState {
    /// Create a player in a room, failing when the room is at capacity
    pub async fn create_player(
        &self,
        room_id: &str,
        connection_id: &str,
        nickname: &str,
        is_host: bool,
    ) -> GameResult<Player> {
        let mut players = self.players.write().await;
        self.insert_player(&mut players, room_id, connection_id, nickname, is_host)
    }

    fn insert_player(
        &self,
        players: &mut HashMap<PlayerId, Player>,
        room_id: &str,
        connection_id: &str,
        nickname: &str,
        is_host: bool,
    ) -> GameResult<Player> {
        if count_in_room(players, room_id) >= MAX_PLAYERS_PER_ROOM {
            return Err(GameError::RoomFull);
        }

        let player = Player {
            id: new_id(),
            room_id: room_id.to_string(),
            connection_id: connection_id.to_string(),
            nickname: nickname.to_string(),
            is_host,
            score: 0,
            joined_seq: self.next_seq(),
        };
        players.insert(player.id.clone(), player.clone());
        Ok(player)
    }

    /// Join a room by nickname. A player already using the nickname in this
    /// room keeps their record and gets the new connection.
    pub async fn reconnect_player(
        &self,
        room_id: &str,
        connection_id: &str,
        nickname: &str,
    ) -> GameResult<(Player, JoinKind)> {
        let mut players = self.players.write().await;

        if let Some(existing) = players
            .values_mut()
            .find(|p| p.room_id == room_id && p.nickname == nickname)
        {
            tracing::info!(
                player = %existing.nickname,
                old = %existing.connection_id,
                new = %connection_id,
                "Player reconnected"
            );
            existing.connection_id = connection_id.to_string();
            return Ok((existing.clone(), JoinKind::Reconnected));
        }

        let player = self.insert_player(&mut players, room_id, connection_id, nickname, false)?;
        Ok((player, JoinKind::Joined))
    }

    pub async fn get_player(&self, player_id: &str) -> Option<Player> {
        self.players.read().await.get(player_id).cloned()
    }

    pub async fn find_player_by_connection(&self, connection_id: &str) -> Option<Player> {
        self.players
            .read()
            .await
            .values()
            .find(|p| p.connection_id == connection_id)
            .cloned()
    }

    /// All players in a room, host first then in join order
    pub async fn players_in_room(&self, room_id: &str) -> Vec<Player> {
        let mut players: Vec<Player> = self
            .players
            .read()
            .await
            .values()
            .filter(|p| p.room_id == room_id)
            .cloned()
            .collect();
        sort_for_room(&mut players);
        players
    }

    pub async fn count_players_in_room(&self, room_id: &str) -> usize {
        count_in_room(&*self.players.read().await, room_id)
    }

    /// Make `player_id` the only host of its room
    pub async fn promote_to_host(&self, player_id: &str) -> GameResult<Player> {
        let promoted = {
            let mut players = self.players.write().await;
            let room_id = players
                .get(player_id)
                .map(|p| p.room_id.clone())
                .ok_or(GameError::PlayerNotFound)?;

            for player in players.values_mut().filter(|p| p.room_id == room_id) {
                player.is_host = player.id == player_id;
            }
            players
                .get(player_id)
                .cloned()
                .ok_or(GameError::PlayerNotFound)?
        };

        self.set_room_host_connection(&promoted.room_id, &promoted.connection_id)
            .await;
        tracing::info!(player = %promoted.nickname, "Promoted to host");
        Ok(promoted)
    }

    /// Add points to a player's score. Returns None if the player is gone.
    pub async fn update_score(&self, player_id: &str, delta: u32) -> Option<Player> {
        let mut players = self.players.write().await;
        let player = players.get_mut(player_id)?;
        player.score = player.score.saturating_add(delta);
        Some(player.clone())
    }

    pub async fn reset_scores(&self, room_id: &str) {
        for player in self
            .players
            .write()
            .await
            .values_mut()
            .filter(|p| p.room_id == room_id)
        {
            player.score = 0;
        }
    }

    pub async fn delete_player(&self, player_id: &str) -> Option<Player> {
        self.players.write().await.remove(player_id)
    }

    pub async fn delete_players_in_room(&self, room_id: &str) {
        self.players.write().await.retain(|_, p| p.room_id != room_id);
    }
}
