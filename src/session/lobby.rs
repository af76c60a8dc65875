//! Room membership: create, join, leave, disconnect, restart and chat

use super::{clean_text, Coordinator};
use crate::error::{GameError, GameResult};
use crate::protocol::{PlayerInfo, ServerMessage};
use crate::state::JoinKind;
use crate::types::*;
use std::sync::Arc;

/// Why a player is leaving a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// Left on purpose, or dropped while the room was not playing
    Left,
    /// Dropped mid-game and did not come back in time
    Removed,
}

impl Coordinator {
    pub async fn create_room(
        &self,
        connection_id: &str,
        nickname: &str,
        total_rounds: u32,
        allow_self_vote: bool,
    ) -> GameResult<()> {
        let nickname = clean_text(nickname, "nickname", self.config.max_nickname_chars)?;

        if let Some(existing) = self.state.find_player_by_connection(connection_id).await {
            match self.state.get_room(&existing.room_id).await {
                Some(room) if room.status != RoomStatus::Finished => {
                    // Still in an active room: hand it back instead of making another
                    tracing::debug!(room = %room.code, "Connection already in a room, reusing it");
                    self.send_room_created(connection_id, &room, &existing)
                        .await;
                    return Ok(());
                }
                Some(_) => self.remove_member(&existing, Departure::Left).await?,
                None => {
                    tracing::debug!(player = %existing.id, "Deleting orphaned player");
                    self.state.delete_player(&existing.id).await;
                }
            }
        }

        let room = self
            .state
            .create_room(connection_id, total_rounds, allow_self_vote)
            .await?;
        let player = match self
            .state
            .create_player(&room.id, connection_id, &nickname, true)
            .await
        {
            Ok(player) => player,
            Err(e) => {
                self.state.delete_room(&room.id).await;
                return Err(e);
            }
        };

        self.send_room_created(connection_id, &room, &player).await;
        Ok(())
    }

    async fn send_room_created(&self, connection_id: &str, room: &Room, player: &Player) {
        self.state
            .send_to(
                connection_id,
                ServerMessage::RoomCreated {
                    room_code: room.code.clone(),
                    player_id: player.id.clone(),
                    is_host: player.is_host,
                },
            )
            .await;
        self.state
            .send_to(
                connection_id,
                ServerMessage::PlayerJoined {
                    players: self.player_infos(&room.id).await,
                },
            )
            .await;
    }

    /// Join a room, or rejoin it under a nickname already in use there
    pub async fn join_room(
        &self,
        connection_id: &str,
        room_code: &str,
        nickname: &str,
    ) -> GameResult<()> {
        let nickname = clean_text(nickname, "nickname", self.config.max_nickname_chars)?;
        let room = self.require_room(room_code).await?;

        let mut player = None;
        if let Some(existing) = self.state.find_player_by_connection(connection_id).await {
            if existing.room_id == room.id {
                player = Some(existing);
            } else {
                tracing::debug!(player = %existing.nickname, "Leaving previous room before join");
                self.remove_member(&existing, Departure::Left).await?;
            }
        }

        let player = match player {
            Some(p) => p,
            None => {
                let (player, kind) = self
                    .state
                    .reconnect_player(&room.id, connection_id, &nickname)
                    .await?;
                if kind == JoinKind::Reconnected {
                    self.cancel_disconnect_grace(&player).await;
                    if player.is_host {
                        self.state
                            .set_room_host_connection(&room.id, connection_id)
                            .await;
                    }
                } else {
                    tracing::info!(room = %room.code, player = %player.nickname, "Player joined");
                }
                player
            }
        };

        self.state
            .broadcast_to_room(
                &room.id,
                ServerMessage::PlayerJoined {
                    players: self.player_infos(&room.id).await,
                },
            )
            .await;

        let room = self.state.get_room(&room.id).await.ok_or(GameError::RoomNotFound)?;
        let snapshot = self.snapshot(&room, &player).await;
        self.state
            .send_to(
                connection_id,
                ServerMessage::JoinedSuccessfully(Box::new(snapshot)),
            )
            .await;
        Ok(())
    }

    pub async fn leave_room(&self, connection_id: &str, room_code: &str) -> GameResult<()> {
        let (_, player) = self.require_member(connection_id, room_code).await?;
        self.remove_member(&player, Departure::Left).await?;
        self.state
            .send_to(connection_id, ServerMessage::LeftRoomSuccessfully)
            .await;
        Ok(())
    }

    /// Handle a closed connection. Mid-game the player is kept for the grace
    /// period; otherwise they leave right away.
    pub async fn disconnect(self: &Arc<Self>, connection_id: &str) {
        self.state.unregister_connection(connection_id).await;

        let Some(player) = self.state.find_player_by_connection(connection_id).await else {
            return;
        };
        let Some(room) = self.state.get_room(&player.room_id).await else {
            self.state.delete_player(&player.id).await;
            return;
        };

        if room.status == RoomStatus::Playing {
            tracing::info!(room = %room.code, player = %player.nickname, "Player disconnected mid-game");
            self.state
                .broadcast_to_room(
                    &room.id,
                    ServerMessage::PlayerDisconnected {
                        player_id: player.id.clone(),
                        nickname: player.nickname.clone(),
                    },
                )
                .await;
            self.arm_disconnect_grace(&player).await;
        } else if let Err(e) = self.remove_member(&player, Departure::Left).await {
            tracing::error!(player = %player.nickname, "Failed to remove disconnected player: {}", e);
        }
    }

    /// Take a player out of their room, handing the host role on and
    /// deleting the room once it is empty
    pub(crate) async fn remove_member(&self, player: &Player, departure: Departure) -> GameResult<()> {
        // The stored record, not the caller's copy, says whether they were host
        let Some(departed) = self.state.delete_player(&player.id).await else {
            return Ok(());
        };
        self.cancel_disconnect_grace(&departed).await;

        let room_id = &departed.room_id;
        if self.state.count_players_in_room(room_id).await == 0 {
            self.timers().cancel_room(room_id).await;
            self.state.delete_room(room_id).await;
            return Ok(());
        }

        let new_host = if departed.is_host {
            self.promote_next_host(room_id).await
        } else {
            None
        };

        let players: Vec<PlayerInfo> = self.player_infos(room_id).await;
        let msg = match departure {
            Departure::Left => ServerMessage::PlayerLeft {
                player_id: departed.id.clone(),
                nickname: departed.nickname.clone(),
                players,
            },
            Departure::Removed => ServerMessage::PlayerRemoved {
                player_id: departed.id.clone(),
                nickname: departed.nickname.clone(),
                players,
            },
        };
        self.state.broadcast_to_room(room_id, msg).await;
        tracing::info!(player = %departed.nickname, ?departure, "Player left room");

        if let Some(host) = new_host {
            self.state
                .broadcast_to_room(
                    room_id,
                    ServerMessage::NewHost {
                        host_id: host.id.clone(),
                        host_nickname: host.nickname.clone(),
                    },
                )
                .await;
        }

        // One fewer member may complete the current phase
        let playing = self
            .state
            .get_room(room_id)
            .await
            .is_some_and(|r| r.status == RoomStatus::Playing);
        if playing {
            self.advance_if_quorum(room_id).await?;
        }
        Ok(())
    }

    /// Hand the host role to the first remaining member in registry order.
    /// A candidate who disappears in the meantime is skipped.
    async fn promote_next_host(&self, room_id: &str) -> Option<Player> {
        for candidate in self.state.players_in_room(room_id).await {
            match self.state.promote_to_host(&candidate.id).await {
                Ok(host) => return Some(host),
                Err(e) => {
                    tracing::warn!(player = %candidate.nickname, "Could not promote to host: {}", e);
                }
            }
        }
        tracing::warn!(room = %room_id, "No member left to take over as host");
        None
    }

    /// Back to the lobby with the same members and zeroed scores
    pub async fn restart_game(&self, connection_id: &str, room_code: &str) -> GameResult<()> {
        let (room, player) = self.require_member(connection_id, room_code).await?;
        Self::require_host(&player, "restart the game")?;

        self.timers().cancel_answer_timeouts(&room.id).await;
        self.state.restart_room(&room.id).await?;

        tracing::info!(room = %room.code, "Game restarted");
        self.state
            .broadcast_to_room(
                &room.id,
                ServerMessage::GameRestarted {
                    room_code: room.code.clone(),
                    players: self.player_infos(&room.id).await,
                },
            )
            .await;
        Ok(())
    }

    pub async fn send_message(
        &self,
        connection_id: &str,
        room_code: &str,
        message: &str,
    ) -> GameResult<()> {
        let (room, player) = self.require_member(connection_id, room_code).await?;
        let message = clean_text(message, "message", self.config.max_message_chars)?;

        let message = self
            .state
            .record_chat(&room.id, &player, message, self.config.chat_history)
            .await;
        self.state
            .broadcast_to_room(&room.id, ServerMessage::NewMessage { message })
            .await;
        Ok(())
    }

    /// Tell a player which answer in the current round is theirs
    pub async fn get_my_answer(&self, connection_id: &str, room_code: &str) -> GameResult<()> {
        let (room, player) = self.require_member(connection_id, room_code).await?;
        let round = self
            .state
            .current_round(&room.id)
            .await
            .ok_or(GameError::RoundNotFound)?;
        let answer = self
            .state
            .answer_for_player(&round.id, &player.id)
            .await
            .ok_or(GameError::AnswerNotFound)?;

        self.state
            .send_to(
                connection_id,
                ServerMessage::MyAnswerId {
                    answer_id: answer.id,
                },
            )
            .await;
        Ok(())
    }
}
