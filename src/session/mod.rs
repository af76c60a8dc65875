//! Session coordinator
//!
//! Turns client commands into state changes and room broadcasts, and owns
//! the timers that drive a room forward when players go quiet.

pub mod game;
pub mod lobby;
pub mod timers;

use crate::config::GameConfig;
use crate::error::{GameError, GameResult};
use crate::protocol::{AnswerInfo, GameSnapshot, PlayerInfo, RoundInfo};
use crate::state::AppState;
use crate::types::*;
use timers::TimerRegistry;

pub struct Coordinator {
    pub state: AppState,
    pub config: GameConfig,
    timers: TimerRegistry,
}

impl Coordinator {
    pub fn new(state: AppState, config: GameConfig) -> Self {
        Self {
            state,
            config,
            timers: TimerRegistry::default(),
        }
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.timers
    }

    /// The player bound to this connection
    async fn require_player(&self, connection_id: &str) -> GameResult<Player> {
        self.state
            .find_player_by_connection(connection_id)
            .await
            .ok_or(GameError::NotInRoom)
    }

    async fn require_room(&self, room_code: &str) -> GameResult<Room> {
        if room_code.trim().is_empty() {
            return Err(GameError::MissingField("room_code"));
        }
        self.state
            .find_room_by_code(room_code)
            .await
            .ok_or(GameError::RoomNotFound)
    }

    /// Resolve the room by code and check the connection's player is in it
    async fn require_member(
        &self,
        connection_id: &str,
        room_code: &str,
    ) -> GameResult<(Room, Player)> {
        let room = self.require_room(room_code).await?;
        let player = self.require_player(connection_id).await?;
        if player.room_id != room.id {
            return Err(GameError::NotInRoom);
        }
        Ok((room, player))
    }

    fn require_host(player: &Player, action: &'static str) -> GameResult<()> {
        if player.is_host {
            Ok(())
        } else {
            Err(GameError::NotHost(action))
        }
    }

    /// The room's current round, which must be in `status`
    async fn require_round_in(&self, room_id: &str, status: RoundStatus) -> GameResult<Round> {
        let round = self
            .state
            .current_round(room_id)
            .await
            .ok_or(GameError::RoundNotFound)?;
        if round.status != status {
            return Err(GameError::InvalidPhase {
                expected: status,
                actual: round.status,
            });
        }
        Ok(round)
    }

    fn require_playing(room: &Room) -> GameResult<()> {
        if room.status != RoomStatus::Playing {
            return Err(GameError::GameNotRunning);
        }
        Ok(())
    }

    async fn player_infos(&self, room_id: &str) -> Vec<PlayerInfo> {
        self.state
            .players_in_room(room_id)
            .await
            .iter()
            .map(PlayerInfo::from)
            .collect()
    }

    /// Everything a (re)joining client needs to render the room
    async fn snapshot(&self, room: &Room, player: &Player) -> GameSnapshot {
        let players = self.player_infos(&room.id).await;

        let round = match room.status {
            RoomStatus::Playing => self.state.current_round(&room.id).await,
            _ => None,
        };

        let (answers, has_answered, has_voted) = match &round {
            Some(r) => {
                let answers = match r.status {
                    RoundStatus::Answering => None,
                    RoundStatus::Voting => Some(self.state.answers_for_round(&r.id).await),
                    RoundStatus::Results => Some(self.state.results_for_round(&r.id).await),
                };
                (
                    answers.map(|a| a.iter().map(AnswerInfo::from).collect()),
                    self.state.has_answered(&r.id, &player.id).await,
                    self.state.has_voted(&r.id, &player.id).await,
                )
            }
            None => (None, false, false),
        };

        GameSnapshot {
            player_id: player.id.clone(),
            is_host: player.is_host,
            room_code: room.code.clone(),
            status: room.status,
            players,
            total_rounds: room.total_rounds,
            allow_self_vote: room.allow_self_vote,
            game_started: round.is_some(),
            current_round: round.as_ref().map(RoundInfo::from),
            round_number: round.as_ref().map(|r| r.round_number),
            answers,
            has_answered,
            has_voted,
            recent_messages: self.state.recent_chat(&room.id).await,
        }
    }
}

/// Trim a text field and enforce its limits
fn clean_text(raw: &str, field: &'static str, max: usize) -> GameResult<String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(GameError::MissingField(field));
    }
    if text.chars().count() > max {
        return Err(GameError::TextTooLong { field, max });
    }
    Ok(text.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::protocol::ServerMessage;
    use std::sync::Arc;
    use tokio::sync::mpsc::UnboundedReceiver;

    pub struct Client {
        pub conn: String,
        pub rx: UnboundedReceiver<ServerMessage>,
    }

    impl Client {
        /// Drain everything queued for this connection
        pub fn drain(&mut self) -> Vec<ServerMessage> {
            let mut out = Vec::new();
            while let Ok(msg) = self.rx.try_recv() {
                out.push(msg);
            }
            out
        }
    }

    pub fn coordinator() -> Arc<Coordinator> {
        Arc::new(Coordinator::new(AppState::new(), GameConfig::default()))
    }

    pub async fn connect(coord: &Coordinator, conn: &str) -> Client {
        Client {
            conn: conn.to_string(),
            rx: coord.state.register_connection(conn).await,
        }
    }

    /// A room created by "Host" with `count - 1` guests joined
    pub async fn lobby(coord: &Arc<Coordinator>, count: usize) -> (Room, Vec<Client>) {
        let mut clients = Vec::new();
        let host = connect(coord, "conn-host").await;
        coord
            .create_room(&host.conn, "Host", DEFAULT_ROUNDS, false)
            .await
            .unwrap();
        let room = coord
            .state
            .find_player_by_connection(&host.conn)
            .await
            .map(|p| p.room_id)
            .unwrap();
        let room = coord.state.get_room(&room).await.unwrap();
        clients.push(host);

        for i in 1..count {
            let client = connect(coord, &format!("conn-{}", i)).await;
            coord
                .join_room(&client.conn, &room.code, &format!("Guest{}", i))
                .await
                .unwrap();
            clients.push(client);
        }
        for c in clients.iter_mut() {
            c.drain();
        }
        (room, clients)
    }

    /// A started game with `count` players
    pub async fn started(coord: &Arc<Coordinator>, count: usize) -> (Room, Vec<Client>, Round) {
        let (room, mut clients) = lobby(coord, count).await;
        coord.start_game(&clients[0].conn, &room.code).await.unwrap();
        for c in clients.iter_mut() {
            c.drain();
        }
        let round = coord.state.current_round(&room.id).await.unwrap();
        (room, clients, round)
    }
}
