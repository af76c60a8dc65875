mod answer;
mod chat;
mod player;
mod room;
mod round;
mod score;
mod vote;

pub use player::JoinKind;
pub use round::Advance;

use crate::prompts::PromptBank;
use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

/// Shared application state
///
/// Locks are always taken in field order (rooms, players, rounds, answers,
/// votes) when more than one is held at once.
#[derive(Clone)]
pub struct AppState {
    pub rooms: Arc<RwLock<HashMap<RoomId, Room>>>,
    pub players: Arc<RwLock<HashMap<PlayerId, Player>>>,
    pub rounds: Arc<RwLock<HashMap<RoundId, Round>>>,
    pub answers: Arc<RwLock<HashMap<AnswerId, Answer>>>,
    pub votes: Arc<RwLock<Vec<Vote>>>,
    pub chat: Arc<RwLock<HashMap<RoomId, VecDeque<ChatMessage>>>>,
    pub prompts: Arc<PromptBank>,
    /// Outgoing message queues, one per live connection
    pub(crate) outboxes: Arc<RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerMessage>>>>,
    seq: Arc<AtomicU64>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_prompts(PromptBank::default())
    }

    pub fn with_prompts(prompts: PromptBank) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            players: Arc::new(RwLock::new(HashMap::new())),
            rounds: Arc::new(RwLock::new(HashMap::new())),
            answers: Arc::new(RwLock::new(HashMap::new())),
            votes: Arc::new(RwLock::new(Vec::new())),
            chat: Arc::new(RwLock::new(HashMap::new())),
            prompts: Arc::new(prompts),
            outboxes: Arc::new(RwLock::new(HashMap::new())),
            seq: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Monotonic counter used to order players and answers
    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

fn new_id() -> String {
    ulid::Ulid::new().to_string()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    /// A room with `count` players; the first one is the host
    pub async fn room_with_players(state: &AppState, count: usize) -> (Room, Vec<Player>) {
        let room = state.create_room("conn-0", 3, false).await.unwrap();
        let mut players = Vec::new();
        for i in 0..count {
            let player = state
                .create_player(&room.id, &format!("conn-{}", i), &format!("P{}", i), i == 0)
                .await
                .unwrap();
            players.push(player);
        }
        (room, players)
    }

    /// A room with `count` players and round 1 in the answering phase
    pub async fn answering_round(state: &AppState, count: usize) -> (Room, Vec<Player>, Round) {
        let (room, players) = room_with_players(state, count).await;
        let prompt = state.prompts.random_prompt(&[]).unwrap();
        let round = state.create_round(&room.id, 1, prompt).await.unwrap();
        (room, players, round)
    }

    /// Answer for every player and move the round to voting
    pub async fn voting_round(
        state: &AppState,
        count: usize,
    ) -> (Room, Vec<Player>, Round, Vec<Answer>) {
        let (room, players, round) = answering_round(state, count).await;
        let mut answers = Vec::new();
        for p in &players {
            let answer = state
                .submit_answer(&round.id, p, format!("answer from {}", p.nickname))
                .await
                .unwrap();
            answers.push(answer);
        }
        assert!(state
            .transition_round(&round.id, RoundStatus::Answering, RoundStatus::Voting)
            .await
            .unwrap());
        (room, players, round, answers)
    }
}
