use serde::{Deserialize, Serialize};

/// Opaque ID types
pub type RoomId = String;
pub type RoomCode = String;
pub type PlayerId = String;
pub type ConnectionId = String;
pub type RoundId = String;
pub type AnswerId = String;
pub type PromptId = String;

/// Room capacity
pub const MAX_PLAYERS_PER_ROOM: usize = 8;
/// Minimum room size before the host can start a game
pub const MIN_PLAYERS_TO_START: usize = 3;
pub const MIN_ROUNDS: u32 = 1;
pub const MAX_ROUNDS: u32 = 10;
pub const DEFAULT_ROUNDS: u32 = 3;
/// Points awarded to an answer's author for every vote it received
pub const POINTS_PER_VOTE: u32 = 100;

pub const ROOM_CODE_LENGTH: usize = 6;
pub const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
    Finished,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Answering,
    Voting,
    Results,
}

impl RoundStatus {
    /// The only status a round may move to from this one
    pub fn next(self) -> Option<RoundStatus> {
        match self {
            RoundStatus::Answering => Some(RoundStatus::Voting),
            RoundStatus::Voting => Some(RoundStatus::Results),
            RoundStatus::Results => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub code: RoomCode,
    pub host_connection_id: ConnectionId,
    pub status: RoomStatus,
    pub total_rounds: u32,
    pub allow_self_vote: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub room_id: RoomId,
    pub connection_id: ConnectionId,
    pub nickname: String,
    pub is_host: bool,
    pub score: u32,
    /// Insertion order within the store, used for registry ordering
    pub joined_seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Prompt {
    pub id: PromptId,
    pub text: String,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub room_id: RoomId,
    pub round_number: u32,
    pub prompt: Prompt,
    pub status: RoundStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub round_id: RoundId,
    pub player_id: PlayerId,
    /// Kept on the answer so results still render after the author left
    pub player_nickname: String,
    pub text: String,
    pub votes: u32,
    /// True when the answer was generated because the player missed the deadline
    pub is_filler: bool,
    pub submitted_seq: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub answer_id: AnswerId,
    pub round_id: RoundId,
    pub player_id: PlayerId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub id: String,
    pub player_id: PlayerId,
    pub player_nickname: String,
    pub message: String,
    pub timestamp: String,
}
