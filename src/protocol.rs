use crate::types::*;
use serde::{Deserialize, Serialize};

fn default_total_rounds() -> u32 {
    DEFAULT_ROUNDS
}

/// Commands sent by clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "kebab-case")]
pub enum ClientMessage {
    CreateRoom {
        nickname: String,
        #[serde(default = "default_total_rounds")]
        total_rounds: u32,
        #[serde(default)]
        allow_self_vote: bool,
    },
    JoinRoom {
        room_code: String,
        nickname: String,
    },
    LeaveRoom {
        room_code: String,
    },
    StartGame {
        room_code: String,
    },
    SubmitAnswer {
        room_code: String,
        answer: String,
    },
    GetMyAnswer {
        room_code: String,
    },
    SubmitVote {
        room_code: String,
        answer_id: AnswerId,
    },
    NextRound {
        room_code: String,
    },
    RestartGame {
        room_code: String,
    },
    ForceResults {
        room_code: String,
    },
    SendMessage {
        room_code: String,
        message: String,
    },
}

/// Events sent to clients. Room-scoped unless noted otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Connection-scoped: the room this connection just created
    RoomCreated {
        room_code: RoomCode,
        player_id: PlayerId,
        is_host: bool,
    },
    PlayerJoined {
        players: Vec<PlayerInfo>,
    },
    /// Connection-scoped: full snapshot for a joining or reconnecting player
    JoinedSuccessfully(Box<GameSnapshot>),
    PlayerLeft {
        player_id: PlayerId,
        nickname: String,
        players: Vec<PlayerInfo>,
    },
    /// Connection-scoped
    LeftRoomSuccessfully,
    PlayerDisconnected {
        player_id: PlayerId,
        nickname: String,
    },
    PlayerRemoved {
        player_id: PlayerId,
        nickname: String,
        players: Vec<PlayerInfo>,
    },
    NewHost {
        host_id: PlayerId,
        host_nickname: String,
    },
    GameStarted {
        round: RoundInfo,
        round_number: u32,
        total_rounds: u32,
        allow_self_vote: bool,
    },
    PlayerAnswered {
        player_id: PlayerId,
        nickname: String,
    },
    /// Connection-scoped
    MyAnswerId {
        answer_id: AnswerId,
    },
    StartVoting {
        round: RoundInfo,
        answers: Vec<AnswerInfo>,
        allow_self_vote: bool,
    },
    /// Connection-scoped
    VoteRegistered {
        answer_id: AnswerId,
    },
    PlayerVoted {
        player_id: PlayerId,
        nickname: String,
    },
    ShowResults {
        round: RoundInfo,
        answers: Vec<AnswerInfo>,
        players: Vec<PlayerInfo>,
    },
    NewRound {
        round: RoundInfo,
        round_number: u32,
        total_rounds: u32,
    },
    GameEnded {
        players: Vec<PlayerInfo>,
        winner: Option<PlayerInfo>,
    },
    GameRestarted {
        room_code: RoomCode,
        players: Vec<PlayerInfo>,
    },
    NewMessage {
        message: ChatMessage,
    },
    /// Connection-scoped
    Error {
        code: String,
        message: String,
    },
}

/// Public player info
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayerInfo {
    pub id: PlayerId,
    pub nickname: String,
    pub is_host: bool,
    pub score: u32,
}

impl From<&Player> for PlayerInfo {
    fn from(p: &Player) -> Self {
        Self {
            id: p.id.clone(),
            nickname: p.nickname.clone(),
            is_host: p.is_host,
            score: p.score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoundInfo {
    pub id: RoundId,
    pub round_number: u32,
    pub prompt: String,
    pub category: Option<String>,
    pub status: RoundStatus,
}

impl From<&Round> for RoundInfo {
    fn from(r: &Round) -> Self {
        Self {
            id: r.id.clone(),
            round_number: r.round_number,
            prompt: r.prompt.text.clone(),
            category: r.prompt.category.clone(),
            status: r.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnswerInfo {
    pub id: AnswerId,
    pub text: String,
    pub player_id: PlayerId,
    pub player_nickname: String,
    pub votes: u32,
}

impl From<&Answer> for AnswerInfo {
    fn from(a: &Answer) -> Self {
        Self {
            id: a.id.clone(),
            text: a.text.clone(),
            player_id: a.player_id.clone(),
            player_nickname: a.player_nickname.clone(),
            votes: a.votes,
        }
    }
}

/// State handed to a player on join so a reconnecting client can resume
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSnapshot {
    pub player_id: PlayerId,
    pub is_host: bool,
    pub room_code: RoomCode,
    pub status: RoomStatus,
    pub players: Vec<PlayerInfo>,
    pub total_rounds: u32,
    pub allow_self_vote: bool,
    pub game_started: bool,
    pub current_round: Option<RoundInfo>,
    pub round_number: Option<u32>,
    /// Present once the round has left the answering phase
    pub answers: Option<Vec<AnswerInfo>>,
    pub has_answered: bool,
    pub has_voted: bool,
    pub recent_messages: Vec<ChatMessage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_tags() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"t":"create-room","nickname":"Ana"}"#).unwrap();
        match msg {
            ClientMessage::CreateRoom {
                nickname,
                total_rounds,
                allow_self_vote,
            } => {
                assert_eq!(nickname, "Ana");
                assert_eq!(total_rounds, DEFAULT_ROUNDS);
                assert!(!allow_self_vote);
            }
            other => panic!("unexpected message {:?}", other),
        }

        let msg: ClientMessage = serde_json::from_str(
            r#"{"t":"submit-vote","room_code":"ABC123","answer_id":"a1"}"#,
        )
        .unwrap();
        assert!(matches!(msg, ClientMessage::SubmitVote { .. }));
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"t":"hack-the-planet"}"#);
        assert!(result.is_err());

        let result = serde_json::from_str::<ClientMessage>(r#"{"t":"join-room","room_code":"X"}"#);
        assert!(result.is_err(), "missing nickname must not parse");
    }

    #[test]
    fn test_server_message_shape() {
        let json = serde_json::to_value(ServerMessage::PlayerVoted {
            player_id: "p1".to_string(),
            nickname: "Ana".to_string(),
        })
        .unwrap();
        assert_eq!(json["t"], "player-voted");
        assert_eq!(json["nickname"], "Ana");

        let json = serde_json::to_value(ServerMessage::LeftRoomSuccessfully).unwrap();
        assert_eq!(json["t"], "left-room-successfully");
    }
}
