//! Error taxonomy for game commands.
//!
//! Every failure is recoverable and only ever reported back to the connection
//! that issued the command.

use crate::types::RoundStatus;

/// Result type for game operations
pub type GameResult<T> = Result<T, GameError>;

/// Broad category of a [`GameError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed command fields, wrong phase, full room
    Validation,
    /// Unknown room, player, round or answer
    NotFound,
    /// The command is well-formed but the game rules forbid it
    Policy,
    /// Server-side failure, e.g. an empty prompt bank
    Internal,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GameError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("Round count must be between 1 and 10, got {0}")]
    InvalidRoundCount(u32),

    #[error("{field} must be at most {max} characters")]
    TextTooLong { field: &'static str, max: usize },

    #[error("The room is full")]
    RoomFull,

    #[error("Round is {actual:?}, expected {expected:?}")]
    InvalidPhase {
        expected: RoundStatus,
        actual: RoundStatus,
    },

    #[error("The game has already started")]
    GameAlreadyStarted,

    #[error("The game is not in progress")]
    GameNotRunning,

    #[error("You are not in this room")]
    NotInRoom,

    #[error("Room not found")]
    RoomNotFound,

    #[error("Player not found")]
    PlayerNotFound,

    #[error("No active round")]
    RoundNotFound,

    #[error("Answer not found")]
    AnswerNotFound,

    #[error("You already answered this round")]
    DuplicateAnswer,

    #[error("You already voted this round")]
    AlreadyVoted,

    #[error("You cannot vote for your own answer")]
    SelfVoteForbidden,

    #[error("Only the host can {0}")]
    NotHost(&'static str),

    #[error("At least {need} players are needed to start, room has {have}")]
    NotEnoughPlayers { have: usize, need: usize },

    #[error("No prompts available")]
    NoPrompts,

    #[error("Round {number} does not follow round {current}")]
    RoundOutOfOrder { number: u32, current: u32 },
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        use GameError::*;

        match self {
            MissingField(_)
            | InvalidRoundCount(_)
            | TextTooLong { .. }
            | RoomFull
            | InvalidPhase { .. }
            | GameAlreadyStarted
            | GameNotRunning
            | NotInRoom => ErrorKind::Validation,
            RoomNotFound | PlayerNotFound | RoundNotFound | AnswerNotFound => ErrorKind::NotFound,
            DuplicateAnswer | AlreadyVoted | SelfVoteForbidden | NotHost(_)
            | NotEnoughPlayers { .. } => ErrorKind::Policy,
            NoPrompts | RoundOutOfOrder { .. } => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code sent to clients
    pub fn code(&self) -> &'static str {
        use GameError::*;

        match self {
            MissingField(_) => "MISSING_FIELD",
            InvalidRoundCount(_) => "INVALID_ROUND_COUNT",
            TextTooLong { .. } => "TEXT_TOO_LONG",
            RoomFull => "ROOM_FULL",
            InvalidPhase { .. } => "INVALID_PHASE",
            GameAlreadyStarted => "GAME_ALREADY_STARTED",
            GameNotRunning => "GAME_NOT_RUNNING",
            NotInRoom => "NOT_IN_ROOM",
            RoomNotFound => "ROOM_NOT_FOUND",
            PlayerNotFound => "PLAYER_NOT_FOUND",
            RoundNotFound => "ROUND_NOT_FOUND",
            AnswerNotFound => "ANSWER_NOT_FOUND",
            DuplicateAnswer => "DUPLICATE_ANSWER",
            AlreadyVoted => "ALREADY_VOTED",
            SelfVoteForbidden => "SELF_VOTE_FORBIDDEN",
            NotHost(_) => "NOT_HOST",
            NotEnoughPlayers { .. } => "NOT_ENOUGH_PLAYERS",
            NoPrompts => "NO_PROMPTS",
            RoundOutOfOrder { .. } => "ROUND_OUT_OF_ORDER",
        }
    }

    /// Message shown to the player. Internal failures are not detailed.
    pub fn client_message(&self) -> String {
        match self.kind() {
            ErrorKind::Internal => "Something went wrong, please try again".to_string(),
            _ => self.to_string(),
        }
    }
}
