//! WebSocket message dispatch
//!
//! Routes each client command to the coordinator. Replies and broadcasts go
//! out through the connection outboxes; the only direct response is the
//! error for a rejected command.

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::session::Coordinator;
use std::sync::Arc;

/// Handle a client message and return an error response if it was rejected
pub async fn handle_message(
    coord: &Arc<Coordinator>,
    connection_id: &str,
    msg: ClientMessage,
) -> Option<ServerMessage> {
    let result = match msg {
        // Lobby
        ClientMessage::CreateRoom {
            nickname,
            total_rounds,
            allow_self_vote,
        } => {
            coord
                .create_room(connection_id, &nickname, total_rounds, allow_self_vote)
                .await
        }

        ClientMessage::JoinRoom {
            room_code,
            nickname,
        } => coord.join_room(connection_id, &room_code, &nickname).await,

        ClientMessage::LeaveRoom { room_code } => {
            coord.leave_room(connection_id, &room_code).await
        }

        ClientMessage::SendMessage { room_code, message } => {
            coord.send_message(connection_id, &room_code, &message).await
        }

        // Game flow
        ClientMessage::StartGame { room_code } => {
            coord.start_game(connection_id, &room_code).await
        }

        ClientMessage::SubmitAnswer { room_code, answer } => {
            coord.submit_answer(connection_id, &room_code, &answer).await
        }

        ClientMessage::GetMyAnswer { room_code } => {
            coord.get_my_answer(connection_id, &room_code).await
        }

        ClientMessage::SubmitVote {
            room_code,
            answer_id,
        } => coord.submit_vote(connection_id, &room_code, &answer_id).await,

        // Host-only; the coordinator checks the role
        ClientMessage::ForceResults { room_code } => {
            coord.force_results(connection_id, &room_code).await
        }

        ClientMessage::NextRound { room_code } => {
            coord.next_round(connection_id, &room_code).await
        }

        ClientMessage::RestartGame { room_code } => {
            coord.restart_game(connection_id, &room_code).await
        }
    };

    result.err().map(|e| error_response(connection_id, e))
}

fn error_response(connection_id: &str, err: GameError) -> ServerMessage {
    tracing::warn!(
        connection = %connection_id,
        code = err.code(),
        "Command rejected: {}",
        err
    );
    ServerMessage::Error {
        code: err.code().to_string(),
        message: err.client_message(),
    }
}
