use super::{new_id, score::leading_player, AppState};
use crate::error::{GameError, GameResult};
use crate::types::*;
use std::collections::HashMap;

/// Outcome of moving a room past its current round
#[derive(Debug, Clone)]
pub enum Advance {
    NextRound(Round),
    GameEnded {
        players: Vec<Player>,
        winner: Option<Player>,
    },
}

fn latest_round<'a>(rounds: &'a HashMap<RoundId, Round>, room_id: &str) -> Option<&'a Round> {
    rounds
        .values()
        .filter(|r| r.room_id == room_id)
        .max_by_key(|r| r.round_number)
}

fn used_prompts(rounds: &HashMap<RoundId, Round>, room_id: &str) -> Vec<PromptId> {
    rounds
        .values()
        .filter(|r| r.room_id == room_id)
        .map(|r| r.prompt.id.clone())
        .collect()
}

fn insert_round(
    rounds: &mut HashMap<RoundId, Round>,
    room_id: &str,
    round_number: u32,
    prompt: Prompt,
) -> GameResult<Round> {
    let current = latest_round(rounds, room_id).map_or(0, |r| r.round_number);
    if round_number <= current {
        return Err(GameError::RoundOutOfOrder {
            number: round_number,
            current,
        });
    }

    let round = Round {
        id: new_id(),
        room_id: room_id.to_string(),
        round_number,
        prompt,
        status: RoundStatus::Answering,
    };
    rounds.insert(round.id.clone(), round.clone());

    tracing::debug!(room_id, round_number, prompt = %round.prompt.id, "Round created");
    Ok(round)
}

impl AppState {
    /// Create a round in the answering phase. The number must be higher
    /// than every existing round in the room.
    pub async fn create_round(
        &self,
        room_id: &str,
        round_number: u32,
        prompt: Prompt,
    ) -> GameResult<Round> {
        let mut rounds = self.rounds.write().await;
        insert_round(&mut rounds, room_id, round_number, prompt)
    }

    /// Create the first round of a game with a random prompt
    pub async fn start_first_round(&self, room_id: &str) -> GameResult<Round> {
        let mut rounds = self.rounds.write().await;
        let used = used_prompts(&rounds, room_id);
        let prompt = self
            .prompts
            .random_prompt(&used)
            .ok_or(GameError::NoPrompts)?;
        insert_round(&mut rounds, room_id, 1, prompt)
    }

    pub async fn get_round(&self, round_id: &str) -> Option<Round> {
        self.rounds.read().await.get(round_id).cloned()
    }

    /// The round with the highest number in the room, whatever its status
    pub async fn current_round(&self, room_id: &str) -> Option<Round> {
        latest_round(&*self.rounds.read().await, room_id).cloned()
    }

    /// Move a round from `from` to the phase after it, only if it is still
    /// in `from`. Returns false when the round already moved on.
    pub async fn transition_round(
        &self,
        round_id: &str,
        from: RoundStatus,
        to: RoundStatus,
    ) -> GameResult<bool> {
        if from.next() != Some(to) {
            return Err(GameError::InvalidPhase {
                expected: from,
                actual: to,
            });
        }

        let mut rounds = self.rounds.write().await;
        let round = rounds.get_mut(round_id).ok_or(GameError::RoundNotFound)?;
        if round.status != from {
            return Ok(false);
        }
        round.status = to;

        tracing::debug!(round = %round.id, number = round.round_number, status = ?to, "Round status changed");
        Ok(true)
    }

    /// Drop every round in the room along with its answers and votes
    pub async fn delete_rounds_in_room(&self, room_id: &str) {
        let mut rounds = self.rounds.write().await;
        let round_ids: Vec<RoundId> = rounds
            .values()
            .filter(|r| r.room_id == room_id)
            .map(|r| r.id.clone())
            .collect();
        rounds.retain(|_, r| r.room_id != room_id);

        let mut answers = self.answers.write().await;
        answers.retain(|_, a| !round_ids.contains(&a.round_id));
        let mut votes = self.votes.write().await;
        votes.retain(|v| !round_ids.contains(&v.round_id));
    }

    /// Finish the current round: open the next one, or end the game once
    /// the room has played all of its rounds.
    pub async fn advance_round(&self, room_id: &str) -> GameResult<Advance> {
        let room = self.get_room(room_id).await.ok_or(GameError::RoomNotFound)?;
        if room.status != RoomStatus::Playing {
            return Err(GameError::GameNotRunning);
        }

        {
            let mut rounds = self.rounds.write().await;
            let current = latest_round(&rounds, room_id).ok_or(GameError::RoundNotFound)?;
            if current.status != RoundStatus::Results {
                return Err(GameError::InvalidPhase {
                    expected: RoundStatus::Results,
                    actual: current.status,
                });
            }

            let number = current.round_number + 1;
            if number <= room.total_rounds {
                let used = used_prompts(&rounds, room_id);
                let prompt = self
                    .prompts
                    .random_prompt(&used)
                    .ok_or(GameError::NoPrompts)?;
                let round = insert_round(&mut rounds, room_id, number, prompt)?;
                return Ok(Advance::NextRound(round));
            }
        }

        // Only one caller gets to end the game
        if !self
            .transition_room_status(room_id, RoomStatus::Playing, RoomStatus::Finished)
            .await?
        {
            return Err(GameError::GameNotRunning);
        }

        let players = self.players_in_room(room_id).await;
        let winner = leading_player(&players).cloned();
        tracing::info!(
            room = %room.code,
            winner = winner.as_ref().map(|p| p.nickname.as_str()).unwrap_or("-"),
            "Game finished"
        );
        Ok(Advance::GameEnded { players, winner })
    }
}
