use super::{new_id, AppState};
use crate::error::{GameError, GameResult};
use crate::prompts::random_filler;
use crate::types::*;

impl AppState {
    /// Record a player's answer for a round in the answering phase
    pub async fn submit_answer(
        &self,
        round_id: &str,
        player: &Player,
        text: String,
    ) -> GameResult<Answer> {
        self.insert_answer(round_id, player, text, false).await
    }

    /// Record a generated answer for a player who missed the deadline
    pub async fn submit_filler_answer(&self, round_id: &str, player: &Player) -> GameResult<Answer> {
        self.insert_answer(round_id, player, random_filler().to_string(), true)
            .await
    }

    async fn insert_answer(
        &self,
        round_id: &str,
        player: &Player,
        text: String,
        is_filler: bool,
    ) -> GameResult<Answer> {
        // Hold the round so it cannot leave the answering phase mid-insert
        let rounds = self.rounds.read().await;
        let round = rounds.get(round_id).ok_or(GameError::RoundNotFound)?;
        if round.status != RoundStatus::Answering {
            return Err(GameError::InvalidPhase {
                expected: RoundStatus::Answering,
                actual: round.status,
            });
        }

        let mut answers = self.answers.write().await;
        if answers
            .values()
            .any(|a| a.round_id == round_id && a.player_id == player.id)
        {
            return Err(GameError::DuplicateAnswer);
        }

        let answer = Answer {
            id: new_id(),
            round_id: round_id.to_string(),
            player_id: player.id.clone(),
            player_nickname: player.nickname.clone(),
            text,
            votes: 0,
            is_filler,
            submitted_seq: self.next_seq(),
        };
        answers.insert(answer.id.clone(), answer.clone());

        tracing::debug!(round = %round_id, player = %player.nickname, is_filler, "Answer recorded");
        Ok(answer)
    }

    /// Answers for a round in submission order
    pub async fn answers_for_round(&self, round_id: &str) -> Vec<Answer> {
        let mut answers: Vec<Answer> = self
            .answers
            .read()
            .await
            .values()
            .filter(|a| a.round_id == round_id)
            .cloned()
            .collect();
        answers.sort_by_key(|a| a.submitted_seq);
        answers
    }

    pub async fn answer_for_player(&self, round_id: &str, player_id: &str) -> Option<Answer> {
        self.answers
            .read()
            .await
            .values()
            .find(|a| a.round_id == round_id && a.player_id == player_id)
            .cloned()
    }

    pub async fn has_answered(&self, round_id: &str, player_id: &str) -> bool {
        self.answer_for_player(round_id, player_id).await.is_some()
    }

    /// True once `expected_player_count` current room members have answered.
    /// Answers from players who already left the room do not count.
    pub async fn all_answered(&self, round_id: &str, expected_player_count: usize) -> bool {
        if expected_player_count == 0 {
            return false;
        }

        let players = self.players.read().await;
        let rounds = self.rounds.read().await;
        let Some(round) = rounds.get(round_id) else {
            return false;
        };
        let answers = self.answers.read().await;

        let count = answers
            .values()
            .filter(|a| a.round_id == round_id)
            .filter(|a| {
                players
                    .get(&a.player_id)
                    .is_some_and(|p| p.room_id == round.room_id)
            })
            .count();
        count >= expected_player_count
    }
}
