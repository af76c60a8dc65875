use crate::error::{GameError, GameResult};
use crate::state::AppState;
use crate::types::*;
use std::collections::HashSet;

impl AppState {
    /// Record a vote and bump the answer's count in one step.
    ///
    /// Holds the round, answer and vote locks together, so two concurrent
    /// votes can neither lose an increment nor both pass the duplicate check.
    pub async fn cast_vote(
        &self,
        round_id: &str,
        answer_id: &str,
        voter_id: &str,
        allow_self_vote: bool,
    ) -> GameResult<Answer> {
        let rounds = self.rounds.read().await;
        let round = rounds.get(round_id).ok_or(GameError::RoundNotFound)?;
        if round.status != RoundStatus::Voting {
            return Err(GameError::InvalidPhase {
                expected: RoundStatus::Voting,
                actual: round.status,
            });
        }

        let mut answers = self.answers.write().await;
        let answer = answers
            .get_mut(answer_id)
            .filter(|a| a.round_id == round_id)
            .ok_or(GameError::AnswerNotFound)?;

        if answer.player_id == voter_id && !allow_self_vote {
            return Err(GameError::SelfVoteForbidden);
        }

        let mut votes = self.votes.write().await;
        if votes
            .iter()
            .any(|v| v.round_id == round_id && v.player_id == voter_id)
        {
            return Err(GameError::AlreadyVoted);
        }

        votes.push(Vote {
            answer_id: answer_id.to_string(),
            round_id: round_id.to_string(),
            player_id: voter_id.to_string(),
        });
        answer.votes += 1;

        tracing::debug!(round = %round_id, answer = %answer_id, voter = %voter_id, "Vote recorded");
        Ok(answer.clone())
    }

    pub async fn has_voted(&self, round_id: &str, player_id: &str) -> bool {
        self.votes
            .read()
            .await
            .iter()
            .any(|v| v.round_id == round_id && v.player_id == player_id)
    }

    /// True once `expected_player_count` distinct current room members have
    /// voted in the round
    pub async fn all_voted(&self, round_id: &str, expected_player_count: usize) -> bool {
        if expected_player_count == 0 {
            return false;
        }

        let players = self.players.read().await;
        let rounds = self.rounds.read().await;
        let Some(round) = rounds.get(round_id) else {
            return false;
        };
        let votes = self.votes.read().await;

        let voters: HashSet<&str> = votes
            .iter()
            .filter(|v| v.round_id == round_id)
            .filter(|v| {
                players
                    .get(&v.player_id)
                    .is_some_and(|p| p.room_id == round.room_id)
            })
            .map(|v| v.player_id.as_str())
            .collect();
        voters.len() >= expected_player_count
    }
}
