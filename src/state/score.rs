use crate::error::GameResult;
use crate::state::AppState;
use crate::types::*;

/// The first player with the highest score. Ties go to whoever comes first
/// in `players`, which is registry order (host, then join order).
pub fn leading_player(players: &[Player]) -> Option<&Player> {
    players.iter().fold(None, |best: Option<&Player>, p| match best {
        Some(b) if b.score >= p.score => Some(b),
        _ => Some(p),
    })
}

impl AppState {
    /// Close voting and award points.
    ///
    /// Returns false without touching scores if the round was no longer in
    /// the voting phase, so each round is scored at most once.
    pub async fn finalize_results(&self, round_id: &str) -> GameResult<bool> {
        if !self
            .transition_round(round_id, RoundStatus::Voting, RoundStatus::Results)
            .await?
        {
            tracing::debug!(round = %round_id, "Results already finalized");
            return Ok(false);
        }

        for answer in self.answers_for_round(round_id).await {
            if answer.votes == 0 {
                continue;
            }
            let points = answer.votes.saturating_mul(POINTS_PER_VOTE);
            match self.update_score(&answer.player_id, points).await {
                Some(player) => tracing::debug!(
                    player = %player.nickname,
                    points,
                    total = player.score,
                    "Points awarded"
                ),
                // The author left; their points go nowhere
                None => tracing::debug!(player = %answer.player_id, points, "Author gone, points dropped"),
            }
        }

        Ok(true)
    }

    /// Answers ranked for display: most votes first, then submission order
    pub async fn results_for_round(&self, round_id: &str) -> Vec<Answer> {
        let mut answers = self.answers_for_round(round_id).await;
        // Stable sort keeps submission order among equal vote counts
        answers.sort_by(|a, b| b.votes.cmp(&a.votes));
        answers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::*;

    fn player(id: &str, score: u32) -> Player {
        Player {
            id: id.to_string(),
            room_id: "r".to_string(),
            connection_id: format!("c-{}", id),
            nickname: id.to_string(),
            is_host: false,
            score,
            joined_seq: 0,
        }
    }

    #[test]
    fn test_leading_player_ties_go_to_first() {
        let players = vec![player("a", 100), player("b", 300), player("c", 300)];
        assert_eq!(leading_player(&players).unwrap().id, "b");

        let players = vec![player("a", 0), player("b", 0)];
        assert_eq!(leading_player(&players).unwrap().id, "a");

        assert!(leading_player(&[]).is_none());
    }

    #[tokio::test]
    async fn test_finalize_awards_points_once() {
        let state = AppState::new();
        let (_, players, round, answers) = voting_round(&state, 3).await;

        // Everyone votes for P0's answer; P0 needs self-voting to count
        state
            .cast_vote(&round.id, &answers[0].id, &players[0].id, true)
            .await
            .unwrap();
        state
            .cast_vote(&round.id, &answers[0].id, &players[1].id, false)
            .await
            .unwrap();
        state
            .cast_vote(&round.id, &answers[0].id, &players[2].id, false)
            .await
            .unwrap();

        assert!(state.finalize_results(&round.id).await.unwrap());
        assert!(!state.finalize_results(&round.id).await.unwrap());

        assert_eq!(state.get_player(&players[0].id).await.unwrap().score, 300);
        assert_eq!(state.get_player(&players[1].id).await.unwrap().score, 0);
        assert_eq!(state.get_player(&players[2].id).await.unwrap().score, 0);
        assert_eq!(
            state.get_round(&round.id).await.unwrap().status,
            RoundStatus::Results
        );
    }

    #[tokio::test]
    async fn test_finalize_skips_departed_authors() {
        let state = AppState::new();
        let (_, players, round, answers) = voting_round(&state, 3).await;
        state
            .cast_vote(&round.id, &answers[2].id, &players[0].id, false)
            .await
            .unwrap();
        state
            .cast_vote(&round.id, &answers[1].id, &players[2].id, false)
            .await
            .unwrap();
        state.delete_player(&players[2].id).await;

        assert!(state.finalize_results(&round.id).await.unwrap());
        assert_eq!(state.get_player(&players[1].id).await.unwrap().score, 100);
        assert!(state.get_player(&players[2].id).await.is_none());
    }

    #[tokio::test]
    async fn test_finalize_requires_voting_phase() {
        let state = AppState::new();
        let (_, _, round) = answering_round(&state, 3).await;

        assert!(!state.finalize_results(&round.id).await.unwrap());
        assert_eq!(
            state.get_round(&round.id).await.unwrap().status,
            RoundStatus::Answering
        );
    }

    #[tokio::test]
    async fn test_results_ordering() {
        let state = AppState::new();
        let (_, players, round, answers) = voting_round(&state, 4).await;
        state
            .cast_vote(&round.id, &answers[2].id, &players[0].id, false)
            .await
            .unwrap();
        state
            .cast_vote(&round.id, &answers[2].id, &players[1].id, false)
            .await
            .unwrap();
        state
            .cast_vote(&round.id, &answers[3].id, &players[2].id, false)
            .await
            .unwrap();

        let ids: Vec<_> = state
            .results_for_round(&round.id)
            .await
            .into_iter()
            .map(|a| a.id)
            .collect();
        assert_eq!(
            ids,
            vec![
                answers[2].id.clone(),
                answers[3].id.clone(),
                answers[0].id.clone(),
                answers[1].id.clone()
            ]
        );
    }

    #[tokio::test]
    async fn test_winner_is_top_scorer() {
        let state = AppState::new();
        let (room, players) = room_with_players(&state, 3).await;
        state.update_score(&players[1].id, 200).await;
        state.update_score(&players[2].id, 200).await;

        // Tie between P1 and P2: P1 joined first
        let ranked = state.players_in_room(&room.id).await;
        assert_eq!(leading_player(&ranked).unwrap().id, players[1].id);
    }
}
