//! Game flow: start, answers, votes, results and round advancement

use super::{clean_text, Coordinator};
use crate::error::{GameError, GameResult};
use crate::protocol::{AnswerInfo, PlayerInfo, RoundInfo, ServerMessage};
use crate::state::Advance;
use crate::types::*;
use std::sync::Arc;

impl Coordinator {
    pub async fn start_game(self: &Arc<Self>, connection_id: &str, room_code: &str) -> GameResult<()> {
        let (room, player) = self.require_member(connection_id, room_code).await?;
        Self::require_host(&player, "start the game")?;

        if room.status != RoomStatus::Waiting {
            return Err(GameError::GameAlreadyStarted);
        }
        let have = self.state.count_players_in_room(&room.id).await;
        if have < MIN_PLAYERS_TO_START {
            return Err(GameError::NotEnoughPlayers {
                have,
                need: MIN_PLAYERS_TO_START,
            });
        }
        if !self
            .state
            .transition_room_status(&room.id, RoomStatus::Waiting, RoomStatus::Playing)
            .await?
        {
            return Err(GameError::GameAlreadyStarted);
        }

        let round = match self.state.start_first_round(&room.id).await {
            Ok(round) => round,
            Err(e) => {
                self.state
                    .set_room_status(&room.id, RoomStatus::Waiting)
                    .await?;
                return Err(e);
            }
        };

        tracing::info!(room = %room.code, players = have, "Game started");
        self.state
            .broadcast_to_room(
                &room.id,
                ServerMessage::GameStarted {
                    round: RoundInfo::from(&round),
                    round_number: round.round_number,
                    total_rounds: room.total_rounds,
                    allow_self_vote: room.allow_self_vote,
                },
            )
            .await;
        self.arm_answer_timeout(&room.id, &round.id).await;
        Ok(())
    }

    pub async fn submit_answer(
        &self,
        connection_id: &str,
        room_code: &str,
        answer: &str,
    ) -> GameResult<()> {
        let (room, player) = self.require_member(connection_id, room_code).await?;
        Self::require_playing(&room)?;
        let text = clean_text(answer, "answer", self.config.max_answer_chars)?;
        let round = self.require_round_in(&room.id, RoundStatus::Answering).await?;

        self.state.submit_answer(&round.id, &player, text).await?;
        self.state
            .broadcast_to_room(
                &room.id,
                ServerMessage::PlayerAnswered {
                    player_id: player.id.clone(),
                    nickname: player.nickname.clone(),
                },
            )
            .await;

        self.advance_if_quorum(&room.id).await
    }

    pub async fn submit_vote(
        &self,
        connection_id: &str,
        room_code: &str,
        answer_id: &str,
    ) -> GameResult<()> {
        let (room, player) = self.require_member(connection_id, room_code).await?;
        Self::require_playing(&room)?;
        if answer_id.trim().is_empty() {
            return Err(GameError::MissingField("answer_id"));
        }
        let round = self.require_round_in(&room.id, RoundStatus::Voting).await?;

        let answer = self
            .state
            .cast_vote(&round.id, answer_id, &player.id, room.allow_self_vote)
            .await?;

        self.state
            .send_to(
                connection_id,
                ServerMessage::VoteRegistered {
                    answer_id: answer.id,
                },
            )
            .await;
        self.state
            .broadcast_to_room(
                &room.id,
                ServerMessage::PlayerVoted {
                    player_id: player.id.clone(),
                    nickname: player.nickname.clone(),
                },
            )
            .await;

        self.advance_if_quorum(&room.id).await
    }

    /// Host ends voting early
    pub async fn force_results(&self, connection_id: &str, room_code: &str) -> GameResult<()> {
        let (room, player) = self.require_member(connection_id, room_code).await?;
        Self::require_host(&player, "force results")?;
        Self::require_playing(&room)?;
        let round = self.require_round_in(&room.id, RoundStatus::Voting).await?;

        self.publish_results(&room.id, &round.id).await
    }

    pub async fn next_round(self: &Arc<Self>, connection_id: &str, room_code: &str) -> GameResult<()> {
        let (room, player) = self.require_member(connection_id, room_code).await?;
        Self::require_host(&player, "start the next round")?;

        match self.state.advance_round(&room.id).await? {
            Advance::NextRound(round) => {
                tracing::info!(room = %room.code, round = round.round_number, "Next round");
                self.state
                    .broadcast_to_room(
                        &room.id,
                        ServerMessage::NewRound {
                            round: RoundInfo::from(&round),
                            round_number: round.round_number,
                            total_rounds: room.total_rounds,
                        },
                    )
                    .await;
                self.arm_answer_timeout(&room.id, &round.id).await;
            }
            Advance::GameEnded { players, winner } => {
                self.state
                    .broadcast_to_room(
                        &room.id,
                        ServerMessage::GameEnded {
                            players: players.iter().map(PlayerInfo::from).collect(),
                            winner: winner.as_ref().map(PlayerInfo::from),
                        },
                    )
                    .await;
            }
        }
        Ok(())
    }

    /// Move the current round on if every member has acted. Counts are
    /// recomputed on each call so departures shrink the quorum.
    pub(crate) async fn advance_if_quorum(&self, room_id: &str) -> GameResult<()> {
        let Some(round) = self.state.current_round(room_id).await else {
            return Ok(());
        };
        let members = self.state.count_players_in_room(room_id).await;

        match round.status {
            RoundStatus::Answering => {
                if self.state.all_answered(&round.id, members).await {
                    self.open_voting(room_id, &round.id).await?;
                }
            }
            RoundStatus::Voting => {
                if self.state.all_voted(&round.id, members).await {
                    self.publish_results(room_id, &round.id).await?;
                }
            }
            RoundStatus::Results => {}
        }
        Ok(())
    }

    /// Close answering and show everyone the answers. A round that already
    /// left the answering phase is left alone.
    pub(crate) async fn open_voting(&self, room_id: &str, round_id: &str) -> GameResult<()> {
        if !self
            .state
            .transition_round(round_id, RoundStatus::Answering, RoundStatus::Voting)
            .await?
        {
            tracing::debug!(round = %round_id, "Voting already open");
            return Ok(());
        }
        self.cancel_answer_timeout(room_id, round_id).await;

        let room = self.state.get_room(room_id).await.ok_or(GameError::RoomNotFound)?;
        let round = self.state.get_round(round_id).await.ok_or(GameError::RoundNotFound)?;
        let answers: Vec<AnswerInfo> = self
            .state
            .answers_for_round(round_id)
            .await
            .iter()
            .map(AnswerInfo::from)
            .collect();

        tracing::info!(room = %room.code, round = round.round_number, answers = answers.len(), "Voting opened");
        self.state
            .broadcast_to_room(
                room_id,
                ServerMessage::StartVoting {
                    round: RoundInfo::from(&round),
                    answers,
                    allow_self_vote: room.allow_self_vote,
                },
            )
            .await;
        Ok(())
    }

    /// Score the round and broadcast results, at most once per round
    async fn publish_results(&self, room_id: &str, round_id: &str) -> GameResult<()> {
        if !self.state.finalize_results(round_id).await? {
            return Ok(());
        }

        let round = self.state.get_round(round_id).await.ok_or(GameError::RoundNotFound)?;
        let answers = self
            .state
            .results_for_round(round_id)
            .await
            .iter()
            .map(AnswerInfo::from)
            .collect();

        tracing::info!(room_id, round = round.round_number, "Results shown");
        self.state
            .broadcast_to_room(
                room_id,
                ServerMessage::ShowResults {
                    round: RoundInfo::from(&round),
                    answers,
                    players: self.player_infos(room_id).await,
                },
            )
            .await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::test_support::*;

    fn count<F: Fn(&ServerMessage) -> bool>(events: &[ServerMessage], f: F) -> usize {
        events.iter().filter(|&m| f(m)).count()
    }

    #[tokio::test]
    async fn test_start_game_checks() {
        let coord = coordinator();
        let (room, clients) = lobby(&coord, 2).await;

        assert_eq!(
            coord.start_game(&clients[0].conn, &room.code).await.unwrap_err(),
            GameError::NotEnoughPlayers { have: 2, need: 3 }
        );

        let third = connect(&coord, "c-3").await;
        coord.join_room(&third.conn, &room.code, "Third").await.unwrap();

        assert_eq!(
            coord.start_game(&clients[1].conn, &room.code).await.unwrap_err(),
            GameError::NotHost("start the game")
        );

        coord.start_game(&clients[0].conn, &room.code).await.unwrap();
        assert_eq!(
            coord.start_game(&clients[0].conn, &room.code).await.unwrap_err(),
            GameError::GameAlreadyStarted
        );
    }

    #[tokio::test]
    async fn test_start_game_opens_round_one() {
        let coord = coordinator();
        let (room, mut clients) = lobby(&coord, 3).await;

        coord.start_game(&clients[0].conn, &room.code).await.unwrap();

        let round = coord.state.current_round(&room.id).await.unwrap();
        assert_eq!(round.round_number, 1);
        assert_eq!(round.status, RoundStatus::Answering);
        match clients[2].drain().as_slice() {
            [ServerMessage::GameStarted {
                round_number,
                total_rounds,
                ..
            }] => {
                assert_eq!(*round_number, 1);
                assert_eq!(*total_rounds, DEFAULT_ROUNDS);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_all_answers_open_voting() {
        let coord = coordinator();
        let (room, mut clients, round) = started(&coord, 3).await;

        for (i, c) in clients.iter().enumerate() {
            coord
                .submit_answer(&c.conn, &room.code, &format!("answer {}", i))
                .await
                .unwrap();
        }

        assert_eq!(
            coord.state.get_round(&round.id).await.unwrap().status,
            RoundStatus::Voting
        );
        let events = clients[1].drain();
        assert_eq!(
            count(&events, |m| matches!(m, ServerMessage::PlayerAnswered { .. })),
            3
        );
        let voting: Vec<_> = events
            .iter()
            .filter_map(|m| match m {
                ServerMessage::StartVoting { answers, .. } => Some(answers.len()),
                _ => None,
            })
            .collect();
        assert_eq!(voting, vec![3]);
    }

    #[tokio::test]
    async fn test_answer_validation() {
        let coord = coordinator();
        let (room, clients, _) = started(&coord, 3).await;

        assert_eq!(
            coord
                .submit_answer(&clients[0].conn, &room.code, "   ")
                .await
                .unwrap_err(),
            GameError::MissingField("answer")
        );
        let long = "x".repeat(coord.config.max_answer_chars + 1);
        assert!(matches!(
            coord
                .submit_answer(&clients[0].conn, &room.code, &long)
                .await
                .unwrap_err(),
            GameError::TextTooLong { .. }
        ));

        coord
            .submit_answer(&clients[0].conn, &room.code, "once")
            .await
            .unwrap();
        assert_eq!(
            coord
                .submit_answer(&clients[0].conn, &room.code, "twice")
                .await
                .unwrap_err(),
            GameError::DuplicateAnswer
        );
    }

    #[tokio::test]
    async fn test_answer_before_game_starts() {
        let coord = coordinator();
        let (room, clients) = lobby(&coord, 3).await;

        assert_eq!(
            coord
                .submit_answer(&clients[0].conn, &room.code, "hi")
                .await
                .unwrap_err(),
            GameError::GameNotRunning
        );
    }

    /// Answers from every player, returns answer ids in player order
    async fn to_voting(
        coord: &Arc<Coordinator>,
        room: &Room,
        clients: &mut [Client],
    ) -> Vec<AnswerId> {
        for c in clients.iter() {
            coord
                .submit_answer(&c.conn, &room.code, &format!("by {}", c.conn))
                .await
                .unwrap();
        }
        for c in clients.iter_mut() {
            c.drain();
        }
        let round = coord.state.current_round(&room.id).await.unwrap();
        let answers = coord.state.answers_for_round(&round.id).await;
        answers.into_iter().map(|a| a.id).collect()
    }

    #[tokio::test]
    async fn test_everyone_votes_for_one_answer() {
        let coord = coordinator();
        let (room, mut clients, _) = started(&coord, 4).await;
        let answers = to_voting(&coord, &room, &mut clients).await;

        // Host's answer gets the three other votes; the host votes elsewhere
        coord
            .submit_vote(&clients[0].conn, &room.code, &answers[1])
            .await
            .unwrap();
        for c in &clients[1..] {
            coord
                .submit_vote(&c.conn, &room.code, &answers[0])
                .await
                .unwrap();
        }

        let players = coord.state.players_in_room(&room.id).await;
        assert_eq!(players[0].score, 300);
        assert_eq!(players[1].score, 100);
        assert_eq!(players[2].score, 0);
        assert_eq!(players[3].score, 0);

        let events = clients[2].drain();
        assert_eq!(
            count(&events, |m| matches!(m, ServerMessage::ShowResults { .. })),
            1
        );
        match events.last().unwrap() {
            ServerMessage::ShowResults { answers: ranked, .. } => {
                assert_eq!(ranked[0].id, answers[0]);
                assert_eq!(ranked[0].votes, 3);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(events.contains(&ServerMessage::VoteRegistered {
            answer_id: answers[0].clone()
        }));
    }

    #[tokio::test]
    async fn test_vote_errors() {
        let coord = coordinator();
        let (room, mut clients, _) = started(&coord, 3).await;

        assert!(matches!(
            coord
                .submit_vote(&clients[1].conn, &room.code, "whatever")
                .await
                .unwrap_err(),
            GameError::InvalidPhase { .. }
        ));

        let answers = to_voting(&coord, &room, &mut clients).await;
        assert_eq!(
            coord
                .submit_vote(&clients[1].conn, &room.code, &answers[1])
                .await
                .unwrap_err(),
            GameError::SelfVoteForbidden
        );
        assert_eq!(
            coord
                .submit_vote(&clients[1].conn, &room.code, "")
                .await
                .unwrap_err(),
            GameError::MissingField("answer_id")
        );
        coord
            .submit_vote(&clients[1].conn, &room.code, &answers[0])
            .await
            .unwrap();
        assert_eq!(
            coord
                .submit_vote(&clients[1].conn, &room.code, &answers[2])
                .await
                .unwrap_err(),
            GameError::AlreadyVoted
        );
    }

    #[tokio::test]
    async fn test_force_results_then_quorum_scores_once() {
        let coord = coordinator();
        let (room, mut clients, round) = started(&coord, 3).await;
        let answers = to_voting(&coord, &room, &mut clients).await;

        coord
            .submit_vote(&clients[1].conn, &room.code, &answers[0])
            .await
            .unwrap();
        assert_eq!(
            coord
                .force_results(&clients[1].conn, &room.code)
                .await
                .unwrap_err(),
            GameError::NotHost("force results")
        );
        coord.force_results(&clients[0].conn, &room.code).await.unwrap();

        // A second force finds the round already scored
        assert!(matches!(
            coord
                .force_results(&clients[0].conn, &room.code)
                .await
                .unwrap_err(),
            GameError::InvalidPhase { .. }
        ));
        assert!(!coord.state.finalize_results(&round.id).await.unwrap());

        let host = coord
            .state
            .find_player_by_connection(&clients[0].conn)
            .await
            .unwrap();
        assert_eq!(host.score, 100);
        assert_eq!(
            count(&clients[2].drain(), |m| matches!(
                m,
                ServerMessage::ShowResults { .. }
            )),
            1
        );
    }

    #[tokio::test]
    async fn test_leaving_completes_answering() {
        let coord = coordinator();
        let (room, mut clients, round) = started(&coord, 4).await;

        for c in &clients[..3] {
            coord
                .submit_answer(&c.conn, &room.code, "done")
                .await
                .unwrap();
        }
        assert_eq!(
            coord.state.get_round(&round.id).await.unwrap().status,
            RoundStatus::Answering
        );

        coord.leave_room(&clients[3].conn, &room.code).await.unwrap();

        assert_eq!(
            coord.state.get_round(&round.id).await.unwrap().status,
            RoundStatus::Voting
        );
        assert_eq!(
            count(&clients[0].drain(), |m| matches!(
                m,
                ServerMessage::StartVoting { .. }
            )),
            1
        );
    }

    #[tokio::test]
    async fn test_next_round_and_game_end() {
        let coord = coordinator();
        let (room, mut clients, _) = started(&coord, 3).await;

        assert!(matches!(
            coord.next_round(&clients[0].conn, &room.code).await.unwrap_err(),
            GameError::InvalidPhase { .. }
        ));

        for n in 1..=DEFAULT_ROUNDS {
            let answers = to_voting(&coord, &room, &mut clients).await;
            // Everyone votes for Guest1's answer
            coord
                .submit_vote(&clients[0].conn, &room.code, &answers[1])
                .await
                .unwrap();
            coord
                .submit_vote(&clients[2].conn, &room.code, &answers[1])
                .await
                .unwrap();
            coord
                .submit_vote(&clients[1].conn, &room.code, &answers[0])
                .await
                .unwrap();

            assert_eq!(
                coord
                    .next_round(&clients[1].conn, &room.code)
                    .await
                    .unwrap_err(),
                GameError::NotHost("start the next round")
            );
            coord.next_round(&clients[0].conn, &room.code).await.unwrap();

            let events = clients[2].drain();
            if n < DEFAULT_ROUNDS {
                assert!(events.iter().any(|m| matches!(
                    m,
                    ServerMessage::NewRound { round_number, .. } if *round_number == n + 1
                )));
            } else {
                match events.last().unwrap() {
                    ServerMessage::GameEnded { winner, players } => {
                        let winner = winner.as_ref().unwrap();
                        assert_eq!(winner.nickname, "Guest1");
                        assert_eq!(winner.score, 200 * DEFAULT_ROUNDS);
                        assert_eq!(players.len(), 3);
                    }
                    other => panic!("unexpected {:?}", other),
                }
            }
        }

        assert_eq!(
            coord.state.get_room(&room.id).await.unwrap().status,
            RoomStatus::Finished
        );
        assert_eq!(
            coord.next_round(&clients[0].conn, &room.code).await.unwrap_err(),
            GameError::GameNotRunning
        );
    }
}
