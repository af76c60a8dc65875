//! Answering-phase and disconnect-grace timers
//!
//! Every timer is a spawned task sleeping for its delay. Handles live in a
//! registry owned by the coordinator so they can be cancelled; a firing task
//! removes its own entry first and then re-checks state before acting, so a
//! timer that lost a race with a player command does nothing.

use super::Coordinator;
use crate::error::{GameError, GameResult};
use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// Fills missing answers when a round's answering window closes
    AnswerTimeout { room_id: RoomId, round_id: RoundId },
    /// Removes a disconnected player who did not come back
    DisconnectGrace { room_id: RoomId, player_id: PlayerId },
}

impl TimerKey {
    pub fn room_id(&self) -> &str {
        match self {
            TimerKey::AnswerTimeout { room_id, .. } => room_id,
            TimerKey::DisconnectGrace { room_id, .. } => room_id,
        }
    }
}

struct Armed {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Pending timers keyed by what they guard
#[derive(Default)]
pub struct TimerRegistry {
    timers: Mutex<HashMap<TimerKey, Armed>>,
    generation: AtomicU64,
}

impl TimerRegistry {
    fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Spawn a timer task and track it, aborting any timer already armed
    /// for the key. The entry is inserted before the lock is released, so
    /// the task's `finish` always finds it.
    async fn arm<F>(&self, key: TimerKey, generation: u64, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut timers = self.timers.lock().await;
        let handle = tokio::spawn(task);
        if let Some(old) = timers.insert(key, Armed { generation, handle }) {
            old.handle.abort();
        }
    }

    /// Called by a firing timer. Removes the entry only if it still belongs
    /// to that timer, so a newer timer for the same key stays tracked.
    async fn finish(&self, key: &TimerKey, generation: u64) {
        let mut timers = self.timers.lock().await;
        if timers.get(key).is_some_and(|t| t.generation == generation) {
            timers.remove(key);
        }
    }

    /// Cancel a timer. Returns true if one was pending.
    pub async fn cancel(&self, key: &TimerKey) -> bool {
        match self.timers.lock().await.remove(key) {
            Some(armed) => {
                armed.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Cancel every timer belonging to a room
    pub async fn cancel_room(&self, room_id: &str) {
        self.cancel_matching(|key| key.room_id() == room_id).await;
    }

    /// Cancel a room's answering timeouts, leaving disconnect grace timers
    pub async fn cancel_answer_timeouts(&self, room_id: &str) {
        self.cancel_matching(|key| {
            matches!(key, TimerKey::AnswerTimeout { .. }) && key.room_id() == room_id
        })
        .await;
    }

    async fn cancel_matching(&self, pred: impl Fn(&TimerKey) -> bool) {
        let mut timers = self.timers.lock().await;
        timers.retain(|key, armed| {
            if pred(key) {
                armed.handle.abort();
                false
            } else {
                true
            }
        });
    }

    pub async fn is_armed(&self, key: &TimerKey) -> bool {
        self.timers.lock().await.contains_key(key)
    }

    pub async fn len(&self) -> usize {
        self.timers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Coordinator {
    /// Start the answering window for a fresh round
    pub(crate) async fn arm_answer_timeout(self: &Arc<Self>, room_id: &str, round_id: &str) {
        let key = TimerKey::AnswerTimeout {
            room_id: room_id.to_string(),
            round_id: round_id.to_string(),
        };
        let generation = self.timers.next_generation();
        let delay = self.config.answer_timeout;

        let coord = Arc::clone(self);
        let task_key = key.clone();
        self.timers
            .arm(key, generation, async move {
                tokio::time::sleep(delay).await;
                coord.timers.finish(&task_key, generation).await;
                coord.answering_timeout_elapsed(&task_key).await;
            })
            .await;

        tracing::debug!(round = %round_id, ?delay, "Answer timeout armed");
    }

    pub(crate) async fn cancel_answer_timeout(&self, room_id: &str, round_id: &str) {
        let key = TimerKey::AnswerTimeout {
            room_id: room_id.to_string(),
            round_id: round_id.to_string(),
        };
        if self.timers.cancel(&key).await {
            tracing::debug!(round = %round_id, "Answer timeout cancelled");
        }
    }

    async fn answering_timeout_elapsed(self: &Arc<Self>, key: &TimerKey) {
        let TimerKey::AnswerTimeout { room_id, round_id } = key else {
            return;
        };
        if let Err(e) = self.fill_missing_answers(room_id, round_id).await {
            tracing::error!(round = %round_id, "Answer timeout failed: {}", e);
        }
    }

    /// Give every member without an answer a filler one, then open voting
    async fn fill_missing_answers(self: &Arc<Self>, room_id: &str, round_id: &str) -> GameResult<()> {
        let current = self.state.current_round(room_id).await;
        let round = match current {
            Some(r) if r.id == round_id && r.status == RoundStatus::Answering => r,
            _ => {
                tracing::debug!(round = %round_id, "Answer timeout fired after round moved on");
                return Ok(());
            }
        };

        let mut filled = 0;
        for player in self.state.players_in_room(room_id).await {
            if self.state.has_answered(&round.id, &player.id).await {
                continue;
            }
            match self.state.submit_filler_answer(&round.id, &player).await {
                Ok(_) => {
                    filled += 1;
                    self.state
                        .broadcast_to_room(
                            room_id,
                            ServerMessage::PlayerAnswered {
                                player_id: player.id.clone(),
                                nickname: player.nickname.clone(),
                            },
                        )
                        .await;
                }
                // Answered between our check and insert
                Err(GameError::DuplicateAnswer) => {}
                // Quorum closed the round while we were filling
                Err(GameError::InvalidPhase { .. }) => return Ok(()),
                Err(e) => return Err(e),
            }
        }

        tracing::info!(round = %round_id, filled, "Answering time is up");
        self.open_voting(room_id, &round.id).await
    }

    /// Start the grace period for a player who dropped mid-game
    pub(crate) async fn arm_disconnect_grace(self: &Arc<Self>, player: &Player) {
        let key = TimerKey::DisconnectGrace {
            room_id: player.room_id.clone(),
            player_id: player.id.clone(),
        };
        let generation = self.timers.next_generation();
        let delay = self.config.disconnect_grace;

        let coord = Arc::clone(self);
        let task_key = key.clone();
        let player_id = player.id.clone();
        let connection_id = player.connection_id.clone();
        self.timers
            .arm(key, generation, async move {
                tokio::time::sleep(delay).await;
                coord.timers.finish(&task_key, generation).await;
                coord
                    .disconnect_grace_elapsed(&player_id, &connection_id)
                    .await;
            })
            .await;

        tracing::debug!(player = %player.nickname, ?delay, "Disconnect grace armed");
    }

    pub(crate) async fn cancel_disconnect_grace(&self, player: &Player) {
        let key = TimerKey::DisconnectGrace {
            room_id: player.room_id.clone(),
            player_id: player.id.clone(),
        };
        if self.timers.cancel(&key).await {
            tracing::debug!(player = %player.nickname, "Disconnect grace cancelled");
        }
    }

    async fn disconnect_grace_elapsed(self: &Arc<Self>, player_id: &str, connection_id: &str) {
        let Some(player) = self.state.get_player(player_id).await else {
            return;
        };
        // A reconnect rebinds the player to a new connection
        if player.connection_id != connection_id {
            tracing::debug!(player = %player.nickname, "Player came back before grace ran out");
            return;
        }

        tracing::info!(player = %player.nickname, "Removing player after disconnect grace");
        if let Err(e) = self
            .remove_member(&player, super::lobby::Departure::Removed)
            .await
        {
            tracing::error!(player = %player.nickname, "Failed to remove player: {}", e);
        }
    }
}
