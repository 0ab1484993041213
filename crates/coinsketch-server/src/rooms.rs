//! Coordinator driver: wires the pure transition rules to the store.
//!
//! Host-only actions are authenticated by the caller's client identifier —
//! the player row behind it must be the room's host. Timed transitions run
//! as detached countdown tasks tagged with the room's round counter, so the
//! room keeps advancing even if the host's own connection goes away, and a
//! stale countdown can never fire into a later round.

use std::sync::Arc;
use std::time::Duration;

use coinsketch_core::catalog;
use coinsketch_core::coordinator::{self, HostAction, MEMORIZE_SECS};
use coinsketch_core::room::{Coin, DEFAULT_PLAYER_NAME, Player, Room};
use thiserror::Error;

use crate::store::{RoomStore, StoreError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomsError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller's player row is not the room's host.
    #[error("only the host can {0}")]
    NotHost(&'static str),

    #[error(transparent)]
    Transition(#[from] coordinator::TransitionError),
}

/// Outcome of a successful join.
#[derive(Debug)]
pub struct Joined {
    pub room: Room,
    pub player: Player,
    pub is_host: bool,
}

/// Drives rooms through their phases on top of the [`RoomStore`].
pub struct RoomCoordinator {
    store: Arc<RoomStore>,
}

impl RoomCoordinator {
    pub fn new(store: Arc<RoomStore>) -> Self {
        Self { store }
    }

    pub async fn create_room(&self) -> Room {
        let room = self.store.create_room().await;
        tracing::info!(room = %room.code, "Room created");
        room
    }

    /// The join protocol: look up by code, upsert the player row, then make
    /// a best-effort host claim if the room has no host yet.
    pub async fn join(
        &self,
        code: &str,
        client_id: &str,
        name: Option<&str>,
    ) -> Result<Joined, RoomsError> {
        let room = self.store.room_by_code(code).await?;

        let name = match name.map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => DEFAULT_PLAYER_NAME,
        };
        let player = self.store.upsert_player(&room.id, client_id, name).await?;

        if room.host_id.is_none() {
            // Losing the claim is the expected outcome for all but the
            // first joiner.
            let claimed = self.store.claim_host(&room.id, &player.id).await?;
            if claimed {
                tracing::info!(room = %room.code, player = %player.id, "Host claimed");
            }
        }

        // Re-read so the returned row reflects whoever won the claim.
        let (room, _) = self.store.snapshot(&room.id).await?;
        let is_host = room.host_id.as_deref() == Some(player.id.as_str());
        Ok(Joined {
            room,
            player,
            is_host,
        })
    }

    /// Host action: `waiting → memorize`, assigning the round's coin.
    ///
    /// The host may pass the coin it picked; otherwise one is drawn from the
    /// catalog here.
    pub async fn start_round(
        &self,
        code: &str,
        client_id: &str,
        coin: Option<Coin>,
    ) -> Result<Room, RoomsError> {
        let room = self.host_room(code, client_id, "start a round").await?;
        let transition = coordinator::host_transition(
            room.phase,
            HostAction::StartRound {
                coin: coin.unwrap_or_else(catalog::draw_coin),
            },
        )?;
        let updated = self.store.apply_transition(&room.id, &transition).await?;
        tracing::info!(room = %updated.code, round = updated.round, "Round started");
        self.spawn_memorize_countdown(&updated);
        Ok(updated)
    }

    /// Host action: `compare → memorize` with an atomic round reset.
    pub async fn next_round(
        &self,
        code: &str,
        client_id: &str,
        coin: Option<Coin>,
    ) -> Result<Room, RoomsError> {
        let room = self.host_room(code, client_id, "start the next round").await?;
        let transition = coordinator::host_transition(
            room.phase,
            HostAction::NextRound {
                coin: coin.unwrap_or_else(catalog::draw_coin),
            },
        )?;
        let updated = self.store.apply_transition(&room.id, &transition).await?;
        tracing::info!(room = %updated.code, round = updated.round, "Next round started");
        self.spawn_memorize_countdown(&updated);
        Ok(updated)
    }

    /// Host action: `compare → waiting`, clearing the coin and all drawings.
    pub async fn back_to_lobby(&self, code: &str, client_id: &str) -> Result<Room, RoomsError> {
        let room = self.host_room(code, client_id, "return to the lobby").await?;
        let transition = coordinator::host_transition(room.phase, HostAction::BackToLobby)?;
        let updated = self.store.apply_transition(&room.id, &transition).await?;
        tracing::info!(room = %updated.code, "Back to lobby");
        Ok(updated)
    }

    /// Record a player's submitted drawing, then run the completion check:
    /// once every player row is done, `draw → compare` advances
    /// automatically. The CAS guard makes a racing duplicate check a no-op.
    pub async fn record_submission(
        &self,
        code: &str,
        client_id: &str,
        drawing_url: &str,
    ) -> Result<Player, RoomsError> {
        let room = self.store.room_by_code(code).await?;
        let player = self.store.player_by_client(&room.id, client_id).await?;
        let player = self
            .store
            .submit_drawing(&room.id, &player.id, drawing_url)
            .await?;
        tracing::info!(room = %room.code, player = %player.id, "Drawing submitted");

        self.check_completion(&room.id).await?;
        Ok(player)
    }

    /// Re-derive "everyone is done" from a fresh read and advance if so.
    pub async fn check_completion(&self, room_id: &str) -> Result<(), RoomsError> {
        let (room, players) = self.store.snapshot(room_id).await?;
        if let Some(transition) = coordinator::completion_transition(room.phase, &players) {
            match self.store.apply_transition(room_id, &transition).await {
                Ok(updated) => {
                    tracing::info!(room = %updated.code, "All players done, comparing");
                }
                // Another submission's check won the race; nothing to do.
                Err(StoreError::PhaseConflict { .. }) => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Explicit leave: delete the caller's player row.
    pub async fn leave(&self, code: &str, client_id: &str) -> Result<(), RoomsError> {
        let room = self.store.room_by_code(code).await?;
        let player = self.store.player_by_client(&room.id, client_id).await?;
        self.store.remove_player(&room.id, &player.id).await?;
        tracing::info!(room = %room.code, player = %player.id, "Player left");

        // A departure during draw can be the last missing submission.
        self.check_completion(&room.id).await
    }

    pub async fn delete_room(&self, room_id: &str) -> Result<(), RoomsError> {
        self.store.delete_room(room_id).await?;
        tracing::info!(room = %room_id, "Room deleted");
        Ok(())
    }

    /// Resolve the caller's room and verify hostship.
    async fn host_room(
        &self,
        code: &str,
        client_id: &str,
        action: &'static str,
    ) -> Result<Room, RoomsError> {
        let room = self.store.room_by_code(code).await?;
        let player = self.store.player_by_client(&room.id, client_id).await?;
        if room.host_id.as_deref() != Some(player.id.as_str()) {
            return Err(RoomsError::NotHost(action));
        }
        Ok(room)
    }

    /// Detached `memorize → draw` countdown for the round just started.
    fn spawn_memorize_countdown(&self, room: &Room) {
        let store = Arc::clone(&self.store);
        let room_id = room.id.clone();
        let code = room.code.clone();
        let round = room.round;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(MEMORIZE_SECS as u64)).await;
            let transition = coordinator::memorize_elapsed();
            match store
                .apply_timed_transition(&room_id, round, &transition)
                .await
            {
                Ok(Some(_)) => {
                    tracing::info!(room = %code, "Memorize countdown elapsed, drawing begins");
                }
                // Stale countdown or the phase already moved on.
                Ok(None) | Err(StoreError::PhaseConflict { .. }) => {}
                // Room deleted while the countdown slept.
                Err(_) => {}
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinsketch_core::room::RoomPhase;

    fn new_coordinator() -> RoomCoordinator {
        RoomCoordinator::new(Arc::new(RoomStore::new()))
    }

    #[tokio::test]
    async fn first_joiner_becomes_host_second_does_not() {
        let coord = new_coordinator();
        let room = coord.create_room().await;

        let alice = coord.join(&room.code, "client-alice", Some("Alice")).await.unwrap();
        assert!(alice.is_host);
        assert_eq!(alice.room.host_id.as_deref(), Some(alice.player.id.as_str()));

        let bob = coord.join(&room.code, "client-bob", Some("Bob")).await.unwrap();
        assert!(!bob.is_host);
        assert_eq!(bob.room.host_id, alice.room.host_id);
    }

    #[tokio::test]
    async fn blank_names_fall_back_to_default() {
        let coord = new_coordinator();
        let room = coord.create_room().await;
        let joined = coord.join(&room.code, "client-x", Some("   ")).await.unwrap();
        assert_eq!(joined.player.name, DEFAULT_PLAYER_NAME);
        let joined = coord.join(&room.code, "client-y", None).await.unwrap();
        assert_eq!(joined.player.name, DEFAULT_PLAYER_NAME);
    }

    #[tokio::test]
    async fn join_against_unknown_code_is_not_found() {
        let coord = new_coordinator();
        let err = coord.join("ZZZZZZ", "client-x", Some("Ghost")).await.unwrap_err();
        assert_eq!(err, RoomsError::Store(StoreError::RoomNotFound));
    }

    #[tokio::test]
    async fn only_the_host_may_start() {
        let coord = new_coordinator();
        let room = coord.create_room().await;
        coord.join(&room.code, "client-alice", Some("Alice")).await.unwrap();
        coord.join(&room.code, "client-bob", Some("Bob")).await.unwrap();

        let err = coord.start_round(&room.code, "client-bob", None).await.unwrap_err();
        assert!(matches!(err, RoomsError::NotHost(_)));

        let started = coord.start_round(&room.code, "client-alice", None).await.unwrap();
        assert_eq!(started.phase, RoomPhase::Memorize);
        assert!(started.coin.is_some());
    }

    #[tokio::test]
    async fn full_round_alice_and_bob() {
        let coord = new_coordinator();
        let room = coord.create_room().await;

        let alice = coord.join(&room.code, "client-alice", Some("Alice")).await.unwrap();
        let bob = coord.join(&room.code, "client-bob", Some("Bob")).await.unwrap();
        assert!(alice.is_host);
        assert!(!bob.is_host);

        // Host starts: memorize, with a coin drawn from the catalog.
        let started = coord.start_round(&room.code, "client-alice", None).await.unwrap();
        assert_eq!(started.phase, RoomPhase::Memorize);
        assert!(started.coin.is_some());

        // Countdown elapses (driven directly here instead of sleeping).
        coord
            .store
            .apply_timed_transition(&started.id, started.round, &coordinator::memorize_elapsed())
            .await
            .unwrap()
            .unwrap();

        // Alice submits; Bob hasn't, so the room stays in draw.
        let alice_row = coord
            .record_submission(&room.code, "client-alice", "/drawings/alice.png")
            .await
            .unwrap();
        assert!(alice_row.done);
        let (room_now, _) = coord.store.snapshot(&started.id).await.unwrap();
        assert_eq!(room_now.phase, RoomPhase::Draw);

        // Bob submits; everyone is done, so compare follows automatically.
        coord
            .record_submission(&room.code, "client-bob", "/drawings/bob.png")
            .await
            .unwrap();
        let (room_now, players_now) = coord.store.snapshot(&started.id).await.unwrap();
        assert_eq!(room_now.phase, RoomPhase::Compare);
        assert!(players_now.iter().all(|p| p.done));

        // Next round: players reset, fresh coin, back in memorize.
        let next = coord.next_round(&room.code, "client-alice", None).await.unwrap();
        assert_eq!(next.phase, RoomPhase::Memorize);
        assert!(next.coin.is_some());
        let (_, players_next) = coord.store.snapshot(&started.id).await.unwrap();
        for p in &players_next {
            assert!(!p.done);
            assert!(p.drawing_url.is_none());
        }
        assert!(next.round > started.round);
    }

    #[tokio::test]
    async fn next_round_requires_compare_phase() {
        let coord = new_coordinator();
        let room = coord.create_room().await;
        coord.join(&room.code, "client-alice", Some("Alice")).await.unwrap();

        let err = coord.next_round(&room.code, "client-alice", None).await.unwrap_err();
        assert!(matches!(err, RoomsError::Transition(_)));
    }

    #[tokio::test]
    async fn last_player_leaving_during_draw_completes_the_room() {
        let coord = new_coordinator();
        let room = coord.create_room().await;
        coord.join(&room.code, "client-alice", Some("Alice")).await.unwrap();
        coord.join(&room.code, "client-bob", Some("Bob")).await.unwrap();

        let started = coord.start_round(&room.code, "client-alice", None).await.unwrap();
        coord
            .store
            .apply_timed_transition(&started.id, started.round, &coordinator::memorize_elapsed())
            .await
            .unwrap()
            .unwrap();

        coord
            .record_submission(&room.code, "client-alice", "/drawings/alice.png")
            .await
            .unwrap();
        // Bob walks away instead of drawing; Alice shouldn't stall forever.
        coord.leave(&room.code, "client-bob").await.unwrap();

        let (room_now, _) = coord.store.snapshot(&started.id).await.unwrap();
        assert_eq!(room_now.phase, RoomPhase::Compare);
    }
}
