//! Room store: the two shared tables plus per-room change streams.
//!
//! Every client in a room contends on the same room row; phase writes go
//! through [`RoomStore::apply_transition`], a compare-and-swap on the
//! expected current phase, so an illegal or stale transition is rejected by
//! the store instead of being forbidden by convention. A single write lock
//! spans both tables, which makes the round reset (player rows + room row)
//! one atomic transaction.
//!
//! Each room carries a `broadcast` sender; every committed write emits a
//! [`RoomEvent`] carrying the new row state, which the subscription surface
//! fans out to connected clients.

use std::collections::HashMap;

use coinsketch_core::coordinator::Transition;
use coinsketch_core::room::{Player, Room, RoomPhase, generate_room_code};
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};

/// Capacity of each room's change stream. A subscriber that falls behind
/// gets resynced with a fresh snapshot rather than replayed history.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// A row-change notification. Carries the new row state so subscribers can
/// re-render without a read-back.
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// The room row changed.
    Room(Room),
    /// A player row was inserted or updated.
    Player(Player),
    /// A player row was deleted.
    PlayerRemoved { player_id: String },
    /// The room was deleted; the stream closes after this.
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("room not found")]
    RoomNotFound,

    #[error("player not found")]
    PlayerNotFound,

    /// The compare-and-swap guard failed: someone else already moved the
    /// phase. The room is left untouched.
    #[error("room is in the {actual} phase, expected {expected}")]
    PhaseConflict {
        expected: RoomPhase,
        actual: RoomPhase,
    },
}

struct RoomEntry {
    room: Room,
    /// Player rows in join order.
    players: Vec<Player>,
    events: broadcast::Sender<RoomEvent>,
}

impl RoomEntry {
    fn new(room: Room) -> Self {
        Self {
            room,
            players: Vec::new(),
            events: broadcast::channel(EVENT_CHANNEL_CAPACITY).0,
        }
    }

    fn emit(&self, event: RoomEvent) {
        // Ignore send failure — the room may have no subscribers yet.
        let _ = self.events.send(event);
    }
}

#[derive(Default)]
struct Tables {
    rooms: HashMap<String, RoomEntry>,
    /// Share-code index into `rooms`.
    by_code: HashMap<String, String>,
}

impl Tables {
    fn entry(&self, room_id: &str) -> Result<&RoomEntry, StoreError> {
        self.rooms.get(room_id).ok_or(StoreError::RoomNotFound)
    }

    fn entry_mut(&mut self, room_id: &str) -> Result<&mut RoomEntry, StoreError> {
        self.rooms.get_mut(room_id).ok_or(StoreError::RoomNotFound)
    }
}

/// Thread-safe store over the room and player tables.
pub struct RoomStore {
    tables: RwLock<Tables>,
}

impl Default for RoomStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RoomStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    /// Create a room with a fresh unique share code, in the lobby phase.
    pub async fn create_room(&self) -> Room {
        let mut tables = self.tables.write().await;
        let code = loop {
            let code = generate_room_code();
            if !tables.by_code.contains_key(&code) {
                break code;
            }
        };
        let room = Room::new(code.clone());
        tables.by_code.insert(code, room.id.clone());
        tables.rooms.insert(room.id.clone(), RoomEntry::new(room.clone()));
        room
    }

    /// Look up a room row by its share code.
    pub async fn room_by_code(&self, code: &str) -> Result<Room, StoreError> {
        let tables = self.tables.read().await;
        let room_id = tables.by_code.get(code).ok_or(StoreError::RoomNotFound)?;
        Ok(tables.entry(room_id)?.room.clone())
    }

    /// Current room row plus all of its player rows.
    pub async fn snapshot(&self, room_id: &str) -> Result<(Room, Vec<Player>), StoreError> {
        let tables = self.tables.read().await;
        let entry = tables.entry(room_id)?;
        Ok((entry.room.clone(), entry.players.clone()))
    }

    /// Subscribe to a room's change stream by share code.
    ///
    /// The snapshot and the receiver are taken under the same lock, so no
    /// event between the two can be missed.
    pub async fn subscribe(
        &self,
        code: &str,
    ) -> Result<(Room, Vec<Player>, broadcast::Receiver<RoomEvent>), StoreError> {
        let tables = self.tables.read().await;
        let room_id = tables.by_code.get(code).ok_or(StoreError::RoomNotFound)?;
        let entry = tables.entry(room_id)?;
        Ok((
            entry.room.clone(),
            entry.players.clone(),
            entry.events.subscribe(),
        ))
    }

    /// Insert or update the player row keyed by `(room_id, client_id)`.
    ///
    /// A reconnecting client updates its existing row's name; a new client
    /// gets a fresh row. Joining is therefore idempotent under refresh.
    pub async fn upsert_player(
        &self,
        room_id: &str,
        client_id: &str,
        name: &str,
    ) -> Result<Player, StoreError> {
        let mut tables = self.tables.write().await;
        let entry = tables.entry_mut(room_id)?;
        let player = match entry.players.iter_mut().find(|p| p.client_id == client_id) {
            Some(existing) => {
                existing.name = name.to_string();
                existing.clone()
            }
            None => {
                let player = Player::new(room_id, client_id, name);
                entry.players.push(player.clone());
                player
            }
        };
        entry.emit(RoomEvent::Player(player.clone()));
        Ok(player)
    }

    /// Best-effort host claim: set `host_id` only if it is still unset.
    ///
    /// Under concurrent first joins exactly one claim lands; every loser
    /// gets `Ok(false)`, which is the expected outcome, not an error.
    pub async fn claim_host(&self, room_id: &str, player_id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let entry = tables.entry_mut(room_id)?;
        if entry.room.host_id.is_some() {
            return Ok(false);
        }
        if !entry.players.iter().any(|p| p.id == player_id) {
            return Err(StoreError::PlayerNotFound);
        }
        entry.room.host_id = Some(player_id.to_string());
        let room = entry.room.clone();
        entry.emit(RoomEvent::Room(room));
        Ok(true)
    }

    /// Apply a validated phase transition as one atomic write.
    ///
    /// Fails with [`StoreError::PhaseConflict`] if the room has already left
    /// `transition.expect`; on success the coin assignment, player resets,
    /// and phase change all land together and the round counter is bumped.
    pub async fn apply_transition(
        &self,
        room_id: &str,
        transition: &Transition,
    ) -> Result<Room, StoreError> {
        self.apply(room_id, transition, None)
            .await
            // Without a round guard the write either lands or conflicts.
            .map(|room| room.expect("unguarded transition cannot be stale"))
    }

    /// Apply a transition only if the room is still on `expected_round`.
    ///
    /// Countdown tasks capture the round counter at spawn; a stale task
    /// resolves to `Ok(None)` and quietly goes away.
    pub async fn apply_timed_transition(
        &self,
        room_id: &str,
        expected_round: u64,
        transition: &Transition,
    ) -> Result<Option<Room>, StoreError> {
        self.apply(room_id, transition, Some(expected_round)).await
    }

    async fn apply(
        &self,
        room_id: &str,
        transition: &Transition,
        expected_round: Option<u64>,
    ) -> Result<Option<Room>, StoreError> {
        let mut tables = self.tables.write().await;
        let entry = tables.entry_mut(room_id)?;

        if let Some(round) = expected_round
            && entry.room.round != round
        {
            return Ok(None);
        }
        if entry.room.phase != transition.expect {
            return Err(StoreError::PhaseConflict {
                expected: transition.expect,
                actual: entry.room.phase,
            });
        }

        if transition.reset_players {
            for player in &mut entry.players {
                player.done = false;
                player.drawing_url = None;
            }
            for player in entry.players.clone() {
                entry.emit(RoomEvent::Player(player));
            }
        }

        if let Some(coin) = &transition.coin {
            entry.room.coin = Some(coin.clone());
        } else if transition.clear_coin {
            entry.room.coin = None;
        }
        entry.room.phase = transition.to;
        entry.room.round += 1;

        let room = entry.room.clone();
        entry.emit(RoomEvent::Room(room.clone()));
        Ok(Some(room))
    }

    /// Record a submitted drawing: set `drawing_url` and `done` together.
    pub async fn submit_drawing(
        &self,
        room_id: &str,
        player_id: &str,
        drawing_url: &str,
    ) -> Result<Player, StoreError> {
        let mut tables = self.tables.write().await;
        let entry = tables.entry_mut(room_id)?;
        let player = entry
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or(StoreError::PlayerNotFound)?;
        player.done = true;
        player.drawing_url = Some(drawing_url.to_string());
        let player = player.clone();
        entry.emit(RoomEvent::Player(player.clone()));
        Ok(player)
    }

    /// Find a room's player row by the client identifier behind it.
    pub async fn player_by_client(
        &self,
        room_id: &str,
        client_id: &str,
    ) -> Result<Player, StoreError> {
        let tables = self.tables.read().await;
        let entry = tables.entry(room_id)?;
        entry
            .players
            .iter()
            .find(|p| p.client_id == client_id)
            .cloned()
            .ok_or(StoreError::PlayerNotFound)
    }

    /// Delete a player row (explicit leave).
    pub async fn remove_player(
        &self,
        room_id: &str,
        player_id: &str,
    ) -> Result<Player, StoreError> {
        let mut tables = self.tables.write().await;
        let entry = tables.entry_mut(room_id)?;
        let index = entry
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(StoreError::PlayerNotFound)?;
        let player = entry.players.remove(index);
        entry.emit(RoomEvent::PlayerRemoved {
            player_id: player.id.clone(),
        });
        Ok(player)
    }

    /// Delete a room and, by ownership, all of its players.
    pub async fn delete_room(&self, room_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let entry = tables.rooms.remove(room_id).ok_or(StoreError::RoomNotFound)?;
        tables.by_code.remove(&entry.room.code);
        entry.emit(RoomEvent::Deleted);
        Ok(())
    }
}
