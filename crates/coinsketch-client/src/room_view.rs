//! Client-side reduction of the room change stream.
//!
//! [`RoomView`] is a pure reducer over [`ServerMessage`]s: feed it the
//! subscription stream and it maintains the room row, the player list, and
//! the derived host flag. Frontends inspect the returned [`StateChanged`]
//! flags to decide what to re-render. Being a pure reducer makes the whole
//! view logic testable without a server.

use coinsketch_core::coordinator;
use coinsketch_core::protocol::ServerMessage;
use coinsketch_core::room::{Player, Room, RoomPhase};

/// Describes what changed after applying a notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateChanged {
    /// The room row changed (coin, host, round).
    pub room: bool,
    /// The player list changed.
    pub players: bool,
    /// The room's phase changed — switch views.
    pub phase: bool,
}

impl StateChanged {
    /// Returns `true` if any flag is set.
    pub fn any(self) -> bool {
        self.room || self.players || self.phase
    }
}

/// Everything the client tracks about the room it is in.
#[derive(Debug, Clone)]
pub struct RoomView {
    /// Our stable client identifier, used to find our own player row.
    pub client_id: String,
    /// The room row, once the snapshot has arrived.
    pub room: Option<Room>,
    /// All player rows, in join order.
    pub players: Vec<Player>,
    /// Set when the room was deleted out from under us.
    pub deleted: bool,
    /// Connection status.
    pub connected: bool,
    /// Last error message received, for display.
    pub last_error: Option<String>,
}

impl RoomView {
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            room: None,
            players: Vec::new(),
            deleted: false,
            connected: true,
            last_error: None,
        }
    }

    /// Current phase, if the snapshot has arrived.
    pub fn phase(&self) -> Option<RoomPhase> {
        self.room.as_ref().map(|r| r.phase)
    }

    /// Our own player row.
    pub fn our_player(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.client_id == self.client_id)
    }

    /// Whether our player row is the room's host.
    pub fn is_host(&self) -> bool {
        match (&self.room, self.our_player()) {
            (Some(room), Some(me)) => room.host_id.as_deref() == Some(me.id.as_str()),
            _ => false,
        }
    }

    /// Whether every player (and there is at least one) has submitted.
    pub fn everyone_done(&self) -> bool {
        coordinator::all_done(&self.players)
    }

    /// Fixed countdown length for the current phase, if it has one.
    pub fn phase_duration(&self) -> Option<u32> {
        self.phase().and_then(coordinator::phase_duration)
    }

    /// Apply a server notification, returning what changed.
    pub fn apply_server_message(&mut self, msg: &ServerMessage) -> StateChanged {
        let mut changed = StateChanged::default();

        match msg {
            ServerMessage::Snapshot { room, players } => {
                changed.phase = self.phase() != Some(room.phase);
                self.room = Some(room.clone());
                self.players = players.clone();
                changed.room = true;
                changed.players = true;
            }
            ServerMessage::RoomUpdated { room } => {
                changed.phase = self.phase() != Some(room.phase);
                self.room = Some(room.clone());
                changed.room = true;
            }
            ServerMessage::PlayerUpdated { player } => {
                match self.players.iter_mut().find(|p| p.id == player.id) {
                    Some(existing) => *existing = player.clone(),
                    None => self.players.push(player.clone()),
                }
                changed.players = true;
            }
            ServerMessage::PlayerRemoved { player_id } => {
                self.players.retain(|p| p.id != *player_id);
                changed.players = true;
            }
            ServerMessage::RoomDeleted => {
                self.deleted = true;
                self.room = None;
                self.players.clear();
                changed.room = true;
                changed.players = true;
            }
            ServerMessage::Error { message } => {
                self.last_error = Some(message.clone());
            }
            ServerMessage::Pong => {}
        }

        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinsketch_core::room::{Coin, Room};

    fn room(code: &str) -> Room {
        Room::new(code)
    }

    fn player(room: &Room, client_id: &str, name: &str) -> Player {
        Player::new(&room.id, client_id, name)
    }

    #[test]
    fn snapshot_establishes_the_view() {
        let mut view = RoomView::new("client-me");
        let r = room("AB12CD");
        let me = player(&r, "client-me", "Alice");

        let changed = view.apply_server_message(&ServerMessage::Snapshot {
            room: r.clone(),
            players: vec![me.clone()],
        });
        assert!(changed.room && changed.players && changed.phase);
        assert_eq!(view.phase(), Some(RoomPhase::Waiting));
        assert_eq!(view.our_player().unwrap().id, me.id);
    }

    #[test]
    fn host_flag_follows_the_room_row() {
        let mut view = RoomView::new("client-me");
        let mut r = room("AB12CD");
        let me = player(&r, "client-me", "Alice");

        view.apply_server_message(&ServerMessage::Snapshot {
            room: r.clone(),
            players: vec![me.clone()],
        });
        assert!(!view.is_host());

        r.host_id = Some(me.id.clone());
        let changed = view.apply_server_message(&ServerMessage::RoomUpdated { room: r });
        assert!(changed.room);
        assert!(!changed.phase);
        assert!(view.is_host());
    }

    #[test]
    fn phase_flag_fires_only_on_phase_changes() {
        let mut view = RoomView::new("client-me");
        let mut r = room("AB12CD");
        view.apply_server_message(&ServerMessage::Snapshot {
            room: r.clone(),
            players: vec![],
        });

        r.phase = RoomPhase::Memorize;
        r.coin = Some(Coin {
            name: "US Quarter".to_string(),
            image_ref: "/coins/us-quarter.png".to_string(),
        });
        let changed = view.apply_server_message(&ServerMessage::RoomUpdated { room: r.clone() });
        assert!(changed.phase);
        assert_eq!(view.phase_duration(), Some(10));

        // Same phase again: room flag only.
        let changed = view.apply_server_message(&ServerMessage::RoomUpdated { room: r });
        assert!(changed.room);
        assert!(!changed.phase);
    }

    #[test]
    fn player_updates_upsert_by_id() {
        let mut view = RoomView::new("client-me");
        let r = room("AB12CD");
        view.apply_server_message(&ServerMessage::Snapshot {
            room: r.clone(),
            players: vec![],
        });

        let mut bob = player(&r, "client-bob", "Bob");
        view.apply_server_message(&ServerMessage::PlayerUpdated {
            player: bob.clone(),
        });
        assert_eq!(view.players.len(), 1);

        bob.done = true;
        view.apply_server_message(&ServerMessage::PlayerUpdated {
            player: bob.clone(),
        });
        assert_eq!(view.players.len(), 1);
        assert!(view.players[0].done);

        view.apply_server_message(&ServerMessage::PlayerRemoved {
            player_id: bob.id.clone(),
        });
        assert!(view.players.is_empty());
        assert!(!view.everyone_done());
    }

    #[test]
    fn deletion_clears_the_view() {
        let mut view = RoomView::new("client-me");
        let r = room("AB12CD");
        let me = player(&r, "client-me", "Alice");
        view.apply_server_message(&ServerMessage::Snapshot {
            room: r,
            players: vec![me],
        });

        view.apply_server_message(&ServerMessage::RoomDeleted);
        assert!(view.deleted);
        assert!(view.room.is_none());
        assert!(view.players.is_empty());
    }
}
