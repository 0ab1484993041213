//! Room and player rows — the shared state every client renders from.
//!
//! These mirror the two persisted tables. A room owns its players and its
//! `phase` field is the single source of truth for which view a client
//! shows. Player rows are keyed by `(room_id, client_id)` so a reconnecting
//! client re-uses its existing row instead of creating a duplicate.

use std::fmt;

use rand::RngExt;
use serde::{Deserialize, Serialize};

/// Display name used when a joining client supplies none.
pub const DEFAULT_PLAYER_NAME: &str = "Player";

/// Length of a human-shareable room code.
pub const ROOM_CODE_LEN: usize = 6;

/// The room's current stage in the round life cycle.
///
/// Serialized lowercase on the wire (`"waiting"`, `"memorize"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    /// Lobby: players gather, host may start a round.
    Waiting,
    /// The round's coin is on screen for everyone to memorize.
    Memorize,
    /// Players draw the coin from memory.
    Draw,
    /// All drawings are shown side by side.
    Compare,
}

impl RoomPhase {
    /// Lowercase wire/display name.
    pub fn label(self) -> &'static str {
        match self {
            RoomPhase::Waiting => "waiting",
            RoomPhase::Memorize => "memorize",
            RoomPhase::Draw => "draw",
            RoomPhase::Compare => "compare",
        }
    }
}

impl fmt::Display for RoomPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The round's target coin, stored on the room row while a round is live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub name: String,
    /// Path or URL of the coin image shown during memorize/compare.
    pub image_ref: String,
}

/// A shared game session, identified by a short share code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: String,
    /// 6-char uppercase alphanumeric share code, immutable after creation.
    pub code: String,
    pub phase: RoomPhase,
    /// Target coin for the current round; `None` in the lobby.
    pub coin: Option<Coin>,
    /// The player designated as host; claimed once by the first joiner.
    pub host_id: Option<String>,
    /// Bumped on every phase transition. Timer tasks capture it at spawn so
    /// a stale countdown from an earlier round can never fire.
    pub round: u64,
}

impl Room {
    /// Fresh room in the lobby phase.
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            code: code.into(),
            phase: RoomPhase::Waiting,
            coin: None,
            host_id: None,
            round: 0,
        }
    }
}

/// A participant's per-room record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Player {
    pub id: String,
    pub room_id: String,
    /// Stable per-client identifier — the upsert key within a room.
    pub client_id: String,
    pub name: String,
    /// Set once the player has submitted a drawing this round.
    pub done: bool,
    pub drawing_url: Option<String>,
}

impl Player {
    pub fn new(
        room_id: impl Into<String>,
        client_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_id(),
            room_id: room_id.into(),
            client_id: client_id.into(),
            name: name.into(),
            done: false,
            drawing_url: None,
        }
    }
}

/// Generate an opaque 32-hex-char row identifier.
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 16] = rng.random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Generate a 6-character uppercase alphanumeric room code.
pub fn generate_room_code() -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
    let mut rng = rand::rng();
    (0..ROOM_CODE_LEN)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_ids_are_hex_and_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn generated_codes_have_share_shape() {
        for _ in 0..50 {
            let code = generate_room_code();
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            );
        }
    }

    #[test]
    fn new_room_starts_in_lobby() {
        let room = Room::new("AB12CD");
        assert_eq!(room.phase, RoomPhase::Waiting);
        assert!(room.coin.is_none());
        assert!(room.host_id.is_none());
        assert_eq!(room.round, 0);
    }

    #[test]
    fn phase_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RoomPhase::Memorize).unwrap(),
            "\"memorize\""
        );
        let parsed: RoomPhase = serde_json::from_str("\"compare\"").unwrap();
        assert_eq!(parsed, RoomPhase::Compare);
    }
}
