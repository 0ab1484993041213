//! Wire protocol: the realtime subscription surface and HTTP API payloads.
//!
//! Change notifications always carry the new row state, so a subscriber can
//! re-render without a read-back.

use serde::{Deserialize, Serialize};

use crate::room::{Coin, Player, Room, ROOM_CODE_LEN};

/// Messages sent from client to server over the subscription socket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    /// Subscribe to a room's change stream.
    Subscribe { room_code: String },

    /// Ping to check connection
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// Full state, sent right after subscribing and on resync.
    Snapshot { room: Room, players: Vec<Player> },

    /// The room row changed (phase, coin, host).
    RoomUpdated { room: Room },

    /// A player row was inserted or updated.
    PlayerUpdated { player: Player },

    /// A player row was deleted.
    PlayerRemoved { player_id: String },

    /// The room itself was deleted; the stream ends after this.
    RoomDeleted,

    /// Pong response to ping
    Pong,

    /// Error message
    Error { message: String },
}

// ---------------------------------------------------------------------------
// HTTP API payloads
// ---------------------------------------------------------------------------

/// `POST /api/rooms` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRoomResponse {
    pub room: Room,
}

/// `POST /api/rooms/join` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomRequest {
    pub room_code: String,
    pub client_id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// `POST /api/rooms/join` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRoomResponse {
    pub room: Room,
    pub player: Player,
    pub is_host: bool,
}

/// Body for host-only phase actions; the caller proves hostship by the
/// client identifier behind its player row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostRequest {
    pub client_id: String,
}

/// Body for host-only round starts. The host may supply the round's coin
/// (picked on the catalog surface); absent one, the server draws it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartRoundRequest {
    pub client_id: String,
    #[serde(default)]
    pub coin: Option<Coin>,
}

/// `POST /api/rooms/{code}/leave` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub client_id: String,
}

/// `POST /api/delete-room` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRoomRequest {
    pub room_id: String,
}

/// Response for uploads and drawing submissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    /// Retrieval URL for the stored image.
    pub url: String,
    /// Storage path, for debugging and cleanup.
    pub path: String,
}

// ---------------------------------------------------------------------------
// Room code validation
// ---------------------------------------------------------------------------

/// Uppercase and trim a user-typed room code.
pub fn normalize_room_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Validate a room code.
///
/// Codes are exactly six uppercase alphanumeric characters.
pub fn validate_room_code(code: &str) -> Result<(), String> {
    if code.len() != ROOM_CODE_LEN {
        return Err(format!("Room code must be {ROOM_CODE_LEN} characters"));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Err("Room code must be uppercase alphanumeric".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::generate_room_code;

    #[test]
    fn valid_room_codes() {
        assert!(validate_room_code("AB12CD").is_ok());
        assert!(validate_room_code("ZZZZZZ").is_ok());
        assert!(validate_room_code("123456").is_ok());
        assert!(validate_room_code(&generate_room_code()).is_ok());
    }

    #[test]
    fn invalid_room_codes() {
        assert!(validate_room_code("").is_err());
        assert!(validate_room_code("AB12C").is_err()); // 5 chars
        assert!(validate_room_code("AB12CDE").is_err()); // 7 chars
        assert!(validate_room_code("ab12cd").is_err()); // lowercase
        assert!(validate_room_code("AB 2CD").is_err());
        assert!(validate_room_code("AB-2CD").is_err());
    }

    #[test]
    fn normalize_uppercases_and_trims() {
        assert_eq!(normalize_room_code("  ab12cd "), "AB12CD");
        assert!(validate_room_code(&normalize_room_code("ab12cd")).is_ok());
    }

    #[test]
    fn messages_tag_by_variant_name() {
        let json = serde_json::to_value(&ServerMessage::RoomDeleted).unwrap();
        assert_eq!(json["type"], "RoomDeleted");

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"Subscribe","room_code":"AB12CD"}"#).unwrap();
        match msg {
            ClientMessage::Subscribe { room_code } => assert_eq!(room_code, "AB12CD"),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
