//! WebSocket subscription surface.
//!
//! Each connection follows this lifecycle:
//!
//! 1. Client sends `Subscribe { room_code }`.
//! 2. On success it receives a full `Snapshot`, then a stream of row-change
//!    notifications carrying new row state.
//! 3. A subscriber that lags behind the change stream is resynced with a
//!    fresh snapshot instead of replayed history.
//! 4. `RoomDeleted` ends the stream.
//!
//! Subscribers are read-only: all writes go through the HTTP API, so there
//! is nothing to route in the other direction besides `Ping`.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use coinsketch_core::protocol::{ClientMessage, ServerMessage, normalize_room_code};

use crate::store::{RoomEvent, RoomStore};

/// Drive a single subscriber connection.
pub async fn handle_socket(socket: WebSocket, store: Arc<RoomStore>) {
    let (mut sink, mut stream) = socket.split();

    // ── Wait for a Subscribe before anything flows ───────────────────────
    let (room, players, mut events) = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => {
                let msg: ClientMessage = match serde_json::from_str(&text) {
                    Ok(m) => m,
                    Err(e) => {
                        let err = ServerMessage::Error {
                            message: format!("Invalid message: {e}"),
                        };
                        if !send_one(&mut sink, &err).await {
                            return;
                        }
                        continue;
                    }
                };
                match msg {
                    ClientMessage::Subscribe { room_code } => {
                        let code = normalize_room_code(&room_code);
                        match store.subscribe(&code).await {
                            Ok(sub) => break sub,
                            Err(e) => {
                                let err = ServerMessage::Error {
                                    message: e.to_string(),
                                };
                                if !send_one(&mut sink, &err).await {
                                    return;
                                }
                            }
                        }
                    }
                    ClientMessage::Ping => {
                        if !send_one(&mut sink, &ServerMessage::Pong).await {
                            return;
                        }
                    }
                }
            }
            Some(Ok(Message::Close(_))) | None => return,
            _ => continue,
        }
    };

    let room_id = room.id.clone();
    let code = room.code.clone();
    tracing::info!(room = %code, "Subscriber attached");

    if !send_one(&mut sink, &ServerMessage::Snapshot { room, players }).await {
        return;
    }

    // ── Fan out change events until either side goes away ────────────────
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(event) => {
                    let deleted = matches!(event, RoomEvent::Deleted);
                    if !send_one(&mut sink, &notification(event)).await {
                        break;
                    }
                    if deleted {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(room = %code, skipped, "Subscriber lagged, resyncing");
                    match store.snapshot(&room_id).await {
                        Ok((room, players)) => {
                            if !send_one(&mut sink, &ServerMessage::Snapshot { room, players })
                                .await
                            {
                                break;
                            }
                        }
                        // Room vanished while we lagged.
                        Err(_) => {
                            let _ = send_one(&mut sink, &ServerMessage::RoomDeleted).await;
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::Ping) => {
                            if !send_one(&mut sink, &ServerMessage::Pong).await {
                                break;
                            }
                        }
                        Ok(ClientMessage::Subscribe { .. }) => {
                            let err = ServerMessage::Error {
                                message: "Already subscribed".to_string(),
                            };
                            if !send_one(&mut sink, &err).await {
                                break;
                            }
                        }
                        Err(_) => {}
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                _ => {}
            },
        }
    }

    tracing::info!(room = %code, "Subscriber detached");
}

/// Map a store event onto its wire notification.
fn notification(event: RoomEvent) -> ServerMessage {
    match event {
        RoomEvent::Room(room) => ServerMessage::RoomUpdated { room },
        RoomEvent::Player(player) => ServerMessage::PlayerUpdated { player },
        RoomEvent::PlayerRemoved { player_id } => ServerMessage::PlayerRemoved { player_id },
        RoomEvent::Deleted => ServerMessage::RoomDeleted,
    }
}

/// Send a single message, reporting whether the socket is still usable.
async fn send_one(sink: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sink.send(Message::Text(json.into())).await.is_ok(),
        Err(_) => true,
    }
}
