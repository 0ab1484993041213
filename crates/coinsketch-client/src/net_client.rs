//! Channel-based WebSocket client for the subscription surface.
//!
//! Spawns background reader/writer tasks over the socket and exposes
//! channels, so a frontend can poll for notifications without owning the
//! stream directly. The incoming channel closing signals disconnection.

use futures_util::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use coinsketch_core::protocol::{ClientMessage, ServerMessage};

#[derive(Debug, Error)]
pub enum NetError {
    #[error("connection failed: {0}")]
    Connect(String),
}

/// Try to deserialize a raw text frame as a [`ServerMessage`].
///
/// Returns `None` for empty/whitespace-only input or unrecognised JSON.
pub fn parse_server_line(line: &str) -> Option<ServerMessage> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str::<ServerMessage>(trimmed).ok()
}

/// A channel-based subscription client.
///
/// - [`recv`](NetClient::recv) / [`try_recv`](NetClient::try_recv) — pull
///   parsed server notifications.
/// - [`send`](NetClient::send) — non-blocking enqueue of a
///   [`ClientMessage`] (subscribe, ping).
pub struct NetClient {
    incoming: mpsc::UnboundedReceiver<ServerMessage>,
    outgoing: mpsc::UnboundedSender<ClientMessage>,
}

impl NetClient {
    /// Connect to the server's `/ws` endpoint and spawn the I/O tasks.
    ///
    /// No subscription is sent automatically — the caller sends
    /// `Subscribe` afterwards.
    pub async fn connect(url: &str) -> Result<Self, NetError> {
        let (stream, _response) = connect_async(url)
            .await
            .map_err(|e| NetError::Connect(e.to_string()))?;
        let (mut sink, mut ws) = stream.split();

        let (msg_tx, msg_rx) = mpsc::unbounded_channel();
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<ClientMessage>();

        // Reader: parse incoming frames into ServerMessages.
        tokio::spawn(async move {
            while let Some(frame) = ws.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        if let Some(msg) = parse_server_line(&text)
                            && msg_tx.send(msg).is_err()
                        {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) | Err(_) => break,
                    // Skip binary, ping, pong frames.
                    Ok(_) => continue,
                }
            }
            // Dropping msg_tx closes `incoming`, signalling disconnect.
        });

        // Writer: serialize queued commands onto the socket.
        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                let json = match serde_json::to_string(&cmd) {
                    Ok(j) => j,
                    Err(_) => continue,
                };
                if sink.send(Message::text(json)).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            incoming: msg_rx,
            outgoing: cmd_tx,
        })
    }

    /// Enqueue a [`ClientMessage`] for transmission.
    pub fn send(&self, msg: ClientMessage) {
        // Ignore send failure — the writer task exits on disconnect and
        // the reader channel will report it.
        let _ = self.outgoing.send(msg);
    }

    /// Wait for the next server notification. `None` means disconnected.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        self.incoming.recv().await
    }

    /// Non-blocking poll for a server notification.
    pub fn try_recv(&mut self) -> Result<ServerMessage, mpsc::error::TryRecvError> {
        self.incoming.try_recv()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_notifications_and_skips_noise() {
        assert!(parse_server_line("").is_none());
        assert!(parse_server_line("   ").is_none());
        assert!(parse_server_line("not json").is_none());
        assert!(parse_server_line(r#"{"type":"Unknown"}"#).is_none());

        let msg = parse_server_line(r#"{"type":"Pong"}"#).unwrap();
        assert!(matches!(msg, ServerMessage::Pong));

        let msg = parse_server_line(r#"{"type":"PlayerRemoved","player_id":"p1"}"#).unwrap();
        match msg {
            ServerMessage::PlayerRemoved { player_id } => assert_eq!(player_id, "p1"),
            other => panic!("unexpected message: {other:?}"),
        }
    }
}
