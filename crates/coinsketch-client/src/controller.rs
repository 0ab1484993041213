//! Owns the subscription stream and the reduced room view.
//!
//! Frontends:
//! 1. call [`RoomClient::connect`] with the room code,
//! 2. poll [`recv`](RoomClient::recv) / [`try_recv`](RoomClient::try_recv)
//!    to fold notifications into [`RoomClient::view`],
//! 3. bracket drawing submission with
//!    [`begin_submission`](RoomClient::begin_submission) /
//!    [`finish_submission`](RoomClient::finish_submission).

use coinsketch_core::protocol::ClientMessage;
use tokio::sync::mpsc::error::TryRecvError;

use crate::net_client::{NetClient, NetError};
use crate::room_view::{RoomView, StateChanged};

/// Outcome of processing a single notification.
#[derive(Debug)]
pub enum PollResult {
    /// A notification was applied; the flags describe what changed.
    Updated(StateChanged),
    /// The server closed the connection.
    Disconnected,
    /// No notification was available.
    Empty,
}

/// At-most-once-per-round submission guard.
///
/// A drawing submission is an upload plus a row write; this keeps one client
/// from racing itself into two concurrent submissions. The store itself
/// stays consistent under a duplicate, so the guard only has to stop the
/// local race.
#[derive(Debug, Default)]
pub struct SubmissionGuard {
    in_flight: bool,
}

impl SubmissionGuard {
    /// Claim the slot. Refused while a submission is in flight or once the
    /// player's row is already done for this round.
    pub fn begin(&mut self, row_done: bool) -> bool {
        if self.in_flight || row_done {
            return false;
        }
        self.in_flight = true;
        true
    }

    /// Release the slot (success or failure).
    pub fn finish(&mut self) {
        self.in_flight = false;
    }
}

/// Subscription client bound to one room.
pub struct RoomClient {
    net: NetClient,
    pub view: RoomView,
    guard: SubmissionGuard,
}

impl RoomClient {
    /// Connect to the server's `/ws` endpoint and subscribe to a room.
    ///
    /// The first notification to arrive will be the snapshot.
    pub async fn connect(ws_url: &str, room_code: &str, client_id: &str) -> Result<Self, NetError> {
        let net = NetClient::connect(ws_url).await?;
        net.send(ClientMessage::Subscribe {
            room_code: room_code.to_string(),
        });
        Ok(Self {
            net,
            view: RoomView::new(client_id),
            guard: SubmissionGuard::default(),
        })
    }

    /// Wait for and apply the next notification.
    pub async fn recv(&mut self) -> PollResult {
        match self.net.recv().await {
            Some(msg) => PollResult::Updated(self.view.apply_server_message(&msg)),
            None => {
                self.view.connected = false;
                PollResult::Disconnected
            }
        }
    }

    /// Apply one pending notification, if any.
    pub fn try_recv(&mut self) -> PollResult {
        match self.net.try_recv() {
            Ok(msg) => PollResult::Updated(self.view.apply_server_message(&msg)),
            Err(TryRecvError::Empty) => PollResult::Empty,
            Err(TryRecvError::Disconnected) => {
                self.view.connected = false;
                PollResult::Disconnected
            }
        }
    }

    pub fn ping(&self) {
        self.net.send(ClientMessage::Ping);
    }

    /// Claim the submission slot for this round.
    pub fn begin_submission(&mut self) -> bool {
        let row_done = self.view.our_player().map(|p| p.done).unwrap_or(false);
        self.guard.begin(row_done)
    }

    /// Release the submission slot.
    pub fn finish_submission(&mut self) {
        self.guard.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coinsketch_core::protocol::ServerMessage;
    use coinsketch_core::room::{Player, Room};

    #[test]
    fn guard_allows_one_submission_at_a_time() {
        let mut guard = SubmissionGuard::default();
        assert!(guard.begin(false));
        // In flight: refused.
        assert!(!guard.begin(false));
        guard.finish();
        // Released and still not done: allowed again (e.g. retry after a
        // failed upload).
        assert!(guard.begin(false));
    }

    #[test]
    fn guard_refuses_once_row_is_done() {
        let mut guard = SubmissionGuard::default();
        assert!(!guard.begin(true));
    }

    #[test]
    fn guard_composes_with_the_view() {
        let room = Room::new("AB12CD");
        let mut me = Player::new(&room.id, "client-me", "Alice");

        let mut view = RoomView::new("client-me");
        view.apply_server_message(&ServerMessage::Snapshot {
            room,
            players: vec![me.clone()],
        });

        let mut guard = SubmissionGuard::default();
        let row_done = view.our_player().map(|p| p.done).unwrap_or(false);
        assert!(guard.begin(row_done));
        guard.finish();

        // The server confirms our submission; the next round-trip through
        // the guard refuses a resubmission.
        me.done = true;
        view.apply_server_message(&ServerMessage::PlayerUpdated { player: me });
        let row_done = view.our_player().map(|p| p.done).unwrap_or(false);
        assert!(!guard.begin(row_done));
    }
}
