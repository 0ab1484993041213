//! Phase transition rules for a room.
//!
//! Nothing in here touches HTTP, sockets, or the store. Every rule produces
//! a [`Transition`], a validated write intent that the store applies as a
//! single compare-and-swap on the room's current phase, so the whole state
//! machine can be unit-tested without I/O.
//!
//! Legal transitions:
//!
//! | From     | To       | Trigger                        |
//! |----------|----------|--------------------------------|
//! | waiting  | memorize | host starts a round            |
//! | memorize | draw     | memorize countdown elapses     |
//! | draw     | compare  | every player has submitted     |
//! | compare  | memorize | host starts the next round     |
//! | compare  | waiting  | host returns everyone to lobby |

use thiserror::Error;

use crate::room::{Coin, Player, RoomPhase};

/// Seconds the target coin stays on screen before drawing starts.
pub const MEMORIZE_SECS: u32 = 10;

/// Seconds players get to draw before their client auto-submits.
pub const DRAW_SECS: u32 = 60;

/// Fixed duration of a timed phase, if it has one.
///
/// Clients render their countdowns from this; the lobby and compare screens
/// sit open-ended until a host action.
pub fn phase_duration(phase: RoomPhase) -> Option<u32> {
    match phase {
        RoomPhase::Memorize => Some(MEMORIZE_SECS),
        RoomPhase::Draw => Some(DRAW_SECS),
        RoomPhase::Waiting | RoomPhase::Compare => None,
    }
}

/// A host-initiated intent against the room's phase.
#[derive(Debug, Clone, PartialEq)]
pub enum HostAction {
    /// Leave the lobby and put the round's coin on screen.
    StartRound { coin: Coin },
    /// Start another round from the compare screen.
    NextRound { coin: Coin },
    /// Return everyone to the lobby.
    BackToLobby,
}

impl HostAction {
    /// Short description for error messages.
    pub fn label(&self) -> &'static str {
        match self {
            HostAction::StartRound { .. } => "start a round",
            HostAction::NextRound { .. } => "start the next round",
            HostAction::BackToLobby => "return to the lobby",
        }
    }
}

/// A validated phase write, applied by the store as one atomic update.
///
/// `expect` is the compare-and-swap guard: the write only lands while the
/// room is still in that phase. Everything else in the struct is applied in
/// the same critical section, so a round reset can never half-complete.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub expect: RoomPhase,
    pub to: RoomPhase,
    /// New coin assignment when the transition starts a round.
    pub coin: Option<Coin>,
    /// Clear the room's coin (returning to the lobby).
    pub clear_coin: bool,
    /// Reset every player's `done`/`drawing_url` in the same write.
    pub reset_players: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("cannot {action} while the room is in the {phase} phase")]
    IllegalPhase {
        action: &'static str,
        phase: RoomPhase,
    },
}

/// Validate a host action against the room's current phase.
///
/// Starting a round (from the lobby or from compare) assigns the coin in the
/// same write that moves the phase, and a next-round/lobby transition resets
/// all players in that write too — there is no window in which the room is
/// in `memorize` without a coin, or players carry stale `done` flags.
pub fn host_transition(
    phase: RoomPhase,
    action: HostAction,
) -> Result<Transition, TransitionError> {
    match (phase, action) {
        (RoomPhase::Waiting, HostAction::StartRound { coin }) => Ok(Transition {
            expect: RoomPhase::Waiting,
            to: RoomPhase::Memorize,
            coin: Some(coin),
            clear_coin: false,
            reset_players: false,
        }),
        (RoomPhase::Compare, HostAction::NextRound { coin }) => Ok(Transition {
            expect: RoomPhase::Compare,
            to: RoomPhase::Memorize,
            coin: Some(coin),
            clear_coin: false,
            reset_players: true,
        }),
        (RoomPhase::Compare, HostAction::BackToLobby) => Ok(Transition {
            expect: RoomPhase::Compare,
            to: RoomPhase::Waiting,
            coin: None,
            clear_coin: true,
            reset_players: true,
        }),
        (phase, action) => Err(TransitionError::IllegalPhase {
            action: action.label(),
            phase,
        }),
    }
}

/// The timed `memorize → draw` transition.
///
/// The driver tags the countdown task with the room's round counter; the
/// store drops the write if the counter moved on, so a countdown from an
/// earlier round can never advance a later one.
pub fn memorize_elapsed() -> Transition {
    Transition {
        expect: RoomPhase::Memorize,
        to: RoomPhase::Draw,
        coin: None,
        clear_coin: false,
        reset_players: false,
    }
}

/// Conjunction of the players' completion flags.
///
/// An empty room is never "all done" — vacuous truth would advance a room
/// nobody is drawing in.
pub fn all_done(players: &[Player]) -> bool {
    !players.is_empty() && players.iter().all(|p| p.done)
}

/// The automatic `draw → compare` transition.
///
/// Re-derived from scratch on every player-row change (no incremental
/// counter); linear in player count, which is fine at party scale.
pub fn completion_transition(phase: RoomPhase, players: &[Player]) -> Option<Transition> {
    if phase == RoomPhase::Draw && all_done(players) {
        Some(Transition {
            expect: RoomPhase::Draw,
            to: RoomPhase::Compare,
            coin: None,
            clear_coin: false,
            reset_players: false,
        })
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::Player;

    fn coin() -> Coin {
        Coin {
            name: "US Quarter".to_string(),
            image_ref: "/coins/us-quarter.png".to_string(),
        }
    }

    fn player(done: bool) -> Player {
        let mut p = Player::new("room", "client", "Tester");
        p.done = done;
        p
    }

    #[test]
    fn start_round_only_from_lobby() {
        let t = host_transition(RoomPhase::Waiting, HostAction::StartRound { coin: coin() })
            .unwrap();
        assert_eq!(t.expect, RoomPhase::Waiting);
        assert_eq!(t.to, RoomPhase::Memorize);
        assert!(t.coin.is_some());
        assert!(!t.reset_players);

        for phase in [RoomPhase::Memorize, RoomPhase::Draw, RoomPhase::Compare] {
            assert!(host_transition(phase, HostAction::StartRound { coin: coin() }).is_err());
        }
    }

    #[test]
    fn next_round_resets_and_reassigns() {
        let t =
            host_transition(RoomPhase::Compare, HostAction::NextRound { coin: coin() }).unwrap();
        assert_eq!(t.to, RoomPhase::Memorize);
        assert!(t.reset_players);
        assert!(t.coin.is_some());
        assert!(!t.clear_coin);

        for phase in [RoomPhase::Waiting, RoomPhase::Memorize, RoomPhase::Draw] {
            assert!(host_transition(phase, HostAction::NextRound { coin: coin() }).is_err());
        }
    }

    #[test]
    fn back_to_lobby_clears_coin() {
        let t = host_transition(RoomPhase::Compare, HostAction::BackToLobby).unwrap();
        assert_eq!(t.to, RoomPhase::Waiting);
        assert!(t.clear_coin);
        assert!(t.reset_players);
        assert!(t.coin.is_none());

        for phase in [RoomPhase::Waiting, RoomPhase::Memorize, RoomPhase::Draw] {
            assert!(host_transition(phase, HostAction::BackToLobby).is_err());
        }
    }

    #[test]
    fn memorize_countdown_leads_to_draw() {
        let t = memorize_elapsed();
        assert_eq!(t.expect, RoomPhase::Memorize);
        assert_eq!(t.to, RoomPhase::Draw);
        assert!(!t.reset_players);
    }

    #[test]
    fn timed_phases_have_fixed_durations() {
        assert_eq!(phase_duration(RoomPhase::Memorize), Some(MEMORIZE_SECS));
        assert_eq!(phase_duration(RoomPhase::Draw), Some(DRAW_SECS));
        assert_eq!(phase_duration(RoomPhase::Waiting), None);
        assert_eq!(phase_duration(RoomPhase::Compare), None);
    }

    #[test]
    fn empty_room_is_never_all_done() {
        assert!(!all_done(&[]));
    }

    #[test]
    fn all_done_is_a_strict_conjunction() {
        assert!(!all_done(&[player(true), player(false)]));
        assert!(all_done(&[player(true), player(true)]));
        assert!(all_done(&[player(true)]));
    }

    #[test]
    fn completion_only_fires_in_draw_phase() {
        let everyone = [player(true), player(true)];
        let t = completion_transition(RoomPhase::Draw, &everyone).unwrap();
        assert_eq!(t.to, RoomPhase::Compare);

        for phase in [RoomPhase::Waiting, RoomPhase::Memorize, RoomPhase::Compare] {
            assert!(completion_transition(phase, &everyone).is_none());
        }
        assert!(completion_transition(RoomPhase::Draw, &[]).is_none());
        assert!(completion_transition(RoomPhase::Draw, &[player(true), player(false)]).is_none());
    }
}
