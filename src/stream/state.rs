//! The stream finite state machine (RFC 7540 Section 5.1).
//!
//! All legality is decided by one function, `transition`, matching on
//! `(state, event)`: illegal combinations collapse to a single catch-all arm
//! per state rather than being enumerated individually, so adding a new
//! event only ever requires touching the states it is actually legal in.

use std::fmt;

/// One of the seven states a stream can be in. `Idle` is the only initial
/// state; `Closed` is terminal and absorbing (Section 4.2, invariant 3).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StreamState {
    Idle,
    ReservedLocal,
    ReservedRemote,
    Open,
    HalfClosedLocal,
    HalfClosedRemote,
    Closed,
}

impl StreamState {
    pub fn name(self) -> &'static str {
        match self {
            StreamState::Idle => "idle",
            StreamState::ReservedLocal => "reserved_local",
            StreamState::ReservedRemote => "reserved_remote",
            StreamState::Open => "open",
            StreamState::HalfClosedLocal => "half_closed_local",
            StreamState::HalfClosedRemote => "half_closed_remote",
            StreamState::Closed => "closed",
        }
    }

    /// A stream is active iff its state is neither `idle` nor `closed`
    /// (Section 3, invariants).
    pub fn is_active(self) -> bool {
        !matches!(self, StreamState::Idle | StreamState::Closed)
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The eight events that drive the state machine, plus the `end_stream` flag
/// HEADERS/DATA carry implicitly (Section 4.2).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    SendHeaders { end_stream: bool },
    SendData { end_stream: bool },
    SendResetStream,
    ReceiveHeaders { end_stream: bool },
    ReceiveData { end_stream: bool },
    ReceiveResetStream,
    ReserveLocal,
    ReserveRemote,
}

impl Event {
    pub fn name(self) -> &'static str {
        match self {
            Event::SendHeaders { .. } => "send_headers",
            Event::SendData { .. } => "send_data",
            Event::SendResetStream => "send_reset_stream",
            Event::ReceiveHeaders { .. } => "receive_headers",
            Event::ReceiveData { .. } => "receive_data",
            Event::ReceiveResetStream => "receive_reset_stream",
            Event::ReserveLocal => "reserved_local!",
            Event::ReserveRemote => "reserved_remote!",
        }
    }
}

/// An event that is not legal from the current state. Carries enough context
/// for the caller to build a `crate::error::Error::ProtocolError`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IllegalTransition {
    pub state: &'static str,
    pub event: &'static str,
}

/// Applies `event` to `state` per the transition table in RFC 7540 Section 5.1.
///
/// Returns the new state on success. On an illegal combination, returns
/// `IllegalTransition` and leaves the caller's state untouched (callers must
/// not commit `state` themselves until this returns `Ok`).
pub fn transition(state: StreamState, event: Event) -> Result<StreamState, IllegalTransition> {
    use Event::*;
    use StreamState::*;

    let illegal = || IllegalTransition {
        state: state.name(),
        event: event.name(),
    };

    match (state, event) {
        // idle
        (Idle, SendHeaders { end_stream }) => {
            Ok(if end_stream { HalfClosedLocal } else { Open })
        }
        (Idle, ReceiveHeaders { end_stream }) => {
            Ok(if end_stream { HalfClosedRemote } else { Open })
        }
        (Idle, ReserveLocal) => Ok(ReservedLocal),
        (Idle, ReserveRemote) => Ok(ReservedRemote),

        // reserved (local): this endpoint promised the stream
        (ReservedLocal, SendHeaders { .. }) => Ok(HalfClosedRemote),
        (ReservedLocal, SendResetStream) => Ok(Closed),
        (ReservedLocal, ReceiveResetStream) => Ok(Closed),

        // reserved (remote): the peer promised the stream
        (ReservedRemote, ReceiveHeaders { .. }) => Ok(HalfClosedLocal),
        (ReservedRemote, SendResetStream) => Ok(Closed),
        (ReservedRemote, ReceiveResetStream) => Ok(Closed),

        // open
        (Open, SendHeaders { end_stream }) | (Open, SendData { end_stream }) => {
            Ok(if end_stream { HalfClosedLocal } else { Open })
        }
        (Open, ReceiveHeaders { end_stream }) | (Open, ReceiveData { end_stream }) => {
            Ok(if end_stream { HalfClosedRemote } else { Open })
        }
        (Open, SendResetStream) | (Open, ReceiveResetStream) => Ok(Closed),

        // half closed (local): this side is done sending, but may still emit
        // HEADERS without a state change unless the peer's frames carry
        // end_stream.
        (HalfClosedLocal, SendHeaders { .. }) => Ok(HalfClosedLocal),
        (HalfClosedLocal, SendResetStream) | (HalfClosedLocal, ReceiveResetStream) => Ok(Closed),
        (HalfClosedLocal, ReceiveHeaders { end_stream })
        | (HalfClosedLocal, ReceiveData { end_stream }) => {
            Ok(if end_stream { Closed } else { HalfClosedLocal })
        }

        // half closed (remote): the peer is done sending.
        (HalfClosedRemote, SendHeaders { end_stream })
        | (HalfClosedRemote, SendData { end_stream }) => {
            Ok(if end_stream { Closed } else { HalfClosedRemote })
        }
        (HalfClosedRemote, SendResetStream) | (HalfClosedRemote, ReceiveResetStream) => Ok(Closed),

        // closed is absorbing; every event fails.
        (Closed, _) => Err(illegal()),

        // every other (state, event) pair is a protocol violation.
        _ => Err(illegal()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_send_headers_without_end_stream_opens() {
        let next = transition(StreamState::Idle, Event::SendHeaders { end_stream: false }).unwrap();
        assert_eq!(next, StreamState::Open);
    }

    #[test]
    fn idle_send_headers_with_end_stream_half_closes_local() {
        let next = transition(StreamState::Idle, Event::SendHeaders { end_stream: true }).unwrap();
        assert_eq!(next, StreamState::HalfClosedLocal);
    }

    #[test]
    fn idle_send_data_is_illegal() {
        let err = transition(StreamState::Idle, Event::SendData { end_stream: false }).unwrap_err();
        assert_eq!(err.state, "idle");
        assert_eq!(err.event, "send_data");
    }

    #[test]
    fn idle_reset_stream_is_illegal_in_both_directions() {
        assert!(transition(StreamState::Idle, Event::SendResetStream).is_err());
        assert!(transition(StreamState::Idle, Event::ReceiveResetStream).is_err());
    }

    #[test]
    fn closed_absorbs_every_event() {
        let events = [
            Event::SendHeaders { end_stream: false },
            Event::SendData { end_stream: false },
            Event::SendResetStream,
            Event::ReceiveHeaders { end_stream: false },
            Event::ReceiveData { end_stream: false },
            Event::ReceiveResetStream,
            Event::ReserveLocal,
            Event::ReserveRemote,
        ];
        for event in events {
            assert!(transition(StreamState::Closed, event).is_err());
        }
    }

    #[test]
    fn open_round_trips_to_half_closed_on_both_sides() {
        let local = transition(StreamState::Open, Event::SendData { end_stream: true }).unwrap();
        assert_eq!(local, StreamState::HalfClosedLocal);

        let remote =
            transition(StreamState::Open, Event::ReceiveData { end_stream: true }).unwrap();
        assert_eq!(remote, StreamState::HalfClosedRemote);
    }

    #[test]
    fn half_closed_remote_closes_on_end_stream_either_direction() {
        let next = transition(
            StreamState::HalfClosedRemote,
            Event::SendData { end_stream: true },
        )
        .unwrap();
        assert_eq!(next, StreamState::Closed);
    }

    #[test]
    fn half_closed_remote_rejects_further_receives() {
        assert!(transition(
            StreamState::HalfClosedRemote,
            Event::ReceiveHeaders { end_stream: false }
        )
        .is_err());
    }

    #[test]
    fn reservation_only_legal_from_idle() {
        assert!(transition(StreamState::Idle, Event::ReserveLocal).is_ok());
        assert!(transition(StreamState::Open, Event::ReserveLocal).is_err());
        assert!(transition(StreamState::Closed, Event::ReserveRemote).is_err());
    }
}
