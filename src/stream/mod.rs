//! The stream module: the finite state machine (`state`) and the handle
//! that drives it against a connection (`stream`).

pub mod state;
pub mod stream;

pub use state::{transition, Event, IllegalTransition, StreamState};
pub use stream::{Stream, StreamInner};
