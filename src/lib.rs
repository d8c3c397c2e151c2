//! Stream state machine, flow control and priority tree for an HTTP/2
//! endpoint, per RFC 7540.
//!
//! This crate covers the stream-level protocol engine only: the finite
//! state machine over `{idle, reserved(local/remote), open,
//! half-closed(local/remote), closed}`, per-stream and connection-level
//! flow-control windows, the priority dependency tree, and push-promise
//! bookkeeping. The byte-level framing codec, HPACK table management,
//! connection setup (preface/SETTINGS negotiation) and transport are the
//! concern of the surrounding connection; this crate only defines the
//! narrow façade (`connection::Connection`) it needs from one.
//!
//! The entry point is [`stream::Stream`], a handle onto one multiplexed
//! stream of a [`connection::Connection`]. [`connection::DefaultConnection`]
//! is a reference in-memory façade implementation suitable for tests and
//! for embedders that do not need a different stream-registry strategy.

pub mod connection;
pub mod error;
pub mod frame;
pub mod priority;
pub mod stream;
pub mod types;
pub mod window;

pub use connection::{Connection, ConnectionSettings, DefaultConnection};
pub use error::{Error, ErrorCode, Result};
pub use priority::Priority;
pub use stream::{Stream, StreamState};
pub use types::{FieldList, StreamId};
pub use window::Window;
