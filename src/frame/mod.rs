//! Wire-format frame types for the five in-scope frames (HEADERS, DATA,
//! PRIORITY, RST_STREAM, PUSH_PROMISE) plus WINDOW_UPDATE and CONTINUATION,
//! which the connection needs for its own bookkeeping and header-block
//! splitting. SETTINGS, PING and GOAWAY are connection-setup/keepalive
//! concerns outside this crate's scope and have no wire type here.

pub mod continuation;
pub mod data;
pub mod frames;
pub mod headers;
pub mod priority_frame;
pub mod push_promise;
pub mod rst_stream;
pub mod window_update;

pub use continuation::{ContinuationFlags, ContinuationFrame};
pub use data::{DataFlags, DataFrame};
pub use frames::{
    pack_header, parse_padded_payload, unpack_header, Flag, Frame, FrameHeader,
    FrameHeaderBuffer, FrameType, RawFrame,
};
pub use headers::{HeadersFlags, HeadersFrame, StreamDependency};
pub use priority_frame::{PriorityFlags, PriorityFrame};
pub use push_promise::{PushPromiseFlags, PushPromiseFrame};
pub use rst_stream::{RstStreamFlags, RstStreamFrame};
pub use window_update::{WindowUpdateFlags, WindowUpdateFrame};

use crate::types::StreamId;

/// Any frame this crate might hand the connection to write. `write_frame`
/// takes this rather than being generic over `Frame` so the façade trait
/// stays object-safe.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundFrame {
    Headers(HeadersFrame),
    Data(DataFrame),
    Priority(PriorityFrame),
    RstStream(RstStreamFrame),
    PushPromise(PushPromiseFrame),
    WindowUpdate(WindowUpdateFrame),
    Continuation(ContinuationFrame),
}

impl OutboundFrame {
    pub fn stream_id(&self) -> StreamId {
        match self {
            OutboundFrame::Headers(f) => f.stream_id(),
            OutboundFrame::Data(f) => f.stream_id(),
            OutboundFrame::Priority(f) => f.stream_id(),
            OutboundFrame::RstStream(f) => f.stream_id(),
            OutboundFrame::PushPromise(f) => f.stream_id(),
            OutboundFrame::WindowUpdate(f) => f.stream_id(),
            OutboundFrame::Continuation(f) => f.stream_id(),
        }
    }

    pub fn serialize(&self) -> Vec<u8> {
        match self {
            OutboundFrame::Headers(f) => f.serialize(),
            OutboundFrame::Data(f) => f.serialize(),
            OutboundFrame::Priority(f) => f.serialize(),
            OutboundFrame::RstStream(f) => f.serialize(),
            OutboundFrame::PushPromise(f) => f.serialize(),
            OutboundFrame::WindowUpdate(f) => f.serialize(),
            OutboundFrame::Continuation(f) => f.serialize(),
        }
    }
}
