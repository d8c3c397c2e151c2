//! The connection façade consumed by `Stream`: stream registry, stream-id
//! allocation, HPACK encode/decode, frame I/O, and connection-level flow
//! control.
//!
//! `Connection` is the trait a `Stream<C>` is generic over; `DefaultConnection`
//! is a reference in-memory implementation: next-id bookkeeping keyed on
//! `is_server`, one hashmap of stream state doubling as the priority
//! registry. A second, independent parent/child map isn't kept alongside it:
//! `priority::reassign` already recovers the dependency forest on demand from
//! whichever structure implements `PriorityRegistry`, so there is nothing for
//! a second map to keep in sync.
//!
//! This crate does not implement a wire codec or transport: `write_frame`
//! appends to an in-memory outbox rather than writing bytes to a socket, and
//! HPACK is delegated wholesale to the `hpack` crate. An embedder wiring this
//! crate to real sockets and a real SETTINGS exchange replaces
//! `DefaultConnection`, not `Stream`.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use hpack::{Decoder as HpackDecoder, Encoder as HpackEncoder};
use log::{debug, trace};

use crate::error::{Error, ErrorCode};
use crate::frame::{OutboundFrame, WindowUpdateFrame};
use crate::priority::{Priority, PriorityRegistry};
use crate::stream::{Stream, StreamInner};
use crate::types::{
    FieldList, StreamId, DEFAULT_INITIAL_WINDOW_SIZE, DEFAULT_MAX_FRAME_SIZE, DEFAULT_WEIGHT,
};
use crate::window::Window;

/// Connection-level configuration a `Stream` reads from its façade.
/// Deliberately thin: real SETTINGS negotiation is out
/// of scope, but the values it would carry are still a typed, documented
/// struct rather than ad-hoc arguments threaded through every call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub initial_window_size: i32,
    pub max_frame_size: u32,
}

impl Default for ConnectionSettings {
    fn default() -> ConnectionSettings {
        ConnectionSettings {
            initial_window_size: DEFAULT_INITIAL_WINDOW_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

/// The capabilities a `Stream` consumes from its owning connection.
/// A `Connection` is also a `PriorityRegistry`: priority
/// reassignment (Section 4.5) operates directly against whatever structure
/// tracks stream priorities, without a separate lookup layer.
pub trait Connection: PriorityRegistry {
    /// Allocates the next stream id this endpoint may use to initiate a
    /// stream (odd for a client, even for a server or a push).
    fn next_stream_id(&mut self) -> StreamId;

    fn register_stream(&mut self, id: StreamId, inner: Rc<RefCell<StreamInner>>);
    fn stream_inner(&self, id: StreamId) -> Option<Rc<RefCell<StreamInner>>>;

    fn local_initial_window_size(&self) -> i32;
    fn remote_initial_window_size(&self) -> i32;

    /// The largest frame this endpoint may emit, per the peer's advertised
    /// `SETTINGS_MAX_FRAME_SIZE`.
    fn maximum_frame_size(&self) -> u32;
    /// Headroom still available under `maximum_frame_size` for the frame
    /// currently being assembled. `DefaultConnection` does not track
    /// concurrent in-flight assembly, so this equals `maximum_frame_size`.
    fn available_frame_size(&self) -> u32;

    fn encode_headers(&mut self, fields: &FieldList) -> Result<Vec<u8>, Error>;
    fn decode_headers(&mut self, block: &[u8]) -> Result<FieldList, Error>;

    fn write_frame(&mut self, frame: OutboundFrame);

    /// Charges `len` octets against the connection-level remote window
    /// (this endpoint's send-side credit).
    fn consume_remote_window(&mut self, len: u32);
    /// Charges `len` octets against the connection-level local window
    /// (this endpoint's receive-side credit).
    fn consume_local_window(&mut self, len: u32);
    /// Applies a WINDOW_UPDATE increment to the connection-level remote
    /// window (Section 4.1). Fails with `FlowControlOverflow`, leaving the
    /// window unchanged, if it would exceed 2^31-1 (Testable Property 5).
    fn expand_connection_remote_window(&mut self, increment: u32) -> Result<(), Error>;

    /// Allocates and registers a new stream for a locally-initiated push,
    /// parented on `promising`. Returns the promised stream's id.
    fn create_push_promise_stream(&mut self, promising: StreamId) -> StreamId;
    /// Registers a stream the peer just promised via PUSH_PROMISE, parented
    /// on `promising`.
    fn accept_push_promise_stream(&mut self, promised_id: StreamId, promising: StreamId);

    /// Invoked exactly once per stream when it transitions to `closed`.
    fn on_stream_closed(&mut self, id: StreamId, error_code: Option<ErrorCode>);
}

/// A reference in-memory `Connection`: one `HashMap` registry, a single
/// outbox standing in for the transport, and the two connection-level
/// windows. Used by this crate's own integration tests and suitable for an
/// embedder that does not need a different registry strategy.
pub struct DefaultConnection {
    is_server: bool,
    local_settings: ConnectionSettings,
    remote_settings: ConnectionSettings,
    next_local_id: StreamId,
    streams: HashMap<StreamId, Rc<RefCell<StreamInner>>>,
    local_window: Window,
    remote_window: Window,
    hpack_encoder: HpackEncoder<'static>,
    hpack_decoder: HpackDecoder<'static>,
    outbox: Vec<OutboundFrame>,
    closed: Vec<(StreamId, Option<ErrorCode>)>,
}

impl DefaultConnection {
    pub fn new(
        is_server: bool,
        local_settings: ConnectionSettings,
        remote_settings: ConnectionSettings,
    ) -> DefaultConnection {
        DefaultConnection {
            is_server,
            local_settings,
            remote_settings,
            next_local_id: if is_server { 2 } else { 1 },
            streams: HashMap::new(),
            // The connection-level window is not subject to
            // SETTINGS_INITIAL_WINDOW_SIZE (RFC 7540 Section 6.9.2); it
            // always starts at the protocol default.
            local_window: Window::new(DEFAULT_INITIAL_WINDOW_SIZE),
            remote_window: Window::new(DEFAULT_INITIAL_WINDOW_SIZE),
            hpack_encoder: HpackEncoder::new(),
            hpack_decoder: HpackDecoder::new(),
            outbox: Vec::new(),
            closed: Vec::new(),
        }
    }

    /// Every frame handed to `write_frame`, in emission order. Exposed for
    /// tests standing in for a real transport.
    pub fn outbox(&self) -> &[OutboundFrame] {
        &self.outbox
    }

    /// Every `(stream_id, error_code)` pair `on_stream_closed` has observed,
    /// in order. Exposed for tests (Testable Property 8: the hook fires
    /// exactly once per stream).
    pub fn closed_streams(&self) -> &[(StreamId, Option<ErrorCode>)] {
        &self.closed
    }

    pub fn local_window(&self) -> Window {
        self.local_window
    }

    pub fn remote_window(&self) -> Window {
        self.remote_window
    }

    pub fn is_server(&self) -> bool {
        self.is_server
    }
}

impl PriorityRegistry for DefaultConnection {
    fn priority_of(&self, id: StreamId) -> Option<Priority> {
        self.streams.get(&id).map(|inner| inner.borrow().priority())
    }

    fn set_priority(&mut self, id: StreamId, priority: Priority) {
        if let Some(inner) = self.streams.get(&id) {
            inner.borrow_mut().set_priority(priority);
        }
    }

    fn stream_ids(&self) -> Vec<StreamId> {
        self.streams.keys().copied().collect()
    }
}

impl Connection for DefaultConnection {
    fn next_stream_id(&mut self) -> StreamId {
        let id = self.next_local_id;
        self.next_local_id += 2;
        id
    }

    fn register_stream(&mut self, id: StreamId, inner: Rc<RefCell<StreamInner>>) {
        self.streams.insert(id, inner);
    }

    fn stream_inner(&self, id: StreamId) -> Option<Rc<RefCell<StreamInner>>> {
        self.streams.get(&id).cloned()
    }

    fn local_initial_window_size(&self) -> i32 {
        self.local_settings.initial_window_size
    }

    fn remote_initial_window_size(&self) -> i32 {
        self.remote_settings.initial_window_size
    }

    fn maximum_frame_size(&self) -> u32 {
        self.remote_settings.max_frame_size
    }

    fn available_frame_size(&self) -> u32 {
        self.remote_settings.max_frame_size
    }

    fn encode_headers(&mut self, fields: &FieldList) -> Result<Vec<u8>, Error> {
        let borrowed: Vec<(&[u8], &[u8])> = fields
            .iter()
            .map(|(name, value)| (name.as_bytes(), value.as_bytes()))
            .collect();
        let block = self.hpack_encoder.encode(borrowed);
        trace!("encoded {} header field(s) into {} octets", fields.len(), block.len());
        Ok(block)
    }

    fn decode_headers(&mut self, block: &[u8]) -> Result<FieldList, Error> {
        let decoded = self
            .hpack_decoder
            .decode(block)
            .map_err(|e| Error::CompressionError(format!("{:?}", e)))?;
        Ok(decoded
            .into_iter()
            .map(|(name, value)| {
                (
                    String::from_utf8_lossy(&name).into_owned(),
                    String::from_utf8_lossy(&value).into_owned(),
                )
            })
            .collect())
    }

    fn write_frame(&mut self, frame: OutboundFrame) {
        trace!("stream {}: wrote {:?}", frame.stream_id(), frame);
        self.outbox.push(frame);
    }

    fn consume_remote_window(&mut self, len: u32) {
        self.remote_window.consume(len);
    }

    fn consume_local_window(&mut self, len: u32) {
        self.local_window.consume(len);
    }

    fn expand_connection_remote_window(&mut self, increment: u32) -> Result<(), Error> {
        self.remote_window.expand(increment)?;
        debug!("connection: remote window expanded by {} to {}", increment, self.remote_window.available());
        Ok(())
    }

    fn create_push_promise_stream(&mut self, promising: StreamId) -> StreamId {
        let id = self.next_stream_id();
        let inner = Rc::new(RefCell::new(StreamInner::new(
            id,
            self.local_initial_window_size(),
            self.remote_initial_window_size(),
        )));
        self.register_stream(id, inner);
        self.set_priority(
            id,
            Priority {
                stream_dependency: promising,
                exclusive: false,
                weight: DEFAULT_WEIGHT,
            },
        );
        debug!("stream {}: created as push promise from stream {}", id, promising);
        id
    }

    fn accept_push_promise_stream(&mut self, promised_id: StreamId, promising: StreamId) {
        let inner = Rc::new(RefCell::new(StreamInner::new(
            promised_id,
            self.local_initial_window_size(),
            self.remote_initial_window_size(),
        )));
        self.register_stream(promised_id, inner);
        self.set_priority(
            promised_id,
            Priority {
                stream_dependency: promising,
                exclusive: false,
                weight: DEFAULT_WEIGHT,
            },
        );
        debug!(
            "stream {}: accepted as push promise from stream {}",
            promised_id, promising
        );
    }

    fn on_stream_closed(&mut self, id: StreamId, error_code: Option<ErrorCode>) {
        debug!("stream {}: close hook fired ({:?})", id, error_code);
        self.closed.push((id, error_code));
    }
}

/// Routes an inbound WINDOW_UPDATE to the connection-level remote window
/// (stream id 0) or to the named stream's remote window, the way a
/// dispatch loop would route any other inbound frame to its target
/// (Section 2, "Data flow"; Section 4.1).
pub fn dispatch_window_update<C: Connection>(
    connection: &Rc<RefCell<C>>,
    frame: WindowUpdateFrame,
) -> Result<(), Error> {
    if frame.is_connection_level() {
        connection.borrow_mut().expand_connection_remote_window(frame.increment)
    } else {
        Stream::attach(connection.clone(), frame.stream_id).receive_window_update(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_allocates_odd_ids() {
        let mut conn = DefaultConnection::new(false, ConnectionSettings::default(), ConnectionSettings::default());
        assert_eq!(conn.next_stream_id(), 1);
        assert_eq!(conn.next_stream_id(), 3);
    }

    #[test]
    fn server_allocates_even_ids() {
        let mut conn = DefaultConnection::new(true, ConnectionSettings::default(), ConnectionSettings::default());
        assert_eq!(conn.next_stream_id(), 2);
        assert_eq!(conn.next_stream_id(), 4);
    }

    #[test]
    fn headers_round_trip_through_hpack() {
        let mut conn = DefaultConnection::new(false, ConnectionSettings::default(), ConnectionSettings::default());
        let fields: FieldList = vec![
            (":method".to_string(), "GET".to_string()),
            (":path".to_string(), "/".to_string()),
        ];
        let block = conn.encode_headers(&fields).unwrap();
        let decoded = conn.decode_headers(&block).unwrap();
        assert_eq!(decoded, fields);
    }

    #[test]
    fn connection_window_defaults_independent_of_settings() {
        let mut settings = ConnectionSettings::default();
        settings.initial_window_size = 10;
        let conn = DefaultConnection::new(false, settings, settings);
        assert_eq!(conn.local_window().available(), DEFAULT_INITIAL_WINDOW_SIZE);
        assert_eq!(conn.remote_window().available(), DEFAULT_INITIAL_WINDOW_SIZE);
    }

    #[test]
    fn consume_remote_window_charges_connection_level_credit() {
        let mut conn = DefaultConnection::new(false, ConnectionSettings::default(), ConnectionSettings::default());
        let before = conn.remote_window().available();
        conn.consume_remote_window(100);
        assert_eq!(conn.remote_window().available(), before - 100);
    }

    #[test]
    fn dispatch_window_update_refills_connection_level_window() {
        let conn = Rc::new(RefCell::new(DefaultConnection::new(
            false,
            ConnectionSettings::default(),
            ConnectionSettings::default(),
        )));
        conn.borrow_mut().consume_remote_window(1000);
        let frame = WindowUpdateFrame::new(0, 1000);
        dispatch_window_update(&conn, frame).unwrap();
        assert_eq!(
            conn.borrow().remote_window().available(),
            DEFAULT_INITIAL_WINDOW_SIZE
        );
    }

    #[test]
    fn dispatch_window_update_refills_named_stream_window() {
        let conn = Rc::new(RefCell::new(DefaultConnection::new(
            false,
            ConnectionSettings::default(),
            ConnectionSettings::default(),
        )));
        let stream = Stream::open(conn.clone());
        stream.send_headers(None, &Vec::new(), false).unwrap();
        stream.send_data(vec![0u8; 500], false).unwrap();
        let before = stream.remote_window().unwrap().available();

        let frame = WindowUpdateFrame::new(stream.id(), 200);
        dispatch_window_update(&conn, frame).unwrap();

        assert_eq!(stream.remote_window().unwrap().available(), before + 200);
    }

    #[test]
    fn expand_connection_remote_window_overflow_leaves_window_unchanged() {
        let mut conn = DefaultConnection::new(false, ConnectionSettings::default(), ConnectionSettings::default());
        let before = conn.remote_window().available();
        let err = conn.expand_connection_remote_window(u32::MAX).unwrap_err();
        assert_eq!(err.error_code(), ErrorCode::FlowControlError);
        assert_eq!(conn.remote_window().available(), before);
    }
}
