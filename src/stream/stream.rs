//! The stream handle applications and the connection dispatch loop use to
//! drive one HTTP/2 stream: the public `send_*`/`receive_*` contract,
//! layered over the state machine in `state.rs`.

use std::cell::RefCell;
use std::rc::Rc;

use log::{debug, trace, warn};

use super::state::{self, Event, StreamState};
use crate::connection::Connection;
use crate::error::{Error, ErrorCode};
use crate::frame::{
    ContinuationFrame, DataFrame, Frame, HeadersFrame, OutboundFrame, PriorityFrame,
    PushPromiseFrame, RstStreamFrame, StreamDependency, WindowUpdateFrame,
};
use crate::priority::{self, Priority};
use crate::types::{FieldList, StreamId};
use crate::window::Window;

/// The mutable state owned by one stream: windows, priority, state, and the
/// last headers/data the application has observed. Held behind `Rc<RefCell<_>>`
/// so the connection's registry and every outstanding `Stream` handle share
/// one copy (Section 5.1).
#[derive(Debug)]
pub struct StreamInner {
    id: StreamId,
    state: StreamState,
    priority: Priority,
    local_window: Window,
    remote_window: Window,
    headers: Option<FieldList>,
    data: Option<Vec<u8>>,
    closed_once: bool,
}

impl StreamInner {
    pub fn new(id: StreamId, local_initial_window: i32, remote_initial_window: i32) -> StreamInner {
        StreamInner {
            id,
            state: StreamState::Idle,
            priority: Priority::default(),
            local_window: Window::new(local_initial_window),
            remote_window: Window::new(remote_initial_window),
            headers: None,
            data: None,
            closed_once: false,
        }
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn local_window(&self) -> Window {
        self.local_window
    }

    pub fn remote_window(&self) -> Window {
        self.remote_window
    }

    pub fn headers(&self) -> Option<&FieldList> {
        self.headers.as_ref()
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }

    /// Replaces this stream's priority record. Exposed so `Connection`
    /// implementations can satisfy `PriorityRegistry` without reaching past
    /// `StreamInner`'s otherwise-private fields.
    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Applies a WINDOW_UPDATE increment to this stream's send-side credit
    /// (Section 4.1: refill is additive and driven by WINDOW_UPDATE frames).
    /// Fails with `FlowControlOverflow` if the result would exceed 2^31-1,
    /// leaving the window unchanged (Testable Property 5).
    pub fn expand_remote_window(&mut self, increment: u32) -> Result<(), Error> {
        self.remote_window.expand(increment)
    }
}

/// A reference-counted handle onto one stream of `connection`. Cheap to
/// clone; every clone observes the same underlying `StreamInner`.
pub struct Stream<C: Connection> {
    id: StreamId,
    connection: Rc<RefCell<C>>,
}

impl<C: Connection> Clone for Stream<C> {
    fn clone(&self) -> Stream<C> {
        Stream {
            id: self.id,
            connection: self.connection.clone(),
        }
    }
}

impl<C: Connection> Stream<C> {
    /// Allocates a new, locally-initiated stream (`idle`) and registers it
    /// with `connection`.
    pub fn open(connection: Rc<RefCell<C>>) -> Stream<C> {
        let (id, local_initial, remote_initial) = {
            let mut conn = connection.borrow_mut();
            let id = conn.next_stream_id();
            (id, conn.local_initial_window_size(), conn.remote_initial_window_size())
        };
        let inner = Rc::new(RefCell::new(StreamInner::new(id, local_initial, remote_initial)));
        connection.borrow_mut().register_stream(id, inner);
        debug!("stream {}: opened (idle)", id);
        Stream { id, connection }
    }

    /// Wraps an existing registered stream id as a handle, without touching
    /// the registry. Used by the connection dispatch loop and by push
    /// promise bookkeeping.
    pub fn attach(connection: Rc<RefCell<C>>, id: StreamId) -> Stream<C> {
        Stream { id, connection }
    }

    pub fn id(&self) -> StreamId {
        self.id
    }

    fn inner(&self) -> Result<Rc<RefCell<StreamInner>>, Error> {
        self.connection
            .borrow()
            .stream_inner(self.id)
            .ok_or(Error::UnknownStream(self.id))
    }

    pub fn state(&self) -> Result<StreamState, Error> {
        Ok(self.inner()?.borrow().state())
    }

    pub fn priority(&self) -> Result<Priority, Error> {
        Ok(self.inner()?.borrow().priority())
    }

    pub fn headers(&self) -> Result<Option<FieldList>, Error> {
        Ok(self.inner()?.borrow().headers().cloned())
    }

    pub fn data(&self) -> Result<Option<Vec<u8>>, Error> {
        Ok(self.inner()?.borrow().data().map(|d| d.to_vec()))
    }

    pub fn local_window(&self) -> Result<Window, Error> {
        Ok(self.inner()?.borrow().local_window())
    }

    pub fn remote_window(&self) -> Result<Window, Error> {
        Ok(self.inner()?.borrow().remote_window())
    }

    /// Checks whether `event` is legal from the stream's current state,
    /// without committing it (Testable Property 2: an illegal event leaves
    /// state alone). Callers with other fallible work to do between
    /// validating and committing (e.g. a priority reassignment or an HPACK
    /// decode that can still fail) should call this, do that work, and only
    /// then call `commit_transition` — never `apply_transition`, which
    /// commits unconditionally once the event itself is legal.
    fn validate_transition(&self, event: Event) -> Result<StreamState, Error> {
        let inner = self.inner()?;
        let current = inner.borrow().state;
        match state::transition(current, event) {
            Ok(next) => Ok(next),
            Err(illegal) => {
                warn!(
                    "stream {}: rejected {} while {}",
                    self.id, illegal.event, illegal.state
                );
                // Section 7 distinguishes a frame arriving after the stream
                // is already closed from every other illegal (state, event)
                // combination; everything else stays a generic protocol
                // violation.
                let is_closed_receive = current == StreamState::Closed
                    && matches!(
                        event,
                        Event::ReceiveHeaders { .. }
                            | Event::ReceiveData { .. }
                            | Event::ReceiveResetStream
                    );
                if is_closed_receive {
                    return Err(Error::StreamClosed { stream_id: self.id });
                }
                Err(Error::ProtocolError {
                    stream_id: self.id,
                    state: illegal.state,
                    event: illegal.event,
                })
            }
        }
    }

    /// Commits a transition already validated by `validate_transition`.
    fn commit_transition(&self, event_name: &'static str, next: StreamState) -> Result<(), Error> {
        let inner = self.inner()?;
        let current = inner.borrow().state;
        inner.borrow_mut().state = next;
        trace!("stream {}: {} -> {} on {}", self.id, current, next, event_name);
        Ok(())
    }

    /// Validates and commits `event` in one step. Only safe to use when
    /// nothing else that can fail happens between checking legality and
    /// committing the new state — otherwise use `validate_transition` and
    /// `commit_transition` separately so a later failure never leaves a
    /// partial mutation behind.
    fn apply_transition(&self, event: Event) -> Result<StreamState, Error> {
        let next = self.validate_transition(event)?;
        self.commit_transition(event.name(), next)?;
        Ok(next)
    }

    /// Invokes the close hook exactly once (Testable Property 8), then
    /// notifies the connection.
    fn fire_close_hook(&self, error_code: Option<ErrorCode>) {
        let inner = match self.inner() {
            Ok(inner) => inner,
            Err(_) => return,
        };
        let already_closed = {
            let mut inner = inner.borrow_mut();
            let already_closed = inner.closed_once;
            inner.closed_once = true;
            already_closed
        };
        if already_closed {
            return;
        }
        debug!("stream {}: closed ({:?})", self.id, error_code);
        self.connection.borrow_mut().on_stream_closed(self.id, error_code);
    }

    fn maybe_close(&self, next: StreamState, error_code: Option<ErrorCode>) {
        if next == StreamState::Closed {
            self.fire_close_hook(error_code);
        }
    }

    /// Splits an encoded header block into the chunks a HEADERS frame and
    /// any trailing CONTINUATIONs carry, respecting `max_frame_size`.
    fn split_block(block: &[u8], max_frame_size: usize) -> Vec<&[u8]> {
        if block.is_empty() {
            return vec![&block[0..0]];
        }
        block.chunks(max_frame_size.max(1)).collect()
    }

    fn emit_header_block(&self, mut head: HeadersFrame, block: Vec<u8>, end_stream: bool) {
        let max_frame_size = self.connection.borrow().maximum_frame_size() as usize;
        // The HEADERS frame's first chunk shares its payload with the 5-byte
        // priority dependency block when one is set, so its budget is
        // smaller than a CONTINUATION's — otherwise the frame's total
        // payload_len() can exceed SETTINGS_MAX_FRAME_SIZE by 5 octets.
        let priority_len = if head.stream_dependency.is_some() { 5 } else { 0 };
        let first_chunk_max = max_frame_size.saturating_sub(priority_len).max(1);
        let first_len = block.len().min(first_chunk_max);
        let (first, rest) = block.split_at(first_len);

        let mut chunks = vec![first];
        if !rest.is_empty() {
            chunks.extend(Stream::<C>::split_block(rest, max_frame_size));
        }

        head.header_fragment = chunks[0].to_vec();
        if end_stream {
            head.set_end_stream();
        }
        if chunks.len() == 1 {
            head.set_end_headers();
        }
        self.connection.borrow_mut().write_frame(OutboundFrame::Headers(head));

        for (index, chunk) in chunks.iter().enumerate().skip(1) {
            let mut continuation = ContinuationFrame::new(self.id, chunk.to_vec());
            if index == chunks.len() - 1 {
                continuation.set_end_headers();
            }
            self.connection
                .borrow_mut()
                .write_frame(OutboundFrame::Continuation(continuation));
        }
    }

    /// Section 4.3: legal from `{idle, reserved_local, open, half_closed_remote}`.
    pub fn send_headers(
        &self,
        priority: Option<Priority>,
        fields: &FieldList,
        end_stream: bool,
    ) -> Result<(), Error> {
        // Every fallible step (priority reassignment, HPACK encode) runs
        // before the state transition commits: a self-dependent priority or
        // an encode failure must leave the stream untouched, matching
        // `apply_transition`'s own commit-only-on-success contract rather
        // than advancing the FSM ahead of a later failure.
        let event = Event::SendHeaders { end_stream };
        let next = self.validate_transition(event)?;

        let dependency = if let Some(p) = priority {
            priority::reassign(
                &mut *self.connection.borrow_mut(),
                self.id,
                p.stream_dependency,
                p.exclusive,
                p.weight,
            )?;
            Some(StreamDependency::from_priority(self.priority()?))
        } else {
            None
        };

        let block = self.connection.borrow_mut().encode_headers(fields)?;

        self.commit_transition(event.name(), next)?;

        let mut head = HeadersFrame::new(self.id, Vec::new());
        if let Some(dependency) = dependency {
            head = head.with_priority(dependency);
        }
        self.emit_header_block(head, block, end_stream);

        self.maybe_close(next, None);
        Ok(())
    }

    /// Section 4.3: legal from `{open, half_closed_remote}`. Charges
    /// `payload.len()` against both windows unconditionally; withholding
    /// when credit is insufficient is the caller's job.
    pub fn send_data(&self, payload: Vec<u8>, end_stream: bool) -> Result<(), Error> {
        let next = self.apply_transition(Event::SendData { end_stream })?;

        let len = payload.len() as u32;
        self.inner()?.borrow_mut().remote_window.consume(len);
        self.connection.borrow_mut().consume_remote_window(len);

        let mut frame = DataFrame::new(self.id, payload);
        if end_stream {
            frame.set_end_stream();
        }
        self.connection.borrow_mut().write_frame(OutboundFrame::Data(frame));

        self.maybe_close(next, None);
        Ok(())
    }

    /// Section 4.3: legal everywhere except `{idle, closed}`.
    pub fn send_reset_stream(&self, error_code: ErrorCode) -> Result<(), Error> {
        self.apply_transition(Event::SendResetStream)?;
        let frame = RstStreamFrame::new(self.id, error_code);
        self.connection.borrow_mut().write_frame(OutboundFrame::RstStream(frame));
        self.fire_close_hook(Some(error_code));
        Ok(())
    }

    /// Section 4.3/4.6: legal from `{open, half_closed_remote}`. Allocates
    /// and returns the promised stream, left in `reserved_local`.
    pub fn send_push_promise(&self, fields: &FieldList) -> Result<Stream<C>, Error> {
        let current = self.state()?;
        if !matches!(current, StreamState::Open | StreamState::HalfClosedRemote) {
            return Err(Error::ProtocolError {
                stream_id: self.id,
                state: current.name(),
                event: "send_push_promise",
            });
        }

        // Encode before allocating the promised stream: a failed HPACK
        // encode must not leave a freshly-minted, never-promised stream id
        // registered with no way to reach or close it.
        let block = self.connection.borrow_mut().encode_headers(fields)?;

        let promised_id = self.connection.borrow_mut().create_push_promise_stream(self.id);
        let promised = Stream::attach(self.connection.clone(), promised_id);
        promised.apply_transition(Event::ReserveLocal)?;

        let mut frame = PushPromiseFrame::new(self.id, promised_id, block);
        frame.set_end_headers();
        self.connection.borrow_mut().write_frame(OutboundFrame::PushPromise(frame));

        Ok(promised)
    }

    /// Convenience: emit a final error response if headers can still be
    /// sent, otherwise reset the stream with PROTOCOL_ERROR.
    pub fn send_failure(&self, status: &str, reason: &str) -> Result<(), Error> {
        let current = self.state()?;
        let headers_still_sendable = matches!(
            current,
            StreamState::Idle
                | StreamState::ReservedLocal
                | StreamState::Open
                | StreamState::HalfClosedRemote
        );
        if headers_still_sendable {
            let fields: FieldList = vec![
                (":status".to_string(), status.to_string()),
                ("reason".to_string(), reason.to_string()),
            ];
            self.send_headers(None, &fields, true)
        } else {
            self.send_reset_stream(ErrorCode::ProtocolError)
        }
    }

    /// Section 4.4: legal from `{idle, reserved_remote, open, half_closed_local}`.
    pub fn receive_headers(&self, frame: HeadersFrame) -> Result<(), Error> {
        // As in `send_headers`: the priority reassignment and the HPACK
        // decode both still fail, so both run before the transition
        // commits — a self-dependent priority block or a malformed header
        // block must leave the stream's state untouched.
        let event = Event::ReceiveHeaders {
            end_stream: frame.is_end_stream(),
        };
        let next = self.validate_transition(event)?;

        if let Some(dependency) = frame.stream_dependency {
            priority::reassign(
                &mut *self.connection.borrow_mut(),
                self.id,
                dependency.stream_dependency,
                dependency.exclusive,
                dependency.weight,
            )?;
        }

        let fields = self.connection.borrow_mut().decode_headers(&frame.header_fragment)?;

        self.commit_transition(event.name(), next)?;
        self.inner()?.borrow_mut().headers = Some(fields);

        self.maybe_close(next, None);
        Ok(())
    }

    /// Section 4.4: legal from `{open, half_closed_local}`. Rejects frames
    /// that exceed the credit this endpoint advertised.
    pub fn receive_data(&self, frame: DataFrame) -> Result<(), Error> {
        // Check the event is even legal before charging flow control: a
        // DATA frame arriving on an already-closed stream must be reported
        // as StreamClosed, not as a flow-control error, regardless of how
        // much credit it claims. Committing the transition is deferred past
        // the credit check too, so insufficient credit leaves state alone.
        let event = Event::ReceiveData {
            end_stream: frame.is_end_stream(),
        };
        let next = self.validate_transition(event)?;

        let len = frame.flow_controlled_length();
        let available = self.inner()?.borrow().local_window.available();
        if i64::from(len) > i64::from(available) {
            warn!(
                "stream {}: peer sent {} octets against {} available",
                self.id, len, available
            );
            return Err(Error::FlowControlInsufficientCredit {
                stream_id: self.id,
                len,
                available,
            });
        }

        self.commit_transition(event.name(), next)?;

        {
            let inner = self.inner()?;
            let mut inner = inner.borrow_mut();
            inner.local_window.consume(len);
            inner.data = Some(frame.data);
        }
        self.connection.borrow_mut().consume_local_window(len);

        self.maybe_close(next, None);
        Ok(())
    }

    /// Section 4.1: legal in any state and never transitions it, like
    /// `receive_priority` — WINDOW_UPDATE is orthogonal to the FSM and RFC
    /// 7540 Section 6.9.1 expects one to still land shortly after a stream
    /// is reset. Fails with `FlowControlOverflow` (and leaves the window
    /// untouched) if the increment would push `available` past 2^31-1.
    pub fn receive_window_update(&self, frame: WindowUpdateFrame) -> Result<(), Error> {
        let inner = self.inner()?;
        let mut inner = inner.borrow_mut();
        inner.expand_remote_window(frame.increment)?;
        trace!(
            "stream {}: remote window expanded by {} to {}",
            self.id,
            frame.increment,
            inner.remote_window().available()
        );
        Ok(())
    }

    /// Section 4.4/4.5: legal in any state; never transitions it.
    pub fn receive_priority(&self, frame: PriorityFrame) -> Result<(), Error> {
        priority::reassign(
            &mut *self.connection.borrow_mut(),
            self.id,
            frame.dependency.stream_dependency,
            frame.dependency.exclusive,
            frame.dependency.weight,
        )
    }

    /// Section 4.4: legal everywhere except `{idle, closed}`.
    pub fn receive_reset_stream(&self, frame: RstStreamFrame) -> Result<(), Error> {
        self.apply_transition(Event::ReceiveResetStream)?;
        self.fire_close_hook(Some(frame.error_code));
        Ok(())
    }

    /// Section 4.4/4.6: legal from `{open, half_closed_local}`. Registers
    /// and returns the promised stream, left in `reserved_remote`.
    pub fn receive_push_promise(&self, frame: PushPromiseFrame) -> Result<Stream<C>, Error> {
        let current = self.state()?;
        if !matches!(current, StreamState::Open | StreamState::HalfClosedLocal) {
            return Err(Error::ProtocolError {
                stream_id: self.id,
                state: current.name(),
                event: "receive_push_promise",
            });
        }

        // Decode before registering the promised stream: a malformed header
        // block must not leave an orphaned stream in the registry that
        // nobody holds a handle to and that can never be closed.
        let fields = self.connection.borrow_mut().decode_headers(&frame.header_fragment)?;

        self.connection
            .borrow_mut()
            .accept_push_promise_stream(frame.promised_stream_id, self.id);
        let promised = Stream::attach(self.connection.clone(), frame.promised_stream_id);
        promised.apply_transition(Event::ReserveRemote)?;
        promised.inner()?.borrow_mut().headers = Some(fields);

        Ok(promised)
    }
}
