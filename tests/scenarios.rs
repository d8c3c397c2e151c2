//! Black-box scenarios S1-S6, exercised the same way an embedder would use
//! this crate: through `Stream` and `DefaultConnection` only, no access to
//! internals.

use std::cell::RefCell;
use std::rc::Rc;

use solicit_proto::connection::{dispatch_window_update, Connection, ConnectionSettings, DefaultConnection};
use solicit_proto::error::{Error, ErrorCode};
use solicit_proto::frame::{DataFrame, HeadersFrame, RstStreamFrame, WindowUpdateFrame};
use solicit_proto::priority::{self, Priority, PriorityRegistry};
use solicit_proto::stream::{Stream, StreamState};

/// Every scenario logs through the `log` crate (state transitions, window
/// charges); route it to stderr under `RUST_LOG` like any other embedder
/// would, instead of letting it go nowhere.
fn connection() -> Rc<RefCell<DefaultConnection>> {
    let _ = env_logger::builder().is_test(true).try_init();
    Rc::new(RefCell::new(DefaultConnection::new(
        false,
        ConnectionSettings::default(),
        ConnectionSettings::default(),
    )))
}

fn server_connection() -> Rc<RefCell<DefaultConnection>> {
    let _ = env_logger::builder().is_test(true).try_init();
    Rc::new(RefCell::new(DefaultConnection::new(
        true,
        ConnectionSettings::default(),
        ConnectionSettings::default(),
    )))
}

/// S1 - minimal client exchange.
#[test]
fn s1_minimal_client_exchange() {
    let conn = connection();
    let stream = Stream::open(conn);

    stream.send_headers(None, &Vec::new(), true).unwrap();
    assert_eq!(stream.state().unwrap(), StreamState::HalfClosedLocal);

    let mut response = HeadersFrame::new(stream.id(), Vec::new());
    response.set_end_headers();
    stream.receive_headers(response).unwrap();
    assert_eq!(stream.state().unwrap(), StreamState::HalfClosedLocal);

    let before = stream.local_window().unwrap().available();
    let mut data = DataFrame::new(stream.id(), b"ok".to_vec());
    data.set_end_stream();
    stream.receive_data(data).unwrap();

    assert_eq!(stream.state().unwrap(), StreamState::Closed);
    assert_eq!(stream.data().unwrap().unwrap(), b"ok");
    assert_eq!(stream.local_window().unwrap().available(), before - 2);
}

/// S2 - illegal send from idle.
#[test]
fn s2_illegal_send_from_idle() {
    let conn = connection();
    let stream = Stream::open(conn);

    let err = stream.send_data(b"x".to_vec(), false).unwrap_err();
    assert!(matches!(err, Error::ProtocolError { .. }));
    assert_eq!(stream.state().unwrap(), StreamState::Idle);
}

/// S3 - reset from open.
#[test]
fn s3_reset_from_open() {
    let conn = connection();
    let stream = Stream::open(conn.clone());
    stream.send_headers(None, &Vec::new(), false).unwrap();

    stream.send_reset_stream(ErrorCode::Cancel).unwrap();

    assert_eq!(stream.state().unwrap(), StreamState::Closed);
    let closed = conn.borrow().closed_streams().to_vec();
    assert_eq!(closed, vec![(stream.id(), Some(ErrorCode::Cancel))]);

    let rst = conn
        .borrow()
        .outbox()
        .iter()
        .find_map(|f| match f {
            solicit_proto::frame::OutboundFrame::RstStream(r) => Some(*r),
            _ => None,
        })
        .unwrap();
    assert_eq!(rst, RstStreamFrame::new(stream.id(), ErrorCode::Cancel));
}

/// S4 - server push lifecycle.
#[test]
fn s4_server_push_lifecycle() {
    let conn = server_connection();
    let parent = Stream::open(conn);
    parent.send_headers(None, &Vec::new(), false).unwrap();
    let mut response = HeadersFrame::new(parent.id(), Vec::new());
    response.set_end_headers();
    response.set_end_stream();
    parent.receive_headers(response).unwrap();
    assert_eq!(parent.state().unwrap(), StreamState::HalfClosedRemote);

    let pushed = parent
        .send_push_promise(&vec![(":path".to_string(), "/x".to_string())])
        .unwrap();
    assert_eq!(pushed.state().unwrap(), StreamState::ReservedLocal);
    assert!(pushed.id() % 2 == 0 && pushed.id() != parent.id());

    pushed.send_headers(None, &Vec::new(), false).unwrap();
    assert_eq!(pushed.state().unwrap(), StreamState::HalfClosedRemote);

    pushed.send_data(Vec::new(), true).unwrap();
    assert_eq!(pushed.state().unwrap(), StreamState::Closed);
}

/// S5 - exclusive priority reparenting.
#[test]
fn s5_exclusive_priority_reparenting() {
    let mut conn = DefaultConnection::new(true, ConnectionSettings::default(), ConnectionSettings::default());
    for id in [1u32, 3, 5] {
        conn.register_stream(
            id,
            Rc::new(RefCell::new(solicit_proto::stream::StreamInner::new(id, 65_535, 65_535))),
        );
    }

    priority::reassign(&mut conn, 1, 0, true, 16).unwrap();

    assert_eq!(priority::children(&conn, 0), vec![1]);
    let mut under_a = priority::children(&conn, 1);
    under_a.sort();
    assert_eq!(under_a, vec![3, 5]);
}

/// S6 - self-dependency rejected.
#[test]
fn s6_self_dependency_rejected() {
    let mut conn = DefaultConnection::new(true, ConnectionSettings::default(), ConnectionSettings::default());
    conn.register_stream(
        3,
        Rc::new(RefCell::new(solicit_proto::stream::StreamInner::new(3, 65_535, 65_535))),
    );
    conn.set_priority(
        3,
        Priority {
            stream_dependency: 0,
            exclusive: false,
            weight: 16,
        },
    );
    let before = conn.priority_of(3).unwrap();

    let err = priority::reassign(&mut conn, 3, 3, false, 16).unwrap_err();
    assert!(matches!(err, Error::SelfDependency { stream_id: 3 }));
    assert_eq!(conn.priority_of(3).unwrap(), before);
}

/// Property 5 - WINDOW_UPDATE never overflows the 2^31-1 ceiling; a would-be
/// overflow is rejected and leaves the window untouched, whether it targets
/// the connection (stream id 0) or a single stream.
#[test]
fn property5_window_update_respects_the_overflow_ceiling() {
    let conn = connection();
    let stream = Stream::open(conn.clone());
    stream.send_headers(None, &Vec::new(), false).unwrap();

    let before = stream.remote_window().unwrap().available();
    dispatch_window_update(&conn, WindowUpdateFrame::new(stream.id(), 1000)).unwrap();
    assert_eq!(stream.remote_window().unwrap().available(), before + 1000);

    let err = dispatch_window_update(&conn, WindowUpdateFrame::new(stream.id(), u32::MAX))
        .unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::FlowControlError);
    assert_eq!(stream.remote_window().unwrap().available(), before + 1000);

    let conn_before = conn.borrow().remote_window().available();
    let err =
        dispatch_window_update(&conn, WindowUpdateFrame::new(0, u32::MAX)).unwrap_err();
    assert_eq!(err.error_code(), ErrorCode::FlowControlError);
    assert_eq!(conn.borrow().remote_window().available(), conn_before);
}
