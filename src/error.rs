//! Error types raised by the stream state machine and flow control engine.

use crate::types::StreamId;

/// The RST_STREAM / GOAWAY error codes defined by RFC 7540, Section 7.
///
/// All fourteen codes are represented so that values arriving from a peer
/// round-trip through this type without lossy reinterpretation, even though
/// this crate only ever originates a subset of them (see `Error`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    NoError = 0x0,
    ProtocolError = 0x1,
    InternalError = 0x2,
    FlowControlError = 0x3,
    SettingsTimeout = 0x4,
    StreamClosed = 0x5,
    FrameSizeError = 0x6,
    RefusedStream = 0x7,
    Cancel = 0x8,
    CompressionError = 0x9,
    ConnectError = 0xa,
    EnhanceYourCalm = 0xb,
    InadequateSecurity = 0xc,
    Http11Required = 0xd,
}

impl ErrorCode {
    /// Maps a raw 32-bit error code off the wire to its typed form.
    ///
    /// Unknown codes are folded into `InternalError`, matching how most
    /// HTTP/2 endpoints treat a RST_STREAM/GOAWAY code they don't recognize.
    pub fn from_u32(value: u32) -> ErrorCode {
        match value {
            0x0 => ErrorCode::NoError,
            0x1 => ErrorCode::ProtocolError,
            0x2 => ErrorCode::InternalError,
            0x3 => ErrorCode::FlowControlError,
            0x4 => ErrorCode::SettingsTimeout,
            0x5 => ErrorCode::StreamClosed,
            0x6 => ErrorCode::FrameSizeError,
            0x7 => ErrorCode::RefusedStream,
            0x8 => ErrorCode::Cancel,
            0x9 => ErrorCode::CompressionError,
            0xa => ErrorCode::ConnectError,
            0xb => ErrorCode::EnhanceYourCalm,
            0xc => ErrorCode::InadequateSecurity,
            0xd => ErrorCode::Http11Required,
            _ => ErrorCode::InternalError,
        }
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

/// Errors raised by stream operations.
///
/// Every variant that corresponds to a stream-level failure also carries the
/// `ErrorCode` a conformant connection would report to the peer in the
/// resulting RST_STREAM, so callers never need to re-derive it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("stream {stream_id}: illegal {event} while in state {state}")]
    ProtocolError {
        stream_id: StreamId,
        state: &'static str,
        event: &'static str,
    },

    #[error("stream {stream_id}: priority cannot depend on itself")]
    SelfDependency { stream_id: StreamId },

    #[error("window overflow: expanding by {delta} would exceed the 2^31-1 limit")]
    FlowControlOverflow { delta: i64 },

    #[error("stream {stream_id}: {len} octets exceed the {available} available on the window")]
    FlowControlInsufficientCredit {
        stream_id: StreamId,
        len: u32,
        available: i32,
    },

    #[error("hpack decode failed: {0}")]
    CompressionError(String),

    #[error("stream {stream_id} is closed")]
    StreamClosed { stream_id: StreamId },

    #[error("no such stream: {0}")]
    UnknownStream(StreamId),

    #[error("malformed {frame_type} frame: {reason}")]
    FrameFormatError {
        frame_type: &'static str,
        reason: &'static str,
    },
}

impl Error {
    /// The RST_STREAM error code a connection should report for this error.
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Error::ProtocolError { .. } | Error::SelfDependency { .. } => ErrorCode::ProtocolError,
            Error::FlowControlOverflow { .. } | Error::FlowControlInsufficientCredit { .. } => {
                ErrorCode::FlowControlError
            }
            Error::CompressionError(_) => ErrorCode::CompressionError,
            Error::StreamClosed { .. } => ErrorCode::StreamClosed,
            Error::UnknownStream(_) => ErrorCode::ProtocolError,
            Error::FrameFormatError { .. } => ErrorCode::FrameSizeError,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
