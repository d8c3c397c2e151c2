//! WINDOW_UPDATE frame (RFC 7540 Section 6.9): communicates a flow-control
//! window increment, either for one stream or (stream id 0) the connection.

use super::frames::{Frame, FrameHeader, FrameType, RawFrame};
use crate::error::Error;
use crate::types::StreamId;

bitflags::bitflags! {
    /// WINDOW_UPDATE defines no flags.
    pub struct WindowUpdateFlags: u8 {
        const NONE = 0x0;
    }
}

impl super::frames::Flag for WindowUpdateFlags {
    fn bitmask(self) -> u8 {
        self.bits()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowUpdateFrame {
    pub stream_id: StreamId,
    pub increment: u32,
}

impl WindowUpdateFrame {
    pub fn new(stream_id: StreamId, increment: u32) -> WindowUpdateFrame {
        WindowUpdateFrame { stream_id, increment }
    }

    /// True when this increment applies to the connection as a whole rather
    /// than a single stream.
    pub fn is_connection_level(&self) -> bool {
        self.stream_id == 0
    }
}

impl Frame for WindowUpdateFrame {
    type FlagType = WindowUpdateFlags;

    fn from_raw(raw: &RawFrame) -> Result<WindowUpdateFrame, Error> {
        let (len, frame_type, _flags, stream_id) = raw.header;
        if FrameType::from_u8(frame_type) != FrameType::WindowUpdate {
            return Err(Error::FrameFormatError {
                frame_type: "WINDOW_UPDATE",
                reason: "frame type octet is not WINDOW_UPDATE",
            });
        }
        if len != 4 || raw.payload.len() != 4 {
            return Err(Error::FrameFormatError {
                frame_type: "WINDOW_UPDATE",
                reason: "payload must be exactly 4 octets",
            });
        }
        let raw_increment = u32::from_be_bytes([
            raw.payload[0],
            raw.payload[1],
            raw.payload[2],
            raw.payload[3],
        ]);
        let increment = raw_increment & 0x7fff_ffff;
        if increment == 0 {
            return Err(Error::FrameFormatError {
                frame_type: "WINDOW_UPDATE",
                reason: "increment of 0 is not permitted",
            });
        }

        Ok(WindowUpdateFrame { stream_id, increment })
    }

    fn is_set(&self, _flag: WindowUpdateFlags) -> bool {
        false
    }

    fn set_flag(&mut self, _flag: WindowUpdateFlags) {}

    fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    fn header(&self) -> FrameHeader {
        (4, FrameType::WindowUpdate.as_u8(), 0, self.stream_id)
    }

    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(13);
        buf.extend_from_slice(&super::frames::pack_header(&self.header()));
        buf.extend_from_slice(&(self.increment & 0x7fff_ffff).to_be_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_increment() {
        let frame = WindowUpdateFrame::new(3, 100);
        let raw = RawFrame::with_payload(frame.header(), frame.serialize()[9..].to_vec());
        let parsed = WindowUpdateFrame::from_raw(&raw).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn rejects_zero_increment() {
        let raw = RawFrame::with_payload((4, FrameType::WindowUpdate.as_u8(), 0, 1), vec![0; 4]);
        assert!(WindowUpdateFrame::from_raw(&raw).is_err());
    }

    #[test]
    fn stream_zero_is_connection_level() {
        assert!(WindowUpdateFrame::new(0, 10).is_connection_level());
        assert!(!WindowUpdateFrame::new(1, 10).is_connection_level());
    }
}
