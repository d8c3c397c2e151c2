//! RST_STREAM frame (RFC 7540 Section 6.4): immediately terminates a stream.

use super::frames::{Frame, FrameHeader, FrameType, RawFrame};
use crate::error::{Error, ErrorCode};
use crate::types::StreamId;

bitflags::bitflags! {
    /// RST_STREAM defines no flags; kept so `RstStreamFrame` can still
    /// implement the shared `Frame` trait.
    pub struct RstStreamFlags: u8 {
        const NONE = 0x0;
    }
}

impl super::frames::Flag for RstStreamFlags {
    fn bitmask(self) -> u8 {
        self.bits()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RstStreamFrame {
    pub stream_id: StreamId,
    pub error_code: ErrorCode,
}

impl RstStreamFrame {
    pub fn new(stream_id: StreamId, error_code: ErrorCode) -> RstStreamFrame {
        RstStreamFrame { stream_id, error_code }
    }
}

impl Frame for RstStreamFrame {
    type FlagType = RstStreamFlags;

    fn from_raw(raw: &RawFrame) -> Result<RstStreamFrame, Error> {
        let (len, frame_type, _flags, stream_id) = raw.header;
        if FrameType::from_u8(frame_type) != FrameType::RstStream {
            return Err(Error::FrameFormatError {
                frame_type: "RST_STREAM",
                reason: "frame type octet is not RST_STREAM",
            });
        }
        if len != 4 || raw.payload.len() != 4 {
            return Err(Error::FrameFormatError {
                frame_type: "RST_STREAM",
                reason: "payload must be exactly 4 octets",
            });
        }
        if stream_id == 0 {
            return Err(Error::FrameFormatError {
                frame_type: "RST_STREAM",
                reason: "must not be associated with stream 0",
            });
        }
        let code = u32::from_be_bytes([
            raw.payload[0],
            raw.payload[1],
            raw.payload[2],
            raw.payload[3],
        ]);
        Ok(RstStreamFrame {
            stream_id,
            error_code: ErrorCode::from_u32(code),
        })
    }

    fn is_set(&self, _flag: RstStreamFlags) -> bool {
        false
    }

    fn set_flag(&mut self, _flag: RstStreamFlags) {}

    fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    fn header(&self) -> FrameHeader {
        (4, FrameType::RstStream.as_u8(), 0, self.stream_id)
    }

    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(13);
        buf.extend_from_slice(&super::frames::pack_header(&self.header()));
        buf.extend_from_slice(&self.error_code.as_u32().to_be_bytes());
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_error_code() {
        let frame = RstStreamFrame::new(7, ErrorCode::Cancel);
        let raw = RawFrame::with_payload(frame.header(), frame.serialize()[9..].to_vec());
        let parsed = RstStreamFrame::from_raw(&raw).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn rejects_wrong_length() {
        let raw = RawFrame::with_payload((3, FrameType::RstStream.as_u8(), 0, 1), vec![0, 0, 0]);
        assert!(RstStreamFrame::from_raw(&raw).is_err());
    }
}
