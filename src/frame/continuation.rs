//! CONTINUATION frame (RFC 7540 Section 6.10): carries the overflow of a
//! HEADERS or PUSH_PROMISE block too large for `SETTINGS_MAX_FRAME_SIZE`.
//! Splitting a block across CONTINUATIONs is the framing layer's concern;
//! this type only encodes/decodes one such frame.

use super::frames::{Flag, Frame, FrameHeader, FrameType, RawFrame};
use crate::error::Error;
use crate::types::StreamId;

bitflags::bitflags! {
    pub struct ContinuationFlags: u8 {
        const END_HEADERS = 0x4;
    }
}

impl Flag for ContinuationFlags {
    fn bitmask(self) -> u8 {
        self.bits()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContinuationFrame {
    pub stream_id: StreamId,
    pub header_fragment: Vec<u8>,
    flags: ContinuationFlags,
}

impl ContinuationFrame {
    pub fn new(stream_id: StreamId, header_fragment: Vec<u8>) -> ContinuationFrame {
        ContinuationFrame {
            stream_id,
            header_fragment,
            flags: ContinuationFlags::empty(),
        }
    }

    pub fn set_end_headers(&mut self) {
        self.set_flag(ContinuationFlags::END_HEADERS);
    }

    pub fn is_end_headers(&self) -> bool {
        self.is_set(ContinuationFlags::END_HEADERS)
    }
}

impl Frame for ContinuationFrame {
    type FlagType = ContinuationFlags;

    fn from_raw(raw: &RawFrame) -> Result<ContinuationFrame, Error> {
        let (len, frame_type, flags, stream_id) = raw.header;
        if FrameType::from_u8(frame_type) != FrameType::Continuation {
            return Err(Error::FrameFormatError {
                frame_type: "CONTINUATION",
                reason: "frame type octet is not CONTINUATION",
            });
        }
        if len as usize != raw.payload.len() {
            return Err(Error::FrameFormatError {
                frame_type: "CONTINUATION",
                reason: "declared length does not match payload",
            });
        }
        if stream_id == 0 {
            return Err(Error::FrameFormatError {
                frame_type: "CONTINUATION",
                reason: "must not be associated with stream 0",
            });
        }

        Ok(ContinuationFrame {
            stream_id,
            header_fragment: raw.payload.clone(),
            flags: ContinuationFlags::from_bits_truncate(flags),
        })
    }

    fn is_set(&self, flag: ContinuationFlags) -> bool {
        self.flags.contains(flag)
    }

    fn set_flag(&mut self, flag: ContinuationFlags) {
        self.flags.insert(flag);
    }

    fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    fn header(&self) -> FrameHeader {
        (
            self.header_fragment.len() as u32,
            FrameType::Continuation.as_u8(),
            self.flags.bits(),
            self.stream_id,
        )
    }

    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9 + self.header_fragment.len());
        buf.extend_from_slice(&super::frames::pack_header(&self.header()));
        buf.extend_from_slice(&self.header_fragment);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_fragment() {
        let mut frame = ContinuationFrame::new(2, b"rest-of-the-block".to_vec());
        frame.set_end_headers();
        let raw = RawFrame::with_payload(frame.header(), frame.serialize()[9..].to_vec());
        let parsed = ContinuationFrame::from_raw(&raw).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn rejects_stream_zero() {
        let raw = RawFrame::with_payload((0, FrameType::Continuation.as_u8(), 0, 0), Vec::new());
        assert!(ContinuationFrame::from_raw(&raw).is_err());
    }
}
