//! PUSH_PROMISE frame (RFC 7540 Section 6.6): announces a server-initiated
//! stream before any response headers for it exist.

use super::frames::{parse_padded_payload, Flag, Frame, FrameHeader, FrameType, RawFrame};
use crate::error::Error;
use crate::types::StreamId;

bitflags::bitflags! {
    pub struct PushPromiseFlags: u8 {
        const END_HEADERS = 0x4;
        const PADDED      = 0x8;
    }
}

impl Flag for PushPromiseFlags {
    fn bitmask(self) -> u8 {
        self.bits()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PushPromiseFrame {
    pub stream_id: StreamId,
    pub promised_stream_id: StreamId,
    pub header_fragment: Vec<u8>,
    flags: PushPromiseFlags,
}

impl PushPromiseFrame {
    pub fn new(
        stream_id: StreamId,
        promised_stream_id: StreamId,
        header_fragment: Vec<u8>,
    ) -> PushPromiseFrame {
        PushPromiseFrame {
            stream_id,
            promised_stream_id,
            header_fragment,
            flags: PushPromiseFlags::empty(),
        }
    }

    pub fn set_end_headers(&mut self) {
        self.set_flag(PushPromiseFlags::END_HEADERS);
    }

    pub fn is_end_headers(&self) -> bool {
        self.is_set(PushPromiseFlags::END_HEADERS)
    }

    fn payload_len(&self) -> u32 {
        4 + self.header_fragment.len() as u32
    }
}

impl Frame for PushPromiseFrame {
    type FlagType = PushPromiseFlags;

    fn from_raw(raw: &RawFrame) -> Result<PushPromiseFrame, Error> {
        let (len, frame_type, flags, stream_id) = raw.header;
        if FrameType::from_u8(frame_type) != FrameType::PushPromise {
            return Err(Error::FrameFormatError {
                frame_type: "PUSH_PROMISE",
                reason: "frame type octet is not PUSH_PROMISE",
            });
        }
        if len as usize != raw.payload.len() {
            return Err(Error::FrameFormatError {
                frame_type: "PUSH_PROMISE",
                reason: "declared length does not match payload",
            });
        }
        if stream_id == 0 {
            return Err(Error::FrameFormatError {
                frame_type: "PUSH_PROMISE",
                reason: "must not be associated with stream 0",
            });
        }
        let flags = PushPromiseFlags::from_bits_truncate(flags);

        let body = if flags.contains(PushPromiseFlags::PADDED) {
            parse_padded_payload(&raw.payload)?.0
        } else {
            &raw.payload[..]
        };
        if body.len() < 4 {
            return Err(Error::FrameFormatError {
                frame_type: "PUSH_PROMISE",
                reason: "payload too short to contain the promised stream id",
            });
        }
        let promised_stream_id =
            u32::from_be_bytes([body[0], body[1], body[2], body[3]]) & 0x7fff_ffff;

        Ok(PushPromiseFrame {
            stream_id,
            promised_stream_id,
            header_fragment: body[4..].to_vec(),
            flags,
        })
    }

    fn is_set(&self, flag: PushPromiseFlags) -> bool {
        self.flags.contains(flag)
    }

    fn set_flag(&mut self, flag: PushPromiseFlags) {
        self.flags.insert(flag);
    }

    fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    fn header(&self) -> FrameHeader {
        (
            self.payload_len(),
            FrameType::PushPromise.as_u8(),
            self.flags.bits(),
            self.stream_id,
        )
    }

    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9 + self.payload_len() as usize);
        buf.extend_from_slice(&super::frames::pack_header(&self.header()));
        buf.extend_from_slice(&(self.promised_stream_id & 0x7fff_ffff).to_be_bytes());
        buf.extend_from_slice(&self.header_fragment);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_promised_id_and_fragment() {
        let mut frame = PushPromiseFrame::new(1, 2, b"promised-headers".to_vec());
        frame.set_end_headers();
        let raw = RawFrame::with_payload(frame.header(), frame.serialize()[9..].to_vec());
        let parsed = PushPromiseFrame::from_raw(&raw).unwrap();
        assert_eq!(parsed, frame);
        assert!(parsed.is_end_headers());
    }
}
