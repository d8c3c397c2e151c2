//! HEADERS frame (RFC 7540 Section 6.2): opens or continues a stream's
//! header block, optionally carrying the stream's initial priority.

use super::frames::{parse_padded_payload, Flag, Frame, FrameHeader, FrameType, RawFrame};
use crate::error::Error;
use crate::priority::Priority;
use crate::types::StreamId;

bitflags::bitflags! {
    pub struct HeadersFlags: u8 {
        const END_STREAM  = 0x1;
        const END_HEADERS = 0x4;
        const PADDED      = 0x8;
        const PRIORITY    = 0x20;
    }
}

impl Flag for HeadersFlags {
    fn bitmask(self) -> u8 {
        self.bits()
    }
}

/// The 5-byte priority block a HEADERS (or standalone PRIORITY) frame may
/// carry: a 31-bit dependency with its top bit repurposed as the exclusive
/// flag, followed by a one-byte weight stored zero-based on the wire
/// (`wire + 1 == Priority.weight`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamDependency {
    pub stream_dependency: StreamId,
    pub exclusive: bool,
    pub weight: u8,
}

impl StreamDependency {
    pub fn from_priority(priority: Priority) -> StreamDependency {
        StreamDependency {
            stream_dependency: priority.stream_dependency,
            exclusive: priority.exclusive,
            weight: priority.weight,
        }
    }

    pub fn to_priority(self) -> Priority {
        Priority {
            stream_dependency: self.stream_dependency,
            exclusive: self.exclusive,
            weight: self.weight,
        }
    }

    pub fn parse(buf: &[u8]) -> Result<StreamDependency, Error> {
        if buf.len() < 5 {
            return Err(Error::FrameFormatError {
                frame_type: "priority block",
                reason: "fewer than 5 octets available",
            });
        }
        let raw = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        Ok(StreamDependency {
            stream_dependency: raw & 0x7fff_ffff,
            exclusive: raw & 0x8000_0000 != 0,
            weight: buf[4].wrapping_add(1),
        })
    }

    pub fn serialize(self) -> [u8; 5] {
        let mut raw = self.stream_dependency & 0x7fff_ffff;
        if self.exclusive {
            raw |= 0x8000_0000;
        }
        let bytes = raw.to_be_bytes();
        [bytes[0], bytes[1], bytes[2], bytes[3], self.weight.wrapping_sub(1)]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeadersFrame {
    pub stream_id: StreamId,
    pub header_fragment: Vec<u8>,
    pub stream_dependency: Option<StreamDependency>,
    flags: HeadersFlags,
}

impl HeadersFrame {
    pub fn new(stream_id: StreamId, header_fragment: Vec<u8>) -> HeadersFrame {
        HeadersFrame {
            stream_id,
            header_fragment,
            stream_dependency: None,
            flags: HeadersFlags::empty(),
        }
    }

    pub fn with_priority(mut self, dependency: StreamDependency) -> HeadersFrame {
        self.stream_dependency = Some(dependency);
        self.flags.insert(HeadersFlags::PRIORITY);
        self
    }

    pub fn set_end_stream(&mut self) {
        self.set_flag(HeadersFlags::END_STREAM);
    }

    pub fn set_end_headers(&mut self) {
        self.set_flag(HeadersFlags::END_HEADERS);
    }

    pub fn is_end_stream(&self) -> bool {
        self.is_set(HeadersFlags::END_STREAM)
    }

    pub fn is_end_headers(&self) -> bool {
        self.is_set(HeadersFlags::END_HEADERS)
    }

    fn payload_len(&self) -> u32 {
        let priority_len = if self.stream_dependency.is_some() { 5 } else { 0 };
        self.header_fragment.len() as u32 + priority_len
    }
}

impl Frame for HeadersFrame {
    type FlagType = HeadersFlags;

    fn from_raw(raw: &RawFrame) -> Result<HeadersFrame, Error> {
        let (len, frame_type, flags, stream_id) = raw.header;
        if FrameType::from_u8(frame_type) != FrameType::Headers {
            return Err(Error::FrameFormatError {
                frame_type: "HEADERS",
                reason: "frame type octet is not HEADERS",
            });
        }
        if len as usize != raw.payload.len() {
            return Err(Error::FrameFormatError {
                frame_type: "HEADERS",
                reason: "declared length does not match payload",
            });
        }
        if stream_id == 0 {
            return Err(Error::FrameFormatError {
                frame_type: "HEADERS",
                reason: "must not be associated with stream 0",
            });
        }
        let flags = HeadersFlags::from_bits_truncate(flags);

        let body = if flags.contains(HeadersFlags::PADDED) {
            parse_padded_payload(&raw.payload)?.0
        } else {
            &raw.payload[..]
        };

        let (stream_dependency, rest) = if flags.contains(HeadersFlags::PRIORITY) {
            (Some(StreamDependency::parse(body)?), &body[5..])
        } else {
            (None, body)
        };

        Ok(HeadersFrame {
            stream_id,
            header_fragment: rest.to_vec(),
            stream_dependency,
            flags,
        })
    }

    fn is_set(&self, flag: HeadersFlags) -> bool {
        self.flags.contains(flag)
    }

    fn set_flag(&mut self, flag: HeadersFlags) {
        self.flags.insert(flag);
    }

    fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    fn header(&self) -> FrameHeader {
        (
            self.payload_len(),
            FrameType::Headers.as_u8(),
            self.flags.bits(),
            self.stream_id,
        )
    }

    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9 + self.payload_len() as usize);
        buf.extend_from_slice(&super::frames::pack_header(&self.header()));
        if let Some(dependency) = self.stream_dependency {
            buf.extend_from_slice(&dependency.serialize());
        }
        buf.extend_from_slice(&self.header_fragment);
        buf
    }
}
