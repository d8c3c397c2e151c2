//! PRIORITY frame (RFC 7540 Section 6.3): the standalone wire form of a
//! priority reassignment, distinct from the `Priority` record stream.rs and
//! priority.rs operate on — this module only deals in bytes on the wire.

use super::frames::{Frame, FrameHeader, FrameType, RawFrame};
use super::headers::StreamDependency;
use crate::error::Error;
use crate::types::StreamId;

bitflags::bitflags! {
    /// PRIORITY defines no flags.
    pub struct PriorityFlags: u8 {
        const NONE = 0x0;
    }
}

impl super::frames::Flag for PriorityFlags {
    fn bitmask(self) -> u8 {
        self.bits()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PriorityFrame {
    pub stream_id: StreamId,
    pub dependency: StreamDependency,
}

impl PriorityFrame {
    pub fn new(stream_id: StreamId, dependency: StreamDependency) -> PriorityFrame {
        PriorityFrame { stream_id, dependency }
    }
}

impl Frame for PriorityFrame {
    type FlagType = PriorityFlags;

    fn from_raw(raw: &RawFrame) -> Result<PriorityFrame, Error> {
        let (len, frame_type, _flags, stream_id) = raw.header;
        if FrameType::from_u8(frame_type) != FrameType::Priority {
            return Err(Error::FrameFormatError {
                frame_type: "PRIORITY",
                reason: "frame type octet is not PRIORITY",
            });
        }
        if len != 5 || raw.payload.len() != 5 {
            return Err(Error::FrameFormatError {
                frame_type: "PRIORITY",
                reason: "payload must be exactly 5 octets",
            });
        }
        if stream_id == 0 {
            return Err(Error::FrameFormatError {
                frame_type: "PRIORITY",
                reason: "must not be associated with stream 0",
            });
        }
        Ok(PriorityFrame {
            stream_id,
            dependency: StreamDependency::parse(&raw.payload)?,
        })
    }

    fn is_set(&self, _flag: PriorityFlags) -> bool {
        false
    }

    fn set_flag(&mut self, _flag: PriorityFlags) {}

    fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    fn header(&self) -> FrameHeader {
        (5, FrameType::Priority.as_u8(), 0, self.stream_id)
    }

    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(14);
        buf.extend_from_slice(&super::frames::pack_header(&self.header()));
        buf.extend_from_slice(&self.dependency.serialize());
        buf
    }
}
