//! DATA frame (RFC 7540 Section 6.1): carries stream payload and is the only
//! frame type subject to flow control.

use super::frames::{parse_padded_payload, Flag, Frame, FrameHeader, FrameType, RawFrame};
use crate::error::Error;
use crate::types::StreamId;

bitflags::bitflags! {
    pub struct DataFlags: u8 {
        const END_STREAM = 0x1;
        const PADDED     = 0x8;
    }
}

impl Flag for DataFlags {
    fn bitmask(self) -> u8 {
        self.bits()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DataFrame {
    pub stream_id: StreamId,
    pub data: Vec<u8>,
    /// The padding length this frame was (or will be) sent with. Counts
    /// toward flow control alongside `data` (Section 6.1, Section 6.9.1).
    pub pad_len: u8,
    flags: DataFlags,
}

impl DataFrame {
    pub fn new(stream_id: StreamId, data: Vec<u8>) -> DataFrame {
        DataFrame {
            stream_id,
            data,
            pad_len: 0,
            flags: DataFlags::empty(),
        }
    }

    pub fn set_end_stream(&mut self) {
        self.flags.insert(DataFlags::END_STREAM);
    }

    pub fn is_end_stream(&self) -> bool {
        self.flags.contains(DataFlags::END_STREAM)
    }

    /// Total octets this frame charges against flow control: the data plus
    /// any padding, plus the one-byte pad-length field when padded.
    pub fn flow_controlled_length(&self) -> u32 {
        let pad_overhead = if self.flags.contains(DataFlags::PADDED) { 1 } else { 0 };
        self.data.len() as u32 + self.pad_len as u32 + pad_overhead
    }
}

impl Frame for DataFrame {
    type FlagType = DataFlags;

    fn from_raw(raw: &RawFrame) -> Result<DataFrame, Error> {
        let (len, frame_type, flags, stream_id) = raw.header;
        if FrameType::from_u8(frame_type) != FrameType::Data {
            return Err(Error::FrameFormatError {
                frame_type: "DATA",
                reason: "frame type octet is not DATA",
            });
        }
        if len as usize != raw.payload.len() {
            return Err(Error::FrameFormatError {
                frame_type: "DATA",
                reason: "declared length does not match payload",
            });
        }
        if stream_id == 0 {
            return Err(Error::FrameFormatError {
                frame_type: "DATA",
                reason: "must not be associated with stream 0",
            });
        }
        let flags = DataFlags::from_bits_truncate(flags);

        let (data, pad_len) = if flags.contains(DataFlags::PADDED) {
            let (body, pad_len) = parse_padded_payload(&raw.payload)?;
            (body.to_vec(), pad_len)
        } else {
            (raw.payload.clone(), 0)
        };

        Ok(DataFrame {
            stream_id,
            data,
            pad_len,
            flags,
        })
    }

    fn is_set(&self, flag: DataFlags) -> bool {
        self.flags.contains(flag)
    }

    fn set_flag(&mut self, flag: DataFlags) {
        self.flags.insert(flag);
    }

    fn stream_id(&self) -> StreamId {
        self.stream_id
    }

    fn header(&self) -> FrameHeader {
        (
            self.flow_controlled_length(),
            FrameType::Data.as_u8(),
            self.flags.bits(),
            self.stream_id,
        )
    }

    fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9 + self.flow_controlled_length() as usize);
        buf.extend_from_slice(&super::frames::pack_header(&self.header()));
        if self.flags.contains(DataFlags::PADDED) {
            buf.push(self.pad_len);
        }
        buf.extend_from_slice(&self.data);
        buf.extend(std::iter::repeat(0u8).take(self.pad_len as usize));
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_unpadded() {
        let mut frame = DataFrame::new(1, b"ok".to_vec());
        frame.set_end_stream();
        let raw = RawFrame::with_payload(frame.header(), frame.serialize()[9..].to_vec());
        let parsed = DataFrame::from_raw(&raw).unwrap();
        assert_eq!(parsed, frame);
        assert_eq!(parsed.flow_controlled_length(), 2);
    }

    #[test]
    fn flow_controlled_length_counts_padding_and_its_length_octet() {
        let mut frame = DataFrame::new(1, b"ok".to_vec());
        frame.pad_len = 2;
        frame.set_flag(DataFlags::PADDED);
        assert_eq!(frame.flow_controlled_length(), 5); // 1 (pad len octet) + 2 (data) + 2 (padding)
    }

    #[test]
    fn flow_controlled_length_counts_the_pad_length_octet_even_with_zero_padding() {
        // PADDED set but zero padding is exactly what `from_raw` produces for
        // a frame whose pad length octet is 0 (RFC 7540 Section 6.9.1: the
        // Pad Length field itself counts toward flow control whenever PADDED
        // is set, regardless of how much padding follows it).
        let mut frame = DataFrame::new(1, b"ok".to_vec());
        frame.set_flag(DataFlags::PADDED);
        assert_eq!(frame.pad_len, 0);
        assert_eq!(frame.flow_controlled_length(), 3);
    }
}
