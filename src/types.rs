//! Shared scalar types used across the crate.

/// A 31-bit stream identifier. Stream 0 always refers to the connection root.
pub type StreamId = u32;

/// The largest legal value for a 31-bit HTTP/2 identifier or window size.
pub const MAX_WINDOW_SIZE: i32 = i32::MAX;

/// Default `SETTINGS_INITIAL_WINDOW_SIZE`, per RFC 7540 Section 6.5.2.
pub const DEFAULT_INITIAL_WINDOW_SIZE: i32 = 65_535;

/// Default `SETTINGS_MAX_FRAME_SIZE`, per RFC 7540 Section 6.5.2.
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 16_384;

/// Default stream priority weight, per RFC 7540 Section 5.3.2.
pub const DEFAULT_WEIGHT: u8 = 16;

/// The connection root is never an entry in the stream registry; it is
/// addressed by the reserved id 0.
pub const CONNECTION_ROOT: StreamId = 0;

#[inline]
pub fn is_client_initiated(id: StreamId) -> bool {
    id % 2 == 1
}

#[inline]
pub fn is_server_initiated(id: StreamId) -> bool {
    id != 0 && id % 2 == 0
}

/// A decoded HTTP/2 header block: an ordered list of name/value pairs.
/// Ordering matters (pseudo-headers must precede regular fields) so this is
/// a `Vec`, not a map.
pub type FieldList = Vec<(String, String)>;

