//! Flow control primitive (RFC 7540 Section 6.9).
//!
//! A `Window` tracks how many octets of DATA one side of a stream (or the
//! connection as a whole) is still willing to accept. Credit is strictly
//! additive/subtractive: there is no implicit replenishment. `expand` is
//! driven by WINDOW_UPDATE frames; `consume` is charged by DATA frames.

use crate::error::Error;
use crate::types::MAX_WINDOW_SIZE;

/// A signed flow-control credit counter.
///
/// `available` may go negative: SETTINGS_INITIAL_WINDOW_SIZE changes can
/// shrink a stream's window out from under data already in flight, and RFC
/// 7540 Section 6.9.2 requires that this be tolerated rather than treated as
/// an error. Once negative, the window is *exhausted* and the caller must
/// not charge further frames against it until enough WINDOW_UPDATEs arrive
/// to bring it back to non-negative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Window {
    /// The last initial size this window was (re)based on.
    capacity: i32,
    /// The current credit.
    available: i32,
}

impl Window {
    /// Creates a window initialized to `initial_size` on both fields.
    pub fn new(initial_size: i32) -> Window {
        Window {
            capacity: initial_size,
            available: initial_size,
        }
    }

    pub fn available(&self) -> i32 {
        self.available
    }

    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    /// True iff this window currently holds less credit than its capacity,
    /// i.e. some of it has been consumed and not yet refilled.
    pub fn is_limited(&self) -> bool {
        self.available < self.capacity
    }

    /// True iff no further DATA may be charged against this window.
    pub fn is_exhausted(&self) -> bool {
        self.available <= 0
    }

    /// Charges `n` octets against the window. Always succeeds arithmetically;
    /// the window may go negative, at which point it is exhausted and the
    /// caller is responsible for refusing further frames (Section 4.3/4.4).
    pub fn consume(&mut self, n: u32) {
        // DATA frame lengths are bounded well under i32::MAX by
        // SETTINGS_MAX_FRAME_SIZE, so this narrowing is not lossy in practice.
        self.available -= n as i32;
    }

    /// Applies a WINDOW_UPDATE increment. Fails if the result would exceed
    /// the protocol maximum of 2^31-1.
    pub fn expand(&mut self, increment: u32) -> Result<(), Error> {
        let delta = increment as i64;
        let next = self.available as i64 + delta;
        if next > MAX_WINDOW_SIZE as i64 {
            return Err(Error::FlowControlOverflow { delta });
        }
        self.available = next as i32;
        Ok(())
    }

    /// Rebases the window onto a new SETTINGS_INITIAL_WINDOW_SIZE, preserving
    /// the delta already in flight (RFC 7540 Section 6.9.2): the window's
    /// available credit moves by the same amount the capacity does.
    pub fn set_initial_size(&mut self, new_initial_size: i32) -> Result<(), Error> {
        let delta = new_initial_size as i64 - self.capacity as i64;
        let next = self.available as i64 + delta;
        if next > MAX_WINDOW_SIZE as i64 {
            return Err(Error::FlowControlOverflow { delta });
        }
        self.capacity = new_initial_size;
        self.available = next as i32;
        Ok(())
    }
}
