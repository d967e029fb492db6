//! Fixed-width, big-endian ordered record identifier.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-bit unsigned integer stored and compared in big-endian byte order.
///
/// The all-zero key is a valid minimum key, but is also used by
/// [`crate::segment_set::SegmentSet`] as the "no upper bound yet" sentinel on
/// a freshly rotated tail segment.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Key([u8; 4]);

impl Key {
    pub const ZERO: Key = Key([0; 4]);

    pub fn from_u32(value: u32) -> Key {
        Key(value.to_be_bytes())
    }

    pub fn to_u32(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    pub fn to_be_bytes(self) -> [u8; 4] {
        self.0
    }

    pub fn from_be_bytes(bytes: [u8; 4]) -> Key {
        Key(bytes)
    }

    pub fn less_than(self, other: Key) -> bool {
        self < other
    }

    pub fn less_or_equal(self, other: Key) -> bool {
        self <= other
    }

    pub fn greater_than(self, other: Key) -> bool {
        self > other
    }

    pub fn greater_or_equal(self, other: Key) -> bool {
        self >= other
    }

    pub fn equal(self, other: Key) -> bool {
        self == other
    }

    /// Successor key. Equivalent to `plus(1)`.
    pub fn next(self) -> Key {
        self.plus(1)
    }

    /// `self + n`, as unsigned integer addition over the 32-bit value.
    ///
    /// Wraps past `u32::MAX`; callers are not expected to exercise
    /// `plus`/`next` anywhere near that boundary.
    pub fn plus(self, n: u32) -> Key {
        Key::from_u32(self.to_u32().wrapping_add(n))
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({:#010x})", self.to_u32())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.to_u32())
    }
}
