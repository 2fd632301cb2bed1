//! Strongly-typed bowl identifier.

use std::fmt;

/// Identifies one feeding bowl.
///
/// Bowls are numbered from 1 at the arbiter boundary: a pool of `n` bowls
/// accepts `BowlId(1)` through `BowlId(n)`. `BowlId(0)` is representable
/// but always out of range. The arbiter stores occupancy 0-based; the only
/// place the two numbering schemes meet is [`BowlId::index`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BowlId(pub u32);

impl BowlId {
    /// Translate to a 0-based slot index for a pool of `bowl_count` bowls.
    ///
    /// Returns `None` when the id lies outside `[1, bowl_count]`.
    pub fn index(self, bowl_count: usize) -> Option<usize> {
        let n = self.0 as usize;
        if n == 0 || n > bowl_count {
            None
        } else {
            Some(n - 1)
        }
    }

    /// Inverse of [`index`](Self::index): the bowl stored at 0-based `slot`.
    ///
    /// # Panics
    ///
    /// Panics if `slot + 1` does not fit in a `u32`.
    pub fn from_index(slot: usize) -> Self {
        let n = u32::try_from(slot + 1).expect("bowl slot exceeds u32::MAX");
        Self(n)
    }
}

impl fmt::Display for BowlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for BowlId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
