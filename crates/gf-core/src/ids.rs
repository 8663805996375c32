use core::fmt;
use core::num::NonZeroU32;

/// Compact, stable identifier used for buses and lines.
///
/// - `u32` keeps memory small
/// - `NonZero` enables `Option<Id>` to be pointer-optimized
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(NonZeroU32);

impl Id {
    /// Create an Id from a 0-based index by storing index+1.
    pub const fn from_index(index: u32) -> Self {
        match NonZeroU32::new(index.wrapping_add(1)) {
            Some(v) => Self(v),
            None => panic!("index+1 overflowed u32"),
        }
    }

    /// Recover the 0-based index.
    pub const fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// Recover the 0-based index as a `usize` for vector access.
    pub const fn as_usize(self) -> usize {
        self.index() as usize
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// Domain-specific ID aliases for clarity (no runtime cost).
pub type BusId = Id;
pub type LineId = Id;

/// The slack bus is always bus 0.
pub const SLACK_BUS: BusId = Id::from_index(0);
