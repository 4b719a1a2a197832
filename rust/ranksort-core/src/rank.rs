//! Worker identities.
//!
//! Every participant in a sort run is identified by a [`Rank`] in
//! `[0, pool_size)`, fixed for the lifetime of the run. Rank 0 is the
//! coordinator; every other rank is a helper.

use std::fmt;

/// A worker's identity within the pool.
///
/// Ranks are plain integers, cheap to copy and compare. No two workers in
/// one pool share a rank.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rank(u32);

impl Rank {
    /// The coordinator's rank. Exactly one worker per pool holds it.
    pub const COORDINATOR: Rank = Rank(0);

    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Return the raw numeric value.
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Raw value widened for overflow-safe address arithmetic.
    pub const fn as_u64(self) -> u64 {
        self.0 as u64
    }

    /// Raw value as an index into per-worker tables.
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    /// Whether this rank plays the coordinator role.
    pub const fn is_coordinator(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for Rank {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rank({})", self.0)
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rank:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinator_is_rank_zero() {
        assert!(Rank::COORDINATOR.is_coordinator());
        assert!(Rank::new(0).is_coordinator());
        assert!(!Rank::new(1).is_coordinator());
        assert!(!Rank::new(7).is_coordinator());
    }

    #[test]
    fn ranks_order_by_value() {
        let a = Rank::new(1);
        let b = Rank::new(2);
        assert!(a < b);
        assert_ne!(a, b);
        assert_eq!(Rank::new(2), b);
    }

    #[test]
    fn display_and_debug() {
        let r = Rank::new(3);
        assert_eq!(r.to_string(), "rank:3");
        assert_eq!(format!("{:?}", r), "Rank(3)");
    }

    #[test]
    fn conversions_round_trip() {
        let r = Rank::from(9u32);
        assert_eq!(r.as_u32(), 9);
        assert_eq!(r.as_u64(), 9);
        assert_eq!(r.as_usize(), 9);
    }
}
