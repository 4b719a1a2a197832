//! Delegation topologies.
//!
//! A topology decides, for a worker at a given recursion depth, which other
//! worker (if any) receives delegated work. Two addressing schemes are
//! supported:
//!
//! | Scheme      | Helper(s) of `rank` at depth `level`            |
//! |-------------|--------------------------------------------------|
//! | `Doubling`  | `rank + 2^level`, while it fits in the pool      |
//! | `HeapIndex` | `2*rank + 1` and `2*rank + 2`, while `< pool`    |
//!
//! The doubling scheme needs the pool to make every `rank + 2^level`
//! reachable for ranks that want to delegate; with an under-sized or
//! non-power-of-two pool some branches silently degrade into the local
//! fallback sort. The heap scheme imposes no shape requirement at all.
//!
//! Everything here is a pure function of its inputs and computes the same
//! answer on every worker.

use std::fmt;
use std::str::FromStr;

use crate::error::SortError;
use crate::rank::Rank;

/// Smallest non-negative `L` such that `2^L > rank`.
///
/// Under the doubling scheme this is the depth at which a freshly-activated
/// helper joins the recursion; it is monotonically non-decreasing in `rank`.
pub fn topmost_level(rank: Rank) -> u32 {
    let mut level = 0;
    while 1u64 << level <= rank.as_u64() {
        level += 1;
    }
    level
}

/// The doubling-scheme helper candidate `rank + 2^level`.
///
/// Returns `None` only on arithmetic overflow; the caller still has to check
/// the candidate against the highest rank in the pool.
pub fn doubling_helper(rank: Rank, level: u32) -> Option<Rank> {
    let stride = 1u64.checked_shl(level)?;
    let candidate = rank.as_u64().checked_add(stride)?;
    u32::try_from(candidate).ok().map(Rank::new)
}

/// The heap-scheme child candidates `(2*rank + 1, 2*rank + 2)`.
///
/// Returns `None` per side on arithmetic overflow; the caller checks each
/// side against the pool size independently; a worker may have zero, one,
/// or two valid children.
pub fn heap_children(rank: Rank) -> (Option<Rank>, Option<Rank>) {
    let base = rank.as_u64() * 2;
    let child = |n: u64| u32::try_from(n).ok().map(Rank::new);
    (child(base + 1), child(base + 2))
}

// ---------------------------------------------------------------------------
// Topology
// ---------------------------------------------------------------------------

/// Delegation targets for one midpoint split: at most one receiver per half.
///
/// A `None` half stays on the local worker (recursed or fallback-sorted,
/// depending on the scheme).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Targets {
    /// Receiver for the lower half `[0, len/2)`.
    pub lower: Option<Rank>,
    /// Receiver for the upper half `[len/2, len)`.
    pub upper: Option<Rank>,
}

/// The addressing scheme for delegated segments, chosen once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Topology {
    /// Single delegation per depth: helper is `rank + 2^level`.
    #[default]
    Doubling,
    /// Single fan-out per worker: children are `2*rank+1` and `2*rank+2`.
    HeapIndex,
}

impl Topology {
    /// Delegation targets for `rank` splitting a segment at depth `level`.
    ///
    /// Under `Doubling` the lower half always stays local and the upper half
    /// goes to the level helper when it exists in the pool. Under
    /// `HeapIndex` each half goes to the corresponding child when that child
    /// exists; `level` does not participate.
    pub fn targets(self, rank: Rank, level: u32, pool_size: usize) -> Targets {
        let in_pool = |r: Rank| r.as_usize() < pool_size;
        match self {
            Topology::Doubling => Targets {
                lower: None,
                upper: doubling_helper(rank, level).filter(|r| in_pool(*r)),
            },
            Topology::HeapIndex => {
                let (left, right) = heap_children(rank);
                Targets {
                    lower: left.filter(|r| in_pool(*r)),
                    upper: right.filter(|r| in_pool(*r)),
                }
            }
        }
    }

    /// Recursion depth at which a helper starts working on a received
    /// segment. Only the doubling scheme tracks depth.
    pub fn starting_level(self, rank: Rank) -> u32 {
        match self {
            Topology::Doubling => topmost_level(rank),
            Topology::HeapIndex => 0,
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topology::Doubling => f.write_str("doubling"),
            Topology::HeapIndex => f.write_str("heap"),
        }
    }
}

impl FromStr for Topology {
    type Err = SortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "doubling" => Ok(Topology::Doubling),
            "heap" => Ok(Topology::HeapIndex),
            other => Err(SortError::Config(format!(
                "unknown topology scheme `{other}` (expected `doubling` or `heap`)"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topmost_level_reference_values() {
        let cases = [(0, 0), (1, 1), (2, 2), (3, 2), (4, 3), (7, 3), (8, 4)];
        for (rank, level) in cases {
            assert_eq!(topmost_level(Rank::new(rank)), level, "rank {rank}");
        }
    }

    #[test]
    fn topmost_level_is_monotone() {
        let mut prev = topmost_level(Rank::new(0));
        for rank in 1..=256u32 {
            let level = topmost_level(Rank::new(rank));
            assert!(level >= prev, "level dropped at rank {rank}");
            prev = level;
        }
    }

    #[test]
    fn doubling_helper_strides() {
        assert_eq!(doubling_helper(Rank::new(0), 0), Some(Rank::new(1)));
        assert_eq!(doubling_helper(Rank::new(0), 1), Some(Rank::new(2)));
        assert_eq!(doubling_helper(Rank::new(0), 2), Some(Rank::new(4)));
        assert_eq!(doubling_helper(Rank::new(1), 1), Some(Rank::new(3)));
        assert_eq!(doubling_helper(Rank::new(3), 2), Some(Rank::new(7)));
    }

    #[test]
    fn doubling_helper_overflow_is_none() {
        assert_eq!(doubling_helper(Rank::new(u32::MAX), 0), None);
        assert_eq!(doubling_helper(Rank::new(0), 64), None);
    }

    #[test]
    fn heap_children_reference_values() {
        assert_eq!(
            heap_children(Rank::new(0)),
            (Some(Rank::new(1)), Some(Rank::new(2)))
        );
        assert_eq!(
            heap_children(Rank::new(1)),
            (Some(Rank::new(3)), Some(Rank::new(4)))
        );
        assert_eq!(
            heap_children(Rank::new(2)),
            (Some(Rank::new(5)), Some(Rank::new(6)))
        );
    }

    #[test]
    fn heap_targets_never_exceed_pool() {
        for pool_size in 1..=16usize {
            for rank in 0..pool_size as u32 {
                let t = Topology::HeapIndex.targets(Rank::new(rank), 0, pool_size);
                for child in [t.lower, t.upper].into_iter().flatten() {
                    assert!(child.as_usize() < pool_size);
                }
            }
        }
    }

    #[test]
    fn doubling_targets_respect_max_rank() {
        // Pool of 4: rank 0 delegates to 1, then 2, then 4, which is out of the pool.
        let pool = 4;
        let r0 = Rank::new(0);
        assert_eq!(
            Topology::Doubling.targets(r0, 0, pool).upper,
            Some(Rank::new(1))
        );
        assert_eq!(
            Topology::Doubling.targets(r0, 1, pool).upper,
            Some(Rank::new(2))
        );
        assert_eq!(Topology::Doubling.targets(r0, 2, pool).upper, None);
        // The lower half never leaves the worker under the doubling scheme.
        assert_eq!(Topology::Doubling.targets(r0, 0, pool).lower, None);
    }

    #[test]
    fn starting_level_per_scheme() {
        assert_eq!(Topology::Doubling.starting_level(Rank::new(5)), 3);
        assert_eq!(Topology::HeapIndex.starting_level(Rank::new(5)), 0);
    }

    #[test]
    fn parse_and_display_round_trip() {
        for scheme in [Topology::Doubling, Topology::HeapIndex] {
            let parsed: Topology = scheme.to_string().parse().unwrap();
            assert_eq!(parsed, scheme);
        }
        assert!("hypercube".parse::<Topology>().is_err());
    }
}
