//! Core building blocks for the ranksort distributed merge sort.
//!
//! Everything in this crate is pure and transport-free: worker identities,
//! the delegation topologies, the two-way merge, the local fallback sort,
//! and the shared error type. The concurrent runtime lives in `ranksort-rt`.

pub mod error;
pub mod fallback;
pub mod merge;
pub mod rank;
pub mod topology;

pub use error::SortError;
pub use rank::Rank;
pub use topology::Topology;

/// The element type carried on the wire: a fixed-width signed integer.
pub type Value = i32;
