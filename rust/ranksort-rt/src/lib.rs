//! Concurrent runtime for the ranksort distributed merge sort.
//!
//! Workers are OS threads with private data, connected only by message
//! passing: segments move between workers as owned payloads through the
//! [`transport`] layer, the recursive delegate/sort/merge state machine
//! lives in [`protocol`], and [`pool`] wires a fixed worker pool together
//! for one sort invocation.

pub mod pool;
pub mod protocol;
pub mod transport;

pub use pool::{sort, PoolConfig, SortRun};
