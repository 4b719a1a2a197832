//! The shared error type for a sort run.
//!
//! Every kind here is unrecoverable for the whole run: there is no local
//! retry and no degraded mode. Detection at any worker triggers a pool-wide
//! abort so that no worker is left blocked on a receive that will never
//! complete.

use crate::rank::Rank;

/// An unrecoverable failure of a sort run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SortError {
    /// Invalid startup configuration, or a worker invoked in the wrong role.
    #[error("configuration error: {0}")]
    Config(String),

    /// A segment or scratch buffer could not be reserved.
    #[error("allocation failure: could not reserve space for {elements} elements")]
    Allocation { elements: usize },

    /// A received frame did not match the expected sender/length/tag
    /// contract.
    #[error("protocol violation at {rank}: {detail}")]
    Protocol { rank: Rank, detail: String },

    /// The assembled result failed the total-order or length check.
    #[error("sort invariant violated: {detail}")]
    Invariant { detail: String },

    /// This worker was unwound because another worker failed first.
    #[error("aborted: {origin} failed: {reason}")]
    Aborted { origin: Rank, reason: String },

    /// A channel endpoint disappeared mid-run (its worker died without
    /// broadcasting an abort, e.g. it panicked).
    #[error("transport disconnected: {0}")]
    Disconnected(String),
}

impl SortError {
    /// Invariant failure: the element at `index` precedes a smaller one.
    pub fn unsorted_at(index: usize) -> Self {
        SortError::Invariant {
            detail: format!("element at index {index} is greater than its successor"),
        }
    }

    /// Invariant failure: elements were dropped or duplicated.
    pub fn length_changed(expected: usize, got: usize) -> Self {
        SortError::Invariant {
            detail: format!("output length {got} differs from input length {expected}"),
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
    fn display_names_the_condition() {
        let e = SortError::Config("array size must be positive".into());
        assert!(e.to_string().contains("configuration error"));

        let e = SortError::Allocation { elements: 1024 };
        assert!(e.to_string().contains("1024 elements"));

        let e = SortError::Protocol {
            rank: Rank::new(2),
            detail: "unexpected tag 7".into(),
        };
        assert!(e.to_string().contains("rank:2"));
        assert!(e.to_string().contains("unexpected tag 7"));

        let e = SortError::Aborted {
            origin: Rank::new(1),
            reason: "allocation failure".into(),
        };
        assert!(e.to_string().contains("rank:1"));
    }

    #[test]
    fn invariant_constructors() {
        assert!(SortError::unsorted_at(17).to_string().contains("index 17"));
        let e = SortError::length_changed(10, 9);
        assert!(e.to_string().contains("9"));
        assert!(e.to_string().contains("10"));
    }
}
