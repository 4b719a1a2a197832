//! Two-way merge of adjacent sorted runs.

use crate::error::SortError;
use crate::Value;

/// Merge `segment[..mid]` and `segment[mid..]`, each sorted ascending, into
/// one sorted run, in place.
///
/// A standard two-pointer linear merge through `scratch` (reused across
/// calls; grown on demand), copied back into `segment`. O(n) time, O(n)
/// auxiliary space. Ties take from the lower half first, so equal elements
/// drawn from the same half keep their relative order.
///
/// # Panics
///
/// Panics if `mid > segment.len()`.
pub fn merge_halves(
    segment: &mut [Value],
    mid: usize,
    scratch: &mut Vec<Value>,
) -> Result<(), SortError> {
    assert!(mid <= segment.len(), "split point {mid} out of bounds");
    if mid == 0 || mid == segment.len() {
        // One half is empty; the other is already the merged result.
        return Ok(());
    }

    scratch.clear();
    scratch
        .try_reserve_exact(segment.len())
        .map_err(|_| SortError::Allocation {
            elements: segment.len(),
        })?;

    let (mut i, mut j) = (0, mid);
    while i < mid && j < segment.len() {
        if segment[i] <= segment[j] {
            scratch.push(segment[i]);
            i += 1;
        } else {
            scratch.push(segment[j]);
            j += 1;
        }
    }
    scratch.extend_from_slice(&segment[i..mid]);
    scratch.extend_from_slice(&segment[j..]);

    segment.copy_from_slice(scratch);
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
