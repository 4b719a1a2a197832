//! Shared helpers for the ranksort benchmarks.

use ranksort_core::Value;

/// Deterministic xorshift32 input, values reduced modulo the length.
pub fn scrambled(len: usize, seed: u32) -> Vec<Value> {
    let modulus = len.clamp(1, i32::MAX as usize) as u32;
    let mut state = seed.max(1);
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state % modulus) as Value
        })
        .collect()
}
