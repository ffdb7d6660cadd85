//! Random draws for jitter and probabilistic injections.

use std::sync::Mutex;

use rand::rngs::OsRng;
use rand::Rng;

/// Uniform integer source used by the cadence planner and executor.
pub trait RandomSource: Send + Sync {
    /// Uniform draw in `[0, bound)`. Returns 0 when `bound` is 0.
    fn below(&self, bound: u64) -> u64;

    /// Uniform draw in `[lo, hi]` (inclusive).
    fn between(&self, lo: i64, hi: i64) -> i64 {
        if hi <= lo {
            return lo;
        }
        let span = hi.abs_diff(lo).saturating_add(1);
        lo.saturating_add_unsigned(self.below(span))
    }
}

/// Operating-system CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn below(&self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        let mut rng = OsRng;
        rng.gen_range(0..bound)
    }
}

/// Replays a fixed sequence of draws, cycling when exhausted.
///
/// Each value is clamped into the requested range, so `u64::MAX` always
/// yields the top of the range and `0` the bottom.
#[derive(Debug)]
pub struct SequenceRandom {
    values: Vec<u64>,
    cursor: Mutex<usize>,
}

impl SequenceRandom {
    pub fn new(values: Vec<u64>) -> Self {
        Self {
            values,
            cursor: Mutex::new(0),
        }
    }

    /// Every draw returns `value` (clamped).
    pub fn constant(value: u64) -> Self {
        Self::new(vec![value])
    }
}

impl RandomSource for SequenceRandom {
    fn below(&self, bound: u64) -> u64 {
        if bound == 0 || self.values.is_empty() {
            return 0;
        }
        let mut cursor = self.cursor.lock().unwrap_or_else(|e| e.into_inner());
        let value = self.values[*cursor % self.values.len()];
        *cursor += 1;
        value.min(bound - 1)
    }
}
