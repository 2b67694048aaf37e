//! PCG32 generator used for the seeded arsonist draw.
//!
//! Every participant seeds the generator with the same value and draws the same
//! sequence, so the implementation is fixed here rather than delegated to a crate
//! whose algorithm could change between versions.
//!
//! # Usage
//!
//! ```rust
//! use arson_mode::rng::{Pcg32, Rng, SeedableRng};
//!
//! let mut a = Pcg32::seed_from_u64(12345);
//! let mut b = Pcg32::seed_from_u64(12345);
//! assert_eq!(a.gen_range_usize(0..10), b.gen_range_usize(0..10));
//! ```

use crate::{
    report_violation,
    telemetry::{ViolationKind, ViolationSeverity},
};

/// PCG32 random number generator (PCG-XSH-RR, 64-bit state).
///
/// NOT cryptographically secure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pcg32 {
    state: u64,
    inc: u64,
}

/// Default stream for single-stream PCG32.
const PCG_DEFAULT_INCREMENT: u64 = 1442695040888963407;

/// LCG multiplier for 64-bit state PCG.
const PCG_MULTIPLIER: u64 = 6364136223846793005;

impl Pcg32 {
    /// Creates a generator from an initial state and a stream selector.
    #[must_use]
    pub const fn new(state: u64, stream: u64) -> Self {
        let inc = (stream << 1) | 1;
        let mut pcg = Self { state: 0, inc };
        pcg.state = pcg.state.wrapping_mul(PCG_MULTIPLIER).wrapping_add(pcg.inc);
        pcg.state = pcg.state.wrapping_add(state);
        pcg.state = pcg.state.wrapping_mul(PCG_MULTIPLIER).wrapping_add(pcg.inc);
        pcg
    }

    /// Generates the next 32-bit value.
    #[inline]
    #[must_use]
    pub fn next_u32(&mut self) -> u32 {
        let old_state = self.state;
        self.state = old_state
            .wrapping_mul(PCG_MULTIPLIER)
            .wrapping_add(self.inc);
        let xorshifted = (((old_state >> 18) ^ old_state) >> 27) as u32;
        let rot = (old_state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }

    /// Generates the next 64-bit value from two 32-bit draws (high word first).
    #[inline]
    #[must_use]
    pub fn next_u64(&mut self) -> u64 {
        let high = u64::from(self.next_u32());
        let low = u64::from(self.next_u32());
        (high << 32) | low
    }
}

/// Construction from a 64-bit seed.
pub trait SeedableRng: Sized {
    /// Creates a generator seeded from `seed`. Equal seeds yield equal sequences.
    #[must_use]
    fn seed_from_u64(seed: u64) -> Self;
}

impl SeedableRng for Pcg32 {
    fn seed_from_u64(seed: u64) -> Self {
        Self::new(seed, PCG_DEFAULT_INCREMENT)
    }
}

/// Range sampling on top of a raw 32/64-bit source.
pub trait Rng {
    /// Returns the next 32-bit value.
    fn next_u32(&mut self) -> u32;

    /// Returns the next 64-bit value.
    fn next_u64(&mut self) -> u64;

    /// Draws a `usize` uniformly from `[range.start, range.end)` using rejection sampling.
    ///
    /// # Empty Range Behavior
    /// If the range is empty, reports a violation and returns `range.start`.
    fn gen_range_usize(&mut self, range: std::ops::Range<usize>) -> usize {
        if range.start >= range.end {
            report_violation!(
                ViolationSeverity::Error,
                ViolationKind::Selection,
                "gen_range_usize called with empty range [{}..{})",
                range.start,
                range.end
            );
            return range.start;
        }
        let span = range.end - range.start;

        if span <= u32::MAX as usize {
            let span32 = span as u32;
            let threshold = span32.wrapping_neg() % span32;
            loop {
                let value = self.next_u32();
                if value >= threshold {
                    return range.start + (value % span32) as usize;
                }
            }
        } else {
            let span64 = span as u64;
            let threshold = span64.wrapping_neg() % span64;
            loop {
                let value = self.next_u64();
                if value >= threshold {
                    return range.start + (value % span64) as usize;
                }
            }
        }
    }
}

impl Rng for Pcg32 {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        Self::next_u32(self)
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        Self::next_u64(self)
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Pcg32::seed_from_u64(7);
        let mut b = Pcg32::seed_from_u64(7);
        for _ in 0..256 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    // Guards against accidental algorithm changes: a different sequence would pick a
    // different arsonist than peers on an older build.
    #[test]
    fn seed_zero_sequence_is_stable() {
        let mut rng = Pcg32::seed_from_u64(0);
        let expected = [
            0x348a463f_u32,
            0x4f205a1b_u32,
            0x2946c488_u32,
            0x805e36de_u32,
            0x79f994a9_u32,
        ];
        for &value in &expected {
            assert_eq!(rng.next_u32(), value);
        }
    }

    #[test]
    fn gen_range_usize_stays_in_bounds() {
        let mut rng = Pcg32::seed_from_u64(42);
        for upper in 1..40 {
            for _ in 0..50 {
                assert!(rng.gen_range_usize(0..upper) < upper);
            }
        }
    }

    #[test]
    fn single_element_range_returns_start() {
        let mut rng = Pcg32::seed_from_u64(3);
        assert_eq!(rng.gen_range_usize(5..6), 5);
    }

    #[test]
    fn empty_range_returns_start() {
        let mut rng = Pcg32::seed_from_u64(3);
        assert_eq!(rng.gen_range_usize(4..4), 4);
    }

    #[test]
    fn every_index_is_reachable() {
        let mut rng = Pcg32::seed_from_u64(99);
        let mut seen = [false; 6];
        for _ in 0..500 {
            seen[rng.gen_range_usize(0..6)] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }
}
