//! Deterministic hashing utilities.
//!
//! `std::collections::hash_map::DefaultHasher` is randomly seeded per process, so two
//! participants hashing the same player id would disagree. Arsonist selection folds id
//! hashes into its PRNG seed, which only works if every participant computes the same
//! hash. The hashers here use FNV-1a with fixed constants.
//!
//! # Usage
//!
//! ```
//! use arson_mode::hash::{str_hash, DeterministicHasher};
//! use std::hash::Hasher;
//!
//! let mut hasher = DeterministicHasher::new();
//! hasher.write(b"player-7");
//! assert_eq!(hasher.finish(), str_hash("player-7"));
//! ```
//!
//! FNV-1a is NOT cryptographically secure. It is only used to derive a shared seed.

use std::hash::Hasher;

/// FNV-1a 64-bit offset basis constant.
const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime constant.
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// A deterministic hasher using the FNV-1a algorithm.
///
/// Produces the same output across processes, platforms, and runs.
#[derive(Debug, Clone)]
pub struct DeterministicHasher {
    state: u64,
}

impl DeterministicHasher {
    /// Creates a new `DeterministicHasher` with the standard FNV-1a offset basis.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: FNV_OFFSET_BASIS,
        }
    }
}

impl Default for DeterministicHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher for DeterministicHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.state ^= u64::from(byte);
            self.state = self.state.wrapping_mul(FNV_PRIME);
        }
    }
}

/// Computes the FNV-1a hash of a string's UTF-8 bytes.
///
/// No length prefix or terminator is mixed in, so the result matches any other
/// FNV-1a implementation fed the same bytes.
///
/// # Example
///
/// ```
/// use arson_mode::hash::str_hash;
///
/// // Known FNV-1a 64 test vector
/// assert_eq!(str_hash("a"), 0xaf63_dc4c_8601_ec8c);
/// ```
#[inline]
#[must_use]
pub fn str_hash(value: &str) -> u64 {
    let mut hasher = DeterministicHasher::new();
    hasher.write(value.as_bytes());
    hasher.finish()
}
