//! Injectable random sources for server selection
//!
//! Selection never reaches for a process-wide generator: callers hand a
//! `RandomSource` in, so a fixed seed gives a reproducible pick.

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

/// Trait for random number generation.
pub trait RandomSource {
    fn next_u64(&mut self) -> u64;

    /// Uniform-ish index in `0..len`. `len` must be non-zero.
    fn next_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        (self.next_u64() % len as u64) as usize
    }
}

/// SplitMix64 PRNG - fast, good quality, no external dependencies.
#[derive(Debug, Clone, Copy)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }
}

impl RandomSource for SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        // splitmix64 reference implementation
        self.state = self.state.wrapping_add(0x9E3779B97F4A7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
        z ^ (z >> 31)
    }
}

impl RandomSource for StdRng {
    fn next_u64(&mut self) -> u64 {
        RngCore::next_u64(self)
    }
}

/// OS-seeded source for production use
pub fn from_entropy() -> StdRng {
    StdRng::from_entropy()
}

/// Seeded source for reproducible runs
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}
