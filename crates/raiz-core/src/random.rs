//! Random sources
//!
//! Everything random in the substrate (node choice, TRON attributes,
//! auto-spawn coin flips) is drawn through [`RandomSource`], so tests can
//! replay exact sequences and hit domain boundaries on purpose.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::{Valor, FREQUENCIA_RANGE, POTENCIA_RANGE, TTL_RANGE_SECONDS};

/// Source of uniform samples in `[0, 1)`
///
/// Implementors only provide [`next_unit`](RandomSource::next_unit); the
/// attribute samplers are derived from it. Samples outside `[0, 1)` are
/// clamped by the index-based helpers.
pub trait RandomSource {
    /// Next uniform sample in `[0, 1)`
    fn next_unit(&mut self) -> f64;

    /// Uniform index in `0..len`. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0, "pick_index over an empty range");
        let raw = (self.next_unit().max(0.0) * len as f64) as usize;
        raw.min(len.saturating_sub(1))
    }

    /// `true` with probability `p`
    fn chance(&mut self, p: f64) -> bool {
        self.next_unit() < p
    }

    /// Uniform over {-1, 0, 1}
    fn valor(&mut self) -> Valor {
        Valor::ALL[self.pick_index(Valor::ALL.len())]
    }

    /// Uniform in `[0.1, 10.0)`
    fn potencia(&mut self) -> f64 {
        let (lo, hi) = POTENCIA_RANGE;
        self.next_unit() * (hi - lo) + lo
    }

    /// Uniform in `[1, 50)`
    fn frequencia(&mut self) -> f64 {
        let (lo, hi) = FREQUENCIA_RANGE;
        self.next_unit() * (hi - lo) + lo
    }

    /// Uniform integer in `[10, 30]`
    fn ttl_seconds(&mut self) -> u32 {
        let (lo, hi) = TTL_RANGE_SECONDS;
        let span = (hi - lo + 1) as usize;
        lo + self.pick_index(span) as u32
    }
}

/// Seeded, reproducible source backed by `StdRng`
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        SeededRandom {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seed from OS entropy
    pub fn from_entropy() -> Self {
        SeededRandom {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}
