//! Injectable randomness.
//!
//! The heuristic classifier and the probe's synthetic fallback both
//! draw randomness; routing it through a trait keeps those paths
//! deterministic under test.

use rand::Rng;

/// Source of randomness for heuristic decisions.
pub trait RandomSource: Send + Sync {
    /// Return true with the given probability (0.0 to 1.0).
    fn chance(&self, probability: f64) -> bool;

    /// Uniform value in [lo, hi).
    fn range_f64(&self, lo: f64, hi: f64) -> f64;

    /// Uniform value in [lo, hi).
    fn range_u32(&self, lo: u32, hi: u32) -> u32;
}

/// Thread-local RNG, the production source.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn chance(&self, probability: f64) -> bool {
        rand::rng().random_bool(probability.clamp(0.0, 1.0))
    }

    fn range_f64(&self, lo: f64, hi: f64) -> f64 {
        rand::rng().random_range(lo..hi)
    }

    fn range_u32(&self, lo: u32, hi: u32) -> u32 {
        rand::rng().random_range(lo..hi)
    }
}

/// Fixed source: every chance resolves to a preset outcome, every range
/// returns its lower bound. Used by tests and by deployments that want
/// the heuristic noise disabled.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom {
    /// Outcome of every `chance` call
    pub chance_outcome: bool,
}

impl FixedRandom {
    /// A source that never flags.
    pub fn never() -> Self {
        Self {
            chance_outcome: false,
        }
    }

    /// A source that always flags.
    pub fn always() -> Self {
        Self {
            chance_outcome: true,
        }
    }
}

impl RandomSource for FixedRandom {
    fn chance(&self, _probability: f64) -> bool {
        self.chance_outcome
    }

    fn range_f64(&self, lo: f64, _hi: f64) -> f64 {
        lo
    }

    fn range_u32(&self, lo: u32, _hi: u32) -> u32 {
        lo
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_random_is_deterministic() {
        let never = FixedRandom::never();
        assert!(!never.chance(0.99));
        assert_eq!(never.range_f64(0.85, 0.99), 0.85);
        assert_eq!(never.range_u32(30, 630), 30);

        let always = FixedRandom::always();
        assert!(always.chance(0.01));
    }

    #[test]
    fn test_thread_random_ranges() {
        let r = ThreadRandom;
        for _ in 0..100 {
            let v = r.range_f64(0.75, 0.95);
            assert!((0.75..0.95).contains(&v));
            let u = r.range_u32(30, 630);
            assert!((30..630).contains(&u));
        }
        assert!(!r.chance(0.0));
        assert!(r.chance(1.0));
    }
}
