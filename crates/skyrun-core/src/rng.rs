use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of the random draws used by world generation.
///
/// Generation only ever asks for "a value in this inclusive range", so
/// tests can substitute a scripted source and assert exact geometry.
pub trait RandomSource {
    /// Next value in `[min, max]`. Callers guarantee `min <= max`.
    fn next_in_range(&mut self, min: f32, max: f32) -> f32;
}

/// Seeded `StdRng`. The same seed always produces the same world.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    seed: u64,
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Use `seed` if given, otherwise draw one from the OS.
    pub fn from_optional_seed(seed: Option<u64>) -> Self {
        Self::new(seed.unwrap_or_else(rand::random))
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }
}

impl RandomSource for SeededRandom {
    fn next_in_range(&mut self, min: f32, max: f32) -> f32 {
        if max <= min {
            return min;
        }
        self.rng.random_range(min..=max)
    }
}
