use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// The randomness seam behind the stability test: "a freshly drawn uniform
/// random value in `[0, 1)`". Abstracted so tests can drive the
/// deep-skip/recompute decision deterministically.
pub trait StabilitySource {
    fn next_f64(&mut self) -> f64;
}

/// Default production source: a small, fast, non-cryptographic RNG seeded
/// from the OS on construction. Determinism is not a contract for this
/// source.
pub struct OsEntropySource {
    rng: SmallRng,
}

impl OsEntropySource {
    pub fn new() -> Self {
        OsEntropySource {
            rng: SmallRng::from_entropy(),
        }
    }
}

impl Default for OsEntropySource {
    fn default() -> Self {
        Self::new()
    }
}

impl StabilitySource for OsEntropySource {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen_range(0.0..1.0)
    }
}

/// Test double: always returns the same value.
pub struct FixedSource(pub f64);

impl StabilitySource for FixedSource {
    fn next_f64(&mut self) -> f64 {
        self.0
    }
}

/// Test double: replays a fixed sequence of values, cycling once exhausted.
pub struct SequenceSource {
    values: Vec<f64>,
    next: usize,
}

impl SequenceSource {
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "SequenceSource needs at least one value");
        SequenceSource { values, next: 0 }
    }
}

impl StabilitySource for SequenceSource {
    fn next_f64(&mut self) -> f64 {
        let value = self.values[self.next % self.values.len()];
        self.next += 1;
        value
    }
}
