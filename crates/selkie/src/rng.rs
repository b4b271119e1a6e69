use crate::coords::Coords;

/// Seeded xorshift64* generator. All random placement goes through one of these so that a run
/// is reproducible from `EmbeddingOptions::random_seed`.
#[derive(Debug, Clone)]
pub(crate) struct XorShift64Star {
    state: u64,
}

impl XorShift64Star {
    pub(crate) fn new(seed: u64) -> Self {
        // Zero is a fixed point of the xorshift step.
        Self { state: seed.max(1) }
    }

    pub(crate) fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D_u64)
    }

    /// Uniform in `[-1, 1)` with 53 bits of precision.
    pub(crate) fn next_f64_signed(&mut self) -> f64 {
        let u = self.next_u64() >> 11;
        let v = (u as f64) / ((1u64 << 53) as f64);
        (v * 2.0) - 1.0
    }

    /// A point drawn uniformly from `[-1, +1]^dimensions`.
    pub(crate) fn random_coords(&mut self, dimensions: usize) -> Coords {
        Coords::from_vec((0..dimensions).map(|_| self.next_f64_signed()).collect())
    }
}
