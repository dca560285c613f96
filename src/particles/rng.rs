const GAMMA: u64 = 0x9E37_79B9_7F4A_7C15;

/// SplitMix64 generator whose output is a pure function of `(seed, call index)`.
///
/// The state after `n` draws is `seed + n * GAMMA`, so seeking to any call index is O(1).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rng64 {
    seed: u64,
    state: u64,
    calls: u64,
}

impl Rng64 {
    /// Generator at call index 0.
    pub fn new(seed: u64) -> Self {
        Self::at(seed, 0)
    }

    /// Generator positioned as if `calls` values had already been drawn from `seed`.
    pub fn at(seed: u64, calls: u64) -> Self {
        Self {
            seed,
            state: seed.wrapping_add(GAMMA.wrapping_mul(calls)),
            calls,
        }
    }

    /// Seed of the stream.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Number of values drawn so far.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    /// Skip `n` draws without computing them.
    pub fn fast_forward(&mut self, n: u64) {
        *self = Self::at(self.seed, self.calls.wrapping_add(n));
    }

    /// Next raw value.
    pub fn next_u64(&mut self) -> u64 {
        self.calls = self.calls.wrapping_add(1);
        self.state = self.state.wrapping_add(GAMMA);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)` with 53 bits of precision.
    pub fn next_f64_01(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) * (1.0 / ((1u64 << 53) as f64))
    }

    /// Uniform in `[-1, 1)`.
    pub fn next_signed(&mut self) -> f64 {
        self.next_f64_01() * 2.0 - 1.0
    }
}
