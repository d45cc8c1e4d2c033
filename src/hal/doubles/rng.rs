use crate::hal::rng::RandomSource;

/// Deterministic xorshift source. Good enough to drive jitter in tests
/// while keeping them reproducible.
pub struct FakeRng(u32);

impl FakeRng {
    pub fn new(seed: u32) -> Self { FakeRng(if seed == 0 { 0xBAD_5EED } else { seed }) }
}

impl Default for FakeRng {
    fn default() -> Self { FakeRng::new(0x1234_5678) }
}

impl RandomSource for FakeRng {
    fn random(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }
}
