//! Random source interface, used to draw timing jitter.
pub trait RandomSource {
    fn random(&mut self) -> u32;
}
