//! Masked execution counter for do-exactly-once bracketing.
use core::ptr::{read_volatile, write_volatile};

const MASK: u32 = 0x5A5A_A5A5;

/// Step counter kept as a value and an XOR-masked shadow that advance
/// together through volatile writes. A fault that touches one half leaves
/// the pair decodable as corrupt; a skipped or repeated advance is caught
/// by comparing the decoded count against the expected number of steps.
pub struct StepCounter {
    value: u32,
    shadow: u32,
}

impl Default for StepCounter {
    fn default() -> Self { StepCounter { value: 0, shadow: MASK } }
}

impl StepCounter {
    pub fn advance(&mut self) {
        // NOTE(Safety): plain stack fields, written volatilely so the pair
        // cannot be collapsed into a single combined update.
        unsafe {
            let next = read_volatile(&self.value).wrapping_add(1);
            write_volatile(&mut self.value, next);
            write_volatile(&mut self.shadow, next ^ MASK);
        }
    }

    /// The two halves still agree.
    pub fn is_valid(&self) -> bool {
        unsafe { read_volatile(&self.value) == read_volatile(&self.shadow) ^ MASK }
    }

    pub fn count(&self) -> u32 {
        unsafe { read_volatile(&self.value) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_fresh_counter_is_valid_at_zero() {
        let counter = StepCounter::default();
        assert!(counter.is_valid());
        assert_eq!(counter.count(), 0);
    }

    #[test]
    fn advancing_counts_steps() {
        let mut counter = StepCounter::default();
        counter.advance();
        assert!(counter.is_valid());
        assert_eq!(counter.count(), 1);
        counter.advance();
        assert_eq!(counter.count(), 2);
    }

    #[test]
    fn corruption_of_either_half_is_visible() {
        let mut counter = StepCounter::default();
        counter.advance();
        counter.value ^= 0x4;
        assert!(!counter.is_valid());

        let mut counter = StepCounter::default();
        counter.advance();
        counter.shadow ^= 0x4000_0000;
        assert!(!counter.is_valid());
    }
}
