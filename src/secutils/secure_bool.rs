//! Redundantly encoded boolean for security decisions.
use core::hint::black_box;
use static_assertions::const_assert;

/// Boolean encoded so a single flipped bit can never turn one truth value
/// into the other. The two encodings are eight-plus bits apart and are
/// deliberately not bitwise complements of each other.
///
/// Any value other than the two exact constants counts as `FALSE` for
/// admission decisions, and as anomalous for consistency checks. Only the
/// verifier and the slot selector produce these values; only the
/// [`Guardian`](super::guard::Guardian) primitives may consume them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(transparent)]
pub struct SecureBool(u32);

const_assert!((SecureBool::TRUE.0 ^ SecureBool::FALSE.0).count_ones() >= 8);
const_assert!(SecureBool::TRUE.0 ^ SecureBool::FALSE.0 != u32::MAX);

impl SecureBool {
    pub const TRUE: SecureBool = SecureBool(0x3CA5_965A);
    pub const FALSE: SecureBool = SecureBool(0xA5C3_5A3C);

    pub const fn raw(self) -> u32 { self.0 }

    pub const fn from_raw(raw: u32) -> SecureBool { SecureBool(raw) }

    /// Exact match against the `TRUE` encoding; everything else is denied.
    pub fn is_true(self) -> bool { self.0 == Self::TRUE.0 }

    /// Neither valid encoding: the trace of a corrupted decision.
    pub fn is_anomalous(self) -> bool { self.0 != Self::TRUE.0 && self.0 != Self::FALSE.0 }

    /// Opaque identity the optimizer cannot see through, so repeated
    /// evaluations of one value stay separate loads.
    pub fn launder(self) -> SecureBool { SecureBool(black_box(self.0)) }

    /// Mixes a witness value in. When the witness reads back as exactly
    /// `TRUE` this is the identity; a corrupted witness read degrades the
    /// result into an anomalous encoding instead of leaving it intact.
    pub fn mask(self, witness: SecureBool) -> SecureBool {
        SecureBool(self.0 ^ witness.0 ^ Self::TRUE.0)
    }
}

impl From<bool> for SecureBool {
    fn from(value: bool) -> Self {
        if value {
            SecureBool::TRUE
        } else {
            SecureBool::FALSE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_single_bit_flip_crosses_encodings() {
        for bit in 0..32 {
            let flipped = SecureBool::from_raw(SecureBool::TRUE.raw() ^ (1 << bit));
            assert!(!flipped.is_true());
            assert!(flipped.is_anomalous());
            let flipped = SecureBool::from_raw(SecureBool::FALSE.raw() ^ (1 << bit));
            assert!(flipped.is_anomalous());
        }
    }

    #[test]
    fn encodings_are_not_complements() {
        assert_ne!(SecureBool::TRUE.raw(), !SecureBool::FALSE.raw());
    }

    #[test]
    fn anything_but_true_is_denied() {
        assert!(SecureBool::TRUE.is_true());
        assert!(!SecureBool::FALSE.is_true());
        assert!(!SecureBool::from_raw(0).is_true());
        assert!(!SecureBool::from_raw(u32::MAX).is_true());
    }

    #[test]
    fn masking_with_a_true_witness_is_identity() {
        assert_eq!(SecureBool::TRUE.mask(SecureBool::TRUE), SecureBool::TRUE);
        assert_eq!(SecureBool::FALSE.mask(SecureBool::TRUE), SecureBool::FALSE);
    }

    #[test]
    fn masking_with_a_corrupted_witness_denies() {
        let corrupted = SecureBool::from_raw(SecureBool::TRUE.raw() ^ 0x10);
        assert!(!SecureBool::TRUE.mask(corrupted).is_true());
        assert!(SecureBool::TRUE.mask(corrupted).is_anomalous());
    }

    #[test]
    fn conversion_from_plain_bool() {
        assert_eq!(SecureBool::from(true), SecureBool::TRUE);
        assert_eq!(SecureBool::from(false), SecureBool::FALSE);
    }
}
