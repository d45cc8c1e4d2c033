//! Secure memory handling: zeroization and data-independent comparison.
use core::cmp::Ordering;
use zeroize::Zeroize;

/// Wipes a buffer through the zeroization machinery, which writes through
/// volatile pointers the compiler may not elide as dead stores. Required
/// after every use of key material or seed bytes.
pub fn wipe(bytes: &mut [u8]) { bytes.zeroize(); }

/// Three-way comparison whose timing does not depend on the content of
/// either buffer: the full common length is always walked, with no early
/// exit on the first mismatch. Lengths are treated as public and only
/// break ties once the contents compare equal.
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> Ordering {
    let mut greater: u32 = 0;
    let mut less: u32 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        let x = u32::from(*x);
        let y = u32::from(*y);
        // Once decided, later bytes must not override the verdict.
        let undecided = 1 ^ (greater | less);
        greater |= ((y.wrapping_sub(x) >> 8) & 1) & undecided;
        less |= ((x.wrapping_sub(y) >> 8) & 1) & undecided;
    }
    match (greater != 0, less != 0) {
        (true, _) => Ordering::Greater,
        (_, true) => Ordering::Less,
        _ => a.len().cmp(&b.len()),
    }
}
