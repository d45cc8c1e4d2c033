//! Signature verification engine interface.
//!
//! The asymmetric mathematics live behind this seam, whether they run on a
//! secure element, a crypto accelerator or in software. Implementations
//! must construct a fresh command context per call; the engine is not
//! reentrant and no call may observe another call's half-initialized state.
use core::fmt;
use sha2::Sha256;

/// Raw P-256 public key: big endian x coordinate followed by y.
pub type PublicKey = [u8; 64];

/// Raw P-256 signature: big endian r followed by s.
pub type SignatureBytes = [u8; 64];

pub trait SignatureCheck {
    type Error: Clone + Copy + fmt::Debug;

    /// Runs one complete verification transaction: `true` means the
    /// signature over the (unfinalized) digest checks out against the key.
    /// The digest is taken by value so repeated transactions cannot share
    /// hashing state.
    fn verify(
        &mut self,
        key: &PublicKey,
        digest: Sha256,
        signature: &SignatureBytes,
    ) -> nb::Result<bool, Self::Error>;
}
