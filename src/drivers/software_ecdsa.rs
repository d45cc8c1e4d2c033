//! Software P-256 signature engine.
//!
//! Fallback engine for parts without a usable crypto accelerator, and the
//! reference for what accelerator drivers must implement. Every call
//! rebuilds the verifying key and signature from their raw encodings, so
//! no transaction can observe another's half-initialized state.
use crate::hal::crypto::{PublicKey, SignatureBytes, SignatureCheck};
use core::convert::Infallible;
use ecdsa::signature::Signature as EcdsaSignature;
use p256::{
    ecdsa::{signature::DigestVerifier, Signature, VerifyingKey},
    EncodedPoint, FieldBytes,
};
use sha2::Sha256;

pub struct SoftwareEcdsa;

impl SignatureCheck for SoftwareEcdsa {
    type Error = Infallible;

    fn verify(
        &mut self,
        key: &PublicKey,
        digest: Sha256,
        signature: &SignatureBytes,
    ) -> nb::Result<bool, Self::Error> {
        let point = EncodedPoint::from_affine_coordinates(
            FieldBytes::from_slice(&key[..32]),
            FieldBytes::from_slice(&key[32..]),
            false,
        );
        // A key or signature that does not even decode verifies nothing.
        let verifying_key = match VerifyingKey::from_encoded_point(&point) {
            Ok(verifying_key) => verifying_key,
            Err(_) => return Ok(false),
        };
        let signature = match Signature::from_bytes(signature) {
            Ok(signature) => signature,
            Err(_) => return Ok(false),
        };
        Ok(verifying_key.verify_digest(digest, &signature).is_ok())
    }
}
