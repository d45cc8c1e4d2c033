//! Certificate and image verification: the chain of trust.
//!
//! Every entry point answers with a [`SecureBool`]; there is no error
//! type on this path. Anything unexpected, from an unreadable flash byte
//! to a malformed properties block, collapses to the fail-closed verdict.
use super::{
    certificate::{AppProperties, Certificate, PROPERTIES_STRUCT_VERSION},
    slot::SlotLayout,
};
use crate::{
    hal::{
        crypto::{PublicKey, SignatureBytes, SignatureCheck},
        flash::{RawRead, Read},
        rng::RandomSource,
        time::Delay,
    },
    secutils::{
        guard::{GlitchHandler, Guardian},
        memory::wipe,
        SecureBool,
    },
    utilities::memory::Region,
};
use core::{
    mem::size_of,
    ptr::{read_volatile, write_volatile},
};
use nb::block;
use sha2::{Digest, Sha256};

// Generic buffer for image bytes streamed out of flash while hashing.
const BUFFER_SIZE: usize = 256;

/// Borrows the flash, the signature engine and the guard capabilities for
/// the duration of one verification pass. The borrowed certificates and
/// properties live in flash and are never mutated.
pub struct SlotVerifier<'a, F, E, R, D, G>
where
    F: Read,
    E: SignatureCheck,
    R: RandomSource,
    D: Delay,
    G: GlitchHandler,
{
    pub flash: &'a mut F,
    pub engine: &'a mut E,
    pub guardian: &'a mut Guardian<R, D, G>,
}

impl<'a, F, E, R, D, G> SlotVerifier<'a, F, E, R, D, G>
where
    F: Read,
    E: SignatureCheck,
    R: RandomSource,
    D: Delay,
    G: GlitchHandler,
{
    /// Proves `candidate` was issued by the holder of `anchor`'s key.
    pub fn verify_certificate(
        &mut self,
        candidate: &Certificate,
        anchor: &Certificate,
    ) -> SecureBool {
        // A certificate older than the anchor is a downgrade of the
        // signing scheme itself; nothing further is worth checking.
        if candidate.version < anchor.version {
            return SecureBool::FALSE;
        }

        let mut signed = candidate.signed_bytes();
        let mut digest = Sha256::new();
        digest.update(&signed[..]);
        wipe(&mut signed);

        self.redundant_verify(&anchor.public_key, digest, &candidate.signature)
    }

    /// Proves `length` bytes of image at `image` were signed by the holder
    /// of `certificate`'s key. The chain to the anchor must already have
    /// been established through [`Self::verify_certificate`].
    pub fn verify_image(
        &mut self,
        certificate: &Certificate,
        image: F::Address,
        length: usize,
        signature: &SignatureBytes,
    ) -> SecureBool {
        if length == 0 {
            return SecureBool::FALSE;
        }

        let mut buffer = [0u8; BUFFER_SIZE];
        let mut digest = Sha256::new();
        let mut hashed = 0usize;
        while hashed < length {
            let chunk = (length - hashed).min(BUFFER_SIZE);
            if block!(self.flash.read(image + hashed, &mut buffer[..chunk])).is_err() {
                // An unreadable byte is an unverified byte.
                wipe(&mut buffer);
                return SecureBool::FALSE;
            }
            digest.update(&buffer[..chunk]);
            hashed += chunk;
        }
        wipe(&mut buffer);

        self.redundant_verify(&certificate.public_key, digest, signature)
    }

    /// Full verdict for one slot: structural sanity, then the chain
    /// anchor → certificate → image, failing closed at the first broken
    /// link. The properties copy is returned (when structurally readable)
    /// so the caller can build its boot candidate without re-reading.
    pub fn verify_slot(
        &mut self,
        anchor: &Certificate,
        layout: &SlotLayout<F::Address>,
    ) -> (SecureBool, Option<AppProperties>) {
        let flash_range = self.flash.range();

        // Every address the layout hands us must point into physical
        // flash before it is followed. RAM, peripheral space and
        // out-of-bounds ranges are attacker-reachable redirection targets.
        let layout_sound = layout.signing_size > 0
            && flash_range.contains_range(layout.properties, size_of::<AppProperties>())
            && flash_range.contains_range(layout.image, layout.signing_size)
            && flash_range.contains_range(layout.signature, size_of::<SignatureBytes>());
        if !layout_sound {
            return (SecureBool::FALSE, None);
        }

        // NOTE(Safety): padding-free repr(C) struct, bounds checked above,
        // for which any bit pattern is a valid value.
        let properties: AppProperties =
            match unsafe { block!(self.flash.read_raw(layout.properties)) } {
                Ok(properties) => properties,
                Err(_) => return (SecureBool::FALSE, None),
            };
        if !properties.magic_matches() || properties.struct_version != PROPERTIES_STRUCT_VERSION {
            return (SecureBool::FALSE, None);
        }

        let certificate_address = F::Address::from(properties.certificate_address);
        if !flash_range.contains_range(certificate_address, size_of::<Certificate>()) {
            return (SecureBool::FALSE, Some(properties));
        }
        // NOTE(Safety): as above; the certificate pointer has just been
        // bounds checked.
        let certificate: Certificate =
            match unsafe { block!(self.flash.read_raw(certificate_address)) } {
                Ok(certificate) => certificate,
                Err(_) => return (SecureBool::FALSE, Some(properties)),
            };

        let certificate_ok = self.verify_certificate(&certificate, anchor);
        if !self.guardian.confirms(|| certificate_ok.launder()) {
            return (SecureBool::FALSE, Some(properties));
        }

        let mut signature = [0u8; size_of::<SignatureBytes>()];
        if block!(self.flash.read(layout.signature, &mut signature)).is_err() {
            return (SecureBool::FALSE, Some(properties));
        }
        let image_ok =
            self.verify_image(&certificate, layout.image, layout.signing_size, &signature);
        wipe(&mut signature);
        if !self.guardian.confirms(|| image_ok.launder()) {
            return (SecureBool::FALSE, Some(properties));
        }

        // Admit only on the conjunction of both links, re-evaluated at
        // guard time.
        let verdict = self
            .guardian
            .fail_out(
                || {
                    SecureBool::from(
                        certificate_ok.launder().is_true() && image_ok.launder().is_true(),
                    )
                },
                || SecureBool::TRUE,
            )
            .unwrap_or(SecureBool::FALSE);
        (verdict, Some(properties))
    }

    /// Two independent engine transactions over identical inputs, with
    /// the verdict slot re-armed to the fail-closed sentinel in between.
    /// The guards around the callers only ever see the boolean outcome;
    /// this inner redundancy exists to catch a fault injected inside the
    /// signature routine itself, which those guards cannot see.
    fn redundant_verify(
        &mut self,
        key: &PublicKey,
        digest: Sha256,
        signature: &SignatureBytes,
    ) -> SecureBool {
        let mut verdict = SecureBool::FALSE.raw();

        let first = match block!(self.engine.verify(key, digest.clone(), signature)) {
            Ok(accepted) => accepted,
            Err(_) => return SecureBool::FALSE,
        };
        unsafe { write_volatile(&mut verdict, SecureBool::from(first).raw()) };

        // Re-arm to the closed state before the second transaction.
        unsafe { write_volatile(&mut verdict, SecureBool::FALSE.raw()) };

        let second = match block!(self.engine.verify(key, digest.clone(), signature)) {
            Ok(accepted) => accepted,
            Err(_) => return SecureBool::FALSE,
        };
        if first != second {
            // The engine contradicted itself over identical inputs: the
            // fingerprint of an injected fault, not of a bad signature.
            self.guardian.glitch_detected();
        }
        unsafe { write_volatile(&mut verdict, SecureBool::from(second).raw()) };

        let settled = SecureBool::from_raw(unsafe { read_volatile(&verdict) });
        self.guardian
            .fail_out(|| settled.launder(), || SecureBool::TRUE)
            .unwrap_or(SecureBool::FALSE)
    }
}
