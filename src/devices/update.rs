//! Update-time re-verification.
//!
//! The firmware update transport stages bytes; this module decides. It
//! reuses the boot-time verification contract unchanged and layers the
//! update-only policies on top: strict version advance and product
//! identity. Rejecting a candidate here is the correct, non-exceptional
//! outcome of an update attempt, not a failure of the device.
use super::{
    certificate::{properties_magic, Certificate, PRODUCT_ID_LENGTH, PROPERTIES_MAGIC_LENGTH},
    secureboot::SlotVerifier,
    slot::SlotLayout,
};
use crate::{
    hal::{
        crypto::{SignatureBytes, SignatureCheck},
        flash::Read,
        rng::RandomSource,
        time::Delay,
    },
    secutils::{guard::GlitchHandler, memory::constant_time_compare, SecureBool},
};
use core::{cmp::Ordering, mem::size_of};
use nb::block;

// Scan buffer; overlapped by a magic's length so no window is skipped.
const SCAN_CHUNK: usize = 256;

impl<'a, F, E, R, D, G> SlotVerifier<'a, F, E, R, D, G>
where
    F: Read,
    E: SignatureCheck,
    R: RandomSource,
    D: Delay,
    G: GlitchHandler,
{
    /// Gate for committing a staged image as the new contents of the
    /// inactive slot. Runs the full boot-time chain against the staged
    /// layout, then enforces the update-only policies: the staged version
    /// must be *strictly* newer (a same-version "update" is rejected as a
    /// downgrade-equivalent no-op attack surface), and the image must
    /// belong to this product.
    pub fn verify_staged_slot(
        &mut self,
        anchor: &Certificate,
        staged: &SlotLayout<F::Address>,
        active_version: u32,
        product_id: &[u8; PRODUCT_ID_LENGTH],
    ) -> SecureBool {
        let (verdict, properties) = self.verify_slot(anchor, staged);
        if !self.guardian.confirms(|| verdict.launder()) {
            return SecureBool::FALSE;
        }
        let properties = match properties {
            Some(properties) => properties,
            None => return SecureBool::FALSE,
        };

        let strictly_newer = SecureBool::from(properties.app_version > active_version);
        let product_matches = SecureBool::from(
            constant_time_compare(&properties.product_id, product_id) == Ordering::Equal,
        );
        self.guardian
            .fail_out(
                || {
                    SecureBool::from(
                        strictly_newer.launder().is_true() && product_matches.launder().is_true(),
                    )
                },
                || SecureBool::TRUE,
            )
            .unwrap_or(SecureBool::FALSE)
    }

    /// Finds a properties block inside `[start, start + length)` by its
    /// magic bytes. Needed for bootloader images, whose properties offset
    /// is not fixed by the running bootloader's own layout.
    pub fn locate_properties(&mut self, start: F::Address, length: usize) -> Option<F::Address> {
        let magic = properties_magic();
        let mut buffer = [0u8; SCAN_CHUNK];
        let mut offset = 0usize;
        while offset + PROPERTIES_MAGIC_LENGTH <= length {
            let chunk = (length - offset).min(SCAN_CHUNK);
            block!(self.flash.read(start + offset, &mut buffer[..chunk])).ok()?;
            for window_start in 0..=(chunk - PROPERTIES_MAGIC_LENGTH) {
                if buffer[window_start..window_start + PROPERTIES_MAGIC_LENGTH] == magic {
                    return Some(start + (offset + window_start));
                }
            }
            // Overlap the tail so a magic straddling two chunks is seen.
            offset += chunk - (PROPERTIES_MAGIC_LENGTH - 1);
        }
        None
    }

    /// Post-write gate for a bootloader update: re-verifies the freshly
    /// written flash region itself, never the staged copy it came from.
    /// The properties block is located by scanning, since a new
    /// bootloader's layout is not necessarily the current one's.
    pub fn verify_bootloader_region(
        &mut self,
        anchor: &Certificate,
        start: F::Address,
        length: usize,
        signing_size: usize,
        active_version: u32,
        product_id: &[u8; PRODUCT_ID_LENGTH],
    ) -> SecureBool {
        if signing_size == 0 || signing_size + size_of::<SignatureBytes>() > length {
            return SecureBool::FALSE;
        }
        let properties = match self.locate_properties(start, length) {
            Some(address) => address,
            None => return SecureBool::FALSE,
        };
        let layout = SlotLayout {
            index: 0,
            image: start,
            boot: start,
            properties,
            signature: start + signing_size,
            signing_size,
        };
        self.verify_staged_slot(anchor, &layout, active_version, product_id)
    }
}
