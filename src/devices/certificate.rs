//! Chain-of-trust data structures.
//!
//! Both links of the chain use the same certificate layout: the trust
//! anchor baked into the bootloader image, and the per-application
//! certificate stored alongside each image. The anchor is the root of
//! trust and is never itself verified against anything.
use crate::hal::crypto::{PublicKey, SignatureBytes};
use core::mem::size_of;
use static_assertions::const_assert_eq;

/// Fixed-layout certificate as it lives in flash.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Certificate {
    /// Signing scheme version, monotonically increasing. An application
    /// certificate may never be older than the anchor it chains to.
    pub version: u32,
    pub public_key: PublicKey,
    /// Covers every preceding field; verifies against the issuer's key.
    pub signature: SignatureBytes,
}

const_assert_eq!(size_of::<Certificate>(), 132);

/// Length of the certificate prefix covered by its signature.
pub const CERTIFICATE_SIGNED_LENGTH: usize = 68;

impl Certificate {
    /// Every field but the trailing signature, in flash byte order.
    pub fn signed_bytes(&self) -> [u8; CERTIFICATE_SIGNED_LENGTH] {
        let mut bytes = [0u8; CERTIFICATE_SIGNED_LENGTH];
        bytes[..4].copy_from_slice(&self.version.to_le_bytes());
        bytes[4..].copy_from_slice(&self.public_key);
        bytes
    }
}

pub const PROPERTIES_MAGIC_LENGTH: usize = 16;

/// Bytewise inversion of the on-flash properties magic.
///
/// Note: Why inverted? Because if we kept it as-is, this code (and any
/// image containing it) would itself match a properties scan, as it
/// carries the magic bytes halfway through.
const PROPERTIES_MAGIC_INVERTED: [u8; PROPERTIES_MAGIC_LENGTH] = [
    0xBD, 0xB3, 0xA8, 0xB4, 0xD2, 0xBE, 0xAF, 0xAF, 0xD2, 0xAF, 0xAD, 0xB0, 0xAF, 0xAC, 0xD2,
    0xCE,
];

/// The magic bytes as they appear at the head of a properties block.
pub fn properties_magic() -> [u8; PROPERTIES_MAGIC_LENGTH] {
    let mut magic = [0u8; PROPERTIES_MAGIC_LENGTH];
    for (out, byte) in magic.iter_mut().zip(PROPERTIES_MAGIC_INVERTED.iter()) {
        *out = !*byte;
    }
    magic
}

/// Layout revision of [`AppProperties`] this bootloader understands.
pub const PROPERTIES_STRUCT_VERSION: u32 = 1;

pub const PRODUCT_ID_LENGTH: usize = 16;

/// Application metadata block stored at a discoverable offset inside a
/// flash slot. Owned by the flash image; read-only at runtime.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppProperties {
    pub magic: [u8; PROPERTIES_MAGIC_LENGTH],
    pub struct_version: u32,
    pub app_version: u32,
    pub product_id: [u8; PRODUCT_ID_LENGTH],
    /// Flash address of the application certificate. Must be bounds
    /// checked against the physical flash range before it is followed.
    pub certificate_address: u32,
}

const_assert_eq!(size_of::<AppProperties>(), 44);

impl AppProperties {
    pub fn magic_matches(&self) -> bool { self.magic == properties_magic() }
}

impl Default for AppProperties {
    /// All-zero block: recognizably invalid, used as the placeholder for
    /// slots that failed structural checks.
    fn default() -> Self {
        AppProperties {
            magic: [0u8; PROPERTIES_MAGIC_LENGTH],
            struct_version: 0,
            app_version: 0,
            product_id: [0u8; PRODUCT_ID_LENGTH],
            certificate_address: 0,
        }
    }
}
