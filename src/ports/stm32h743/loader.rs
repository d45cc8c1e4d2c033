//! Loader construction for the STM32H743 based wallet main board.
use crate::{
    devices::{certificate::Certificate, loader::Loader, slot::SlotLayout},
    drivers::{
        cortex::{CortexJump, CycleDelay, ScbReset},
        mcu_flash::{Address, McuFlash},
        software_ecdsa::SoftwareEcdsa,
        xoroshiro::Xoroshiro64,
    },
    hal::time::U32Ext,
    secutils::{guard::ResetOnGlitch, Guardian},
};
use core::ptr::read_volatile;

// Physical flash range of the part (2 MB, two banks).
const FLASH_START: u32 = 0x0800_0000;
const FLASH_END: u32 = 0x0820_0000;

// 96 bit device UID block.
const UID_BASE: usize = 0x1FF1_E800;

const SYSCLK_MHZ: u32 = 400;

// Slot geometry, provided by the linker script. The symbols carry the
// values in their addresses, as linker symbols do.
extern "C" {
    static __slot_a_image_start: u32;
    static __slot_a_boot_address: u32;
    static __slot_a_properties: u32;
    static __slot_a_signature: u32;
    static __slot_a_signing_size: u32;
    static __slot_b_image_start: u32;
    static __slot_b_boot_address: u32;
    static __slot_b_properties: u32;
    static __slot_b_signature: u32;
    static __slot_b_signing_size: u32;
}

/// Development trust anchor. Release image assembly replaces this blob
/// with the production anchor; its signature field is unused because the
/// anchor is the root of trust.
const TRUST_ANCHOR: Certificate = Certificate {
    version: 1,
    public_key: [
        0x6B, 0x17, 0xD1, 0xF2, 0xE1, 0x2C, 0x42, 0x47, 0xF8, 0xBC, 0xE6, 0xE5, 0x63, 0xA4,
        0x40, 0xF2, 0x77, 0x03, 0x7D, 0x81, 0x2D, 0xEB, 0x33, 0xA0, 0xF4, 0xA1, 0x39, 0x45,
        0xD8, 0x98, 0xC2, 0x96, 0x4F, 0xE3, 0x42, 0xE2, 0xFE, 0x1A, 0x7F, 0x9B, 0x8E, 0xE7,
        0xEB, 0x4A, 0x7C, 0x0F, 0x9E, 0x16, 0x2B, 0xCE, 0x33, 0x57, 0x6B, 0x31, 0x5E, 0xCE,
        0xCB, 0xB6, 0x40, 0x68, 0x37, 0xBF, 0x51, 0xF5,
    ],
    signature: [0; 64],
};

pub type WalletLoader = Loader<
    McuFlash,
    SoftwareEcdsa,
    Xoroshiro64,
    CycleDelay,
    ResetOnGlitch<ScbReset>,
    ScbReset,
    CortexJump,
>;

fn symbol_value(symbol: &u32) -> u32 { symbol as *const u32 as u32 }

pub fn construct() -> WalletLoader {
    // NOTE(Safety): the linker script guarantees these symbols exist; the
    // loader bounds-checks every address before trusting it.
    let slots = unsafe {
        [
            SlotLayout {
                index: 1,
                image: Address(symbol_value(&__slot_a_image_start)),
                boot: Address(symbol_value(&__slot_a_boot_address)),
                properties: Address(symbol_value(&__slot_a_properties)),
                signature: Address(symbol_value(&__slot_a_signature)),
                signing_size: symbol_value(&__slot_a_signing_size) as usize,
            },
            SlotLayout {
                index: 2,
                image: Address(symbol_value(&__slot_b_image_start)),
                boot: Address(symbol_value(&__slot_b_boot_address)),
                properties: Address(symbol_value(&__slot_b_properties)),
                signature: Address(symbol_value(&__slot_b_signature)),
                signing_size: symbol_value(&__slot_b_signing_size) as usize,
            },
        ]
    };

    // TODO: seed from the RNG peripheral once the clock tree bring-up
    // exposes it; until then the device UID plus the cycle counter denies
    // at least cross-device prediction of the jitter sequence.
    // NOTE(Safety): the UID block is a fixed readable ROM region.
    let (seed0, seed1) = unsafe {
        (
            read_volatile(UID_BASE as *const u32) ^ cortex_m::peripheral::DWT::get_cycle_count(),
            read_volatile((UID_BASE + 4) as *const u32)
                ^ read_volatile((UID_BASE + 8) as *const u32),
        )
    };

    // NOTE(Safety): the range below is this part's memory mapped flash.
    let flash = unsafe { McuFlash::new(FLASH_START, FLASH_END) };

    Loader::new(
        flash,
        SoftwareEcdsa,
        Guardian::new(
            Xoroshiro64::seeded(seed0, seed1),
            CycleDelay::new(SYSCLK_MHZ.mhz()),
            ResetOnGlitch(ScbReset),
        ),
        ScbReset,
        CortexJump,
        TRUST_ANCHOR,
        slots,
    )
}
