//! Boot orchestration: verify both slots, elect a winner, jump.
//!
//! Every failure path ends in a classified hard reset. There is no retry
//! and no degraded boot: retrying a failed verification in place would
//! hand an attacker repeated, low-cost attempts at the same fault
//! injection window.
use super::{
    certificate::{AppProperties, Certificate},
    secureboot::SlotVerifier,
    slot::{self, Candidate, SlotLayout},
};
use crate::{
    hal::{
        crypto::SignatureCheck,
        flash::{RawRead, Read},
        jump::BootJump,
        reset::{ResetReason, SystemReset},
        rng::RandomSource,
        time::Delay,
    },
    secutils::{
        guard::{GlitchHandler, Guardian},
        SecureBool, StepCounter,
    },
    utilities::memory::Region,
};
use core::{
    mem::size_of,
    ptr::{read_volatile, write_volatile},
};
use defmt::{info, warn};
use nb::block;

pub struct Loader<F, E, R, D, G, S, J>
where
    F: Read,
    E: SignatureCheck,
    R: RandomSource,
    D: Delay,
    G: GlitchHandler,
    S: SystemReset,
    J: BootJump,
{
    pub(crate) flash: F,
    pub(crate) engine: E,
    pub(crate) guardian: Guardian<R, D, G>,
    pub(crate) reset: S,
    pub(crate) jump: J,
    pub(crate) anchor: Certificate,
    pub(crate) slots: [SlotLayout<F::Address>; 2],
}

impl<F, E, R, D, G, S, J> Loader<F, E, R, D, G, S, J>
where
    F: Read,
    E: SignatureCheck,
    R: RandomSource,
    D: Delay,
    G: GlitchHandler,
    S: SystemReset,
    J: BootJump,
{
    pub fn new(
        flash: F,
        engine: E,
        guardian: Guardian<R, D, G>,
        reset: S,
        jump: J,
        anchor: Certificate,
        slots: [SlotLayout<F::Address>; 2],
    ) -> Self {
        Loader { flash, engine, guardian, reset, jump, anchor, slots }
    }

    /// Main boot routine. Returns only by transferring control into a
    /// verified image or by resetting the device.
    pub fn run(mut self) -> ! {
        self.prepare();

        let slots = self.slots;
        let (a_verdict, a_properties) = self.examine(&slots[0]);
        let (b_verdict, b_properties) = self.examine(&slots[1]);

        // Neither slot valid: fail open toward the reset, so that a fault
        // that spuriously trips this check still only costs a reboot.
        {
            let Loader { guardian, reset, .. } = &mut self;
            let neither =
                SecureBool::from(!a_verdict.launder().is_true() && !b_verdict.launder().is_true());
            guardian.fail_in(
                || neither.launder(),
                || reset.system_reset(ResetReason::InvalidSignature),
            );
        }

        let candidate_a =
            Candidate { layout: &slots[0], properties: a_properties, verified: a_verdict };
        let candidate_b =
            Candidate { layout: &slots[1], properties: b_properties, verified: b_verdict };

        let (elected, winner) = slot::select(&mut self.guardian, &candidate_a, &candidate_b);
        if !self.guardian.confirms(|| elected.launder()) {
            self.abort(ResetReason::InvalidProperties);
        }
        let winner = match winner {
            Some(winner) => winner,
            // A successful election with no winner bound to it means the
            // selector's own invariants were violated.
            None => self.abort(ResetReason::Fatal),
        };

        // Re-derive, from physical identity, which verification flag the
        // winner corresponds to. Deliberately redundant with the
        // selection: it catches a fault that corrupted the selector's
        // return value after a correct internal decision.
        let winner_flag = if core::ptr::eq(winner, &candidate_a) {
            a_verdict
        } else if core::ptr::eq(winner, &candidate_b) {
            b_verdict
        } else {
            self.abort(ResetReason::Fatal)
        };
        self.guardian.assert_true(|| winner_flag.launder());

        // The boot address is duplicated into an independent slot here and
        // re-compared immediately before the jump.
        let boot_address: u32 = winner.boot_address().into();
        let mut saved_boot_address = 0u32;
        unsafe { write_volatile(&mut saved_boot_address, boot_address) };

        let vector_table = winner.boot_address();
        if !self.flash.range().contains_range(vector_table, 2 * size_of::<u32>()) {
            self.abort(ResetReason::BadBootAddress);
        }

        info!("booting slot {=u8} (version {=u32})", winner.layout.index, winner.app_version());
        self.handoff(vector_table, boot_address, &saved_boot_address)
    }

    /// Jump state: the target stack pointer and entry address are each
    /// read twice from flash and must agree with themselves, and the
    /// saved boot address must still match the winner's.
    fn handoff(mut self, vector_table: F::Address, boot_address: u32, saved: &u32) -> ! {
        let stack_pointer = self.read_word(vector_table);
        let stack_pointer_again = self.read_word(vector_table);
        let entry = self.read_word(vector_table + size_of::<u32>());
        let entry_again = self.read_word(vector_table + size_of::<u32>());

        self.guardian
            .assert_true(|| SecureBool::from(stack_pointer == stack_pointer_again).launder());
        self.guardian.assert_true(|| SecureBool::from(entry == entry_again).launder());
        self.guardian.assert_true(|| {
            SecureBool::from(unsafe { read_volatile(saved) } == boot_address).launder()
        });

        warn!("jumping to image at {=usize}; this will break defmt", boot_address as usize);
        self.jump.jump(boot_address, stack_pointer, entry)
    }

    fn prepare(&mut self) {
        // Nothing may re-enter the boot sequence once verification starts.
        #[cfg(target_arch = "arm")]
        cortex_m::interrupt::disable();

        let _previous = self.reset.boot_reason();
        info!("-- bulwark initialised (previous reset: {:?}) --", _previous);
    }

    /// Verifies one slot, bracketed by a masked counter proving the
    /// verification ran exactly once. It is not repeated on failure:
    /// `verify_slot` is already internally redundant, and a retry would
    /// only widen the attack window.
    fn examine(&mut self, layout: &SlotLayout<F::Address>) -> (SecureBool, AppProperties) {
        info!("verifying slot {=u8}", layout.index);
        let mut steps = StepCounter::default();
        steps.advance();
        let (verdict, properties) = SlotVerifier {
            flash: &mut self.flash,
            engine: &mut self.engine,
            guardian: &mut self.guardian,
        }
        .verify_slot(&self.anchor, layout);
        if !steps.is_valid() || steps.count() != 1 {
            self.guardian.glitch_detected();
        }
        info!("slot {=u8} verified: {=bool}", layout.index, verdict.is_true());
        (verdict, properties.unwrap_or_default())
    }

    fn read_word(&mut self, address: F::Address) -> u32 {
        // NOTE(Safety): u32 is valid for any bit pattern; the address was
        // bounds checked before the handoff began.
        match unsafe { block!(self.flash.read_raw::<u32>(address)) } {
            Ok(word) => word,
            Err(_) => self.abort(ResetReason::BadBootAddress),
        }
    }

    fn abort(&mut self, reason: ResetReason) -> ! {
        warn!("boot aborted: {:?}", reason);
        self.reset.system_reset(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        devices::certificate::{properties_magic, PROPERTIES_STRUCT_VERSION},
        hal::doubles::{
            crypto::MockEngine,
            flash::{Address, FakeFlash},
            glitch::PanicOnGlitch,
            jump::{capture_jump, FakeJump},
            reset::FakeReset,
            rng::FakeRng,
            time::FakeDelay,
        },
        hal::flash::Write,
    };
    use std::panic::AssertUnwindSafe;

    const FLASH_BASE: Address = Address(0x0800_0000);

    const ANCHOR: Certificate =
        Certificate { version: 2, public_key: [0x55; 64], signature: [0; 64] };

    const SLOT_A: SlotLayout<Address> = SlotLayout {
        index: 1,
        image: Address(0x0801_0000),
        boot: Address(0x0801_0000),
        properties: Address(0x0801_8000),
        signature: Address(0x0801_8100),
        signing_size: 1024,
    };
    const SLOT_B: SlotLayout<Address> = SlotLayout {
        index: 2,
        image: Address(0x0802_0000),
        boot: Address(0x0802_0000),
        properties: Address(0x0802_8000),
        signature: Address(0x0802_8100),
        signing_size: 1024,
    };

    const SLOT_A_STACK: u32 = 0x2002_0000;
    const SLOT_A_ENTRY: u32 = 0x0801_0101;
    const SLOT_B_STACK: u32 = 0x2001_8000;
    const SLOT_B_ENTRY: u32 = 0x0802_0101;

    fn program_slot(flash: &mut FakeFlash, layout: &SlotLayout<Address>, version: u32) {
        let certificate_address = u32::from(layout.properties) + 0x200;

        let mut properties = Vec::new();
        properties.extend_from_slice(&properties_magic());
        properties.extend_from_slice(&PROPERTIES_STRUCT_VERSION.to_le_bytes());
        properties.extend_from_slice(&version.to_le_bytes());
        properties.extend_from_slice(&[0xAB; 16]);
        properties.extend_from_slice(&certificate_address.to_le_bytes());
        flash.write(layout.properties, &properties).unwrap();

        let mut certificate = Vec::new();
        certificate.extend_from_slice(&3u32.to_le_bytes());
        certificate.extend_from_slice(&[0x77; 64]);
        certificate.extend_from_slice(&[0x99; 64]);
        flash.write(Address(certificate_address), &certificate).unwrap();

        flash.write(layout.signature, &[0x42; 64]).unwrap();

        // Vector table at the head of the image, then payload bytes.
        let (stack, entry) = if layout.index == 1 {
            (SLOT_A_STACK, SLOT_A_ENTRY)
        } else {
            (SLOT_B_STACK, SLOT_B_ENTRY)
        };
        let mut image: Vec<u8> = Vec::new();
        image.extend_from_slice(&stack.to_le_bytes());
        image.extend_from_slice(&entry.to_le_bytes());
        image.extend((image.len()..layout.signing_size).map(|byte| byte as u8));
        flash.write(layout.image, &image).unwrap();
    }

    type TestLoader =
        Loader<FakeFlash, MockEngine, FakeRng, FakeDelay, PanicOnGlitch, FakeReset, FakeJump>;

    fn loader(flash: FakeFlash) -> TestLoader {
        Loader::new(
            flash,
            MockEngine::approving(),
            Guardian::new(FakeRng::default(), FakeDelay::default(), PanicOnGlitch),
            FakeReset::default(),
            FakeJump,
            ANCHOR,
            [SLOT_A, SLOT_B],
        )
    }

    #[test]
    fn a_single_valid_slot_boots_through_its_own_vector_table() {
        let mut flash = FakeFlash::new(FLASH_BASE);
        program_slot(&mut flash, &SLOT_A, 2);
        // Slot B stays unprogrammed: all-zero flash, fails structurally.

        let loader = loader(flash);
        let request = capture_jump(AssertUnwindSafe(move || loader.run())).unwrap();
        assert_eq!(request.vector_base, u32::from(SLOT_A.boot));
        assert_eq!(request.stack_pointer, SLOT_A_STACK);
        assert_eq!(request.entry, SLOT_A_ENTRY);
    }

    #[test]
    fn with_both_slots_valid_the_newer_version_boots() {
        let mut flash = FakeFlash::new(FLASH_BASE);
        program_slot(&mut flash, &SLOT_A, 5);
        program_slot(&mut flash, &SLOT_B, 7);

        let loader = loader(flash);
        let request = capture_jump(AssertUnwindSafe(move || loader.run())).unwrap();
        assert_eq!(request.vector_base, u32::from(SLOT_B.boot));
        assert_eq!(request.stack_pointer, SLOT_B_STACK);
        assert_eq!(request.entry, SLOT_B_ENTRY);
    }

    #[test]
    fn equal_versions_deterministically_boot_slot_a() {
        for _ in 0..4 {
            let mut flash = FakeFlash::new(FLASH_BASE);
            program_slot(&mut flash, &SLOT_A, 3);
            program_slot(&mut flash, &SLOT_B, 3);

            let loader = loader(flash);
            let request = capture_jump(AssertUnwindSafe(move || loader.run())).unwrap();
            assert_eq!(request.vector_base, u32::from(SLOT_A.boot));
        }
    }

    #[test]
    fn two_empty_slots_reset_with_an_invalid_signature_classification() {
        let flash = FakeFlash::new(FLASH_BASE);
        let loader = loader(flash);
        let outcome = capture_jump(AssertUnwindSafe(move || loader.run()));
        assert!(outcome.unwrap_err().contains("InvalidSignature"));
    }

    #[test]
    fn a_tampered_image_signature_resets_instead_of_booting() {
        let mut flash = FakeFlash::new(FLASH_BASE);
        program_slot(&mut flash, &SLOT_A, 2);

        let mut loader = loader(flash);
        // The engine sees through the tampering and refuses every
        // transaction for both slots.
        loader.engine = MockEngine::scripted(&[false; 8]);
        let outcome = capture_jump(AssertUnwindSafe(move || loader.run()));
        assert!(outcome.unwrap_err().contains("InvalidSignature"));
    }
}
