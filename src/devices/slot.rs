//! Flash slot descriptors and the boot slot selector.
use super::certificate::AppProperties;
use crate::{
    hal::{rng::RandomSource, time::Delay},
    secutils::{
        guard::{GlitchHandler, Guardian},
        SecureBool,
    },
    utilities::memory::Address,
};
use core::ptr::{read_volatile, write_volatile};

/// Geometry of one flash slot, as handed down by the linker script: the
/// five addresses the boot path is allowed to trust, and nothing else.
#[derive(Clone, Copy, Debug)]
pub struct SlotLayout<A: Address> {
    /// Numeric identifier of the slot, for diagnostics only.
    pub index: u8,
    /// Start of the firmware image.
    pub image: A,
    /// Executable entry: points at the image's vector table.
    pub boot: A,
    /// Location of the [`AppProperties`] block.
    pub properties: A,
    /// Location of the detached image signature.
    pub signature: A,
    /// Byte count covered by the image signature, excluding the signature
    /// itself.
    pub signing_size: usize,
}

/// One boot attempt's view of a slot. Created fresh on the stack every
/// boot, never persisted; it exclusively owns its verification verdict.
pub struct Candidate<'a, A: Address> {
    pub layout: &'a SlotLayout<A>,
    /// Copy of the properties block read from flash, or the all-zero
    /// placeholder if the slot failed structural checks.
    pub properties: AppProperties,
    pub verified: SecureBool,
}

impl<'a, A: Address> Candidate<'a, A> {
    pub fn boot_address(&self) -> A { self.layout.boot }
    pub fn app_version(&self) -> u32 { self.properties.app_version }
}

/// Chooses which of two candidates to boot. Pure decision logic: no I/O,
/// no retries.
///
/// A winner emerges only from one of the guarded branches below; there is
/// no fall-through path that reports success without binding a winner.
/// The winner is returned by reference so the caller can re-derive, from
/// physical identity, which verification flag backs it. Every assigning
/// branch runs under a fail-closed guard, since electing a slot is the
/// single highest-impact decision in the system.
pub fn select<'c, 'a, A, R, D, G>(
    guardian: &mut Guardian<R, D, G>,
    a: &'c Candidate<'a, A>,
    b: &'c Candidate<'a, A>,
) -> (SecureBool, Option<&'c Candidate<'a, A>>)
where
    A: Address,
    R: RandomSource,
    D: Delay,
    G: GlitchHandler,
{
    let mut verdict = SecureBool::FALSE.raw();
    let mut winner: Option<&'c Candidate<'a, A>> = None;

    let a_valid = a.verified;
    let b_valid = b.verified;

    // Only A carries a verified signature.
    guardian.fail_out(
        || SecureBool::from(a_valid.launder().is_true() && !b_valid.launder().is_true()),
        || {
            winner = Some(a);
            unsafe { write_volatile(&mut verdict, SecureBool::TRUE.raw()) };
        },
    );

    // Only B carries a verified signature.
    guardian.fail_out(
        || SecureBool::from(b_valid.launder().is_true() && !a_valid.launder().is_true()),
        || {
            winner = Some(b);
            unsafe { write_volatile(&mut verdict, SecureBool::TRUE.raw()) };
        },
    );

    // Both verified: the strictly newer version wins.
    guardian.fail_out(
        || {
            SecureBool::from(
                a_valid.launder().is_true()
                    && b_valid.launder().is_true()
                    && a.app_version() > b.app_version(),
            )
        },
        || {
            winner = Some(a);
            unsafe { write_volatile(&mut verdict, SecureBool::TRUE.raw()) };
        },
    );
    guardian.fail_out(
        || {
            SecureBool::from(
                a_valid.launder().is_true()
                    && b_valid.launder().is_true()
                    && b.app_version() > a.app_version(),
            )
        },
        || {
            winner = Some(b);
            unsafe { write_volatile(&mut verdict, SecureBool::TRUE.raw()) };
        },
    );

    // Exact version tie: A wins. Fixed and deterministic, never random,
    // so the orchestrator's re-check reproduces the same choice.
    guardian.fail_out(
        || {
            SecureBool::from(
                a_valid.launder().is_true()
                    && b_valid.launder().is_true()
                    && a.app_version() == b.app_version(),
            )
        },
        || {
            winner = Some(a);
            unsafe { write_volatile(&mut verdict, SecureBool::TRUE.raw()) };
        },
    );

    (SecureBool::from_raw(unsafe { read_volatile(&verdict) }), winner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::doubles::{
        flash::Address, glitch::PanicOnGlitch, rng::FakeRng, time::FakeDelay,
    };

    const LAYOUT_A: SlotLayout<Address> = SlotLayout {
        index: 1,
        image: Address(0x1000),
        boot: Address(0x1000),
        properties: Address(0x4000),
        signature: Address(0x3000),
        signing_size: 1024,
    };
    const LAYOUT_B: SlotLayout<Address> = SlotLayout {
        index: 2,
        image: Address(0x8000),
        boot: Address(0x8000),
        properties: Address(0xB000),
        signature: Address(0xA000),
        signing_size: 1024,
    };

    fn guardian() -> Guardian<FakeRng, FakeDelay, PanicOnGlitch> {
        Guardian::new(FakeRng::default(), FakeDelay::default(), PanicOnGlitch)
    }

    fn candidate(
        layout: &SlotLayout<Address>,
        version: u32,
        verified: bool,
    ) -> Candidate<Address> {
        let mut properties = AppProperties::default();
        properties.app_version = version;
        Candidate { layout, properties, verified: SecureBool::from(verified) }
    }

    fn selected_index(
        a: &Candidate<Address>,
        b: &Candidate<Address>,
    ) -> (bool, Option<u8>) {
        let (verdict, winner) = select(&mut guardian(), a, b);
        (verdict.is_true(), winner.map(|candidate| candidate.layout.index))
    }

    #[test]
    fn neither_candidate_verified_yields_no_winner() {
        let a = candidate(&LAYOUT_A, 1, false);
        let b = candidate(&LAYOUT_B, 2, false);
        assert_eq!(selected_index(&a, &b), (false, None));
    }

    #[test]
    fn a_sole_verified_candidate_wins_regardless_of_version() {
        let a = candidate(&LAYOUT_A, 1, true);
        let b = candidate(&LAYOUT_B, 99, false);
        assert_eq!(selected_index(&a, &b), (true, Some(1)));

        let a = candidate(&LAYOUT_A, 99, false);
        let b = candidate(&LAYOUT_B, 1, true);
        assert_eq!(selected_index(&a, &b), (true, Some(2)));
    }

    #[test]
    fn with_both_verified_the_newer_version_wins() {
        let a = candidate(&LAYOUT_A, 5, true);
        let b = candidate(&LAYOUT_B, 3, true);
        assert_eq!(selected_index(&a, &b), (true, Some(1)));

        let a = candidate(&LAYOUT_A, 5, true);
        let b = candidate(&LAYOUT_B, 7, true);
        assert_eq!(selected_index(&a, &b), (true, Some(2)));
    }

    #[test]
    fn an_exact_version_tie_elects_slot_a() {
        let a = candidate(&LAYOUT_A, 3, true);
        let b = candidate(&LAYOUT_B, 3, true);
        assert_eq!(selected_index(&a, &b), (true, Some(1)));
    }

    #[test]
    fn the_tie_break_is_reproducible() {
        let a = candidate(&LAYOUT_A, 3, true);
        let b = candidate(&LAYOUT_B, 3, true);
        for _ in 0..16 {
            assert_eq!(selected_index(&a, &b), (true, Some(1)));
        }
    }

    #[test]
    fn an_anomalous_verdict_is_treated_as_unverified() {
        let mut a = candidate(&LAYOUT_A, 3, true);
        a.verified = SecureBool::from_raw(0xDEAD_BEEF);
        let b = candidate(&LAYOUT_B, 1, true);
        assert_eq!(selected_index(&a, &b), (true, Some(2)));
    }

    #[test]
    fn the_winner_is_returned_by_identity_not_by_copy() {
        let a = candidate(&LAYOUT_A, 3, true);
        let b = candidate(&LAYOUT_B, 1, true);
        let (_, winner) = select(&mut guardian(), &a, &b);
        assert!(core::ptr::eq(winner.unwrap(), &a));
    }
}
