//! Triple-evaluating control flow guards with random timing jitter.
use super::secure_bool::SecureBool;
use crate::hal::{
    reset::{ResetReason, SystemReset},
    rng::RandomSource,
    time::{Delay, Microseconds},
};
use core::{
    ptr::{read_volatile, write_volatile},
    sync::atomic::{AtomicU32, Ordering},
};

/// Policy applied when a glitch is detected. Supplied once when the
/// [`Guardian`] is constructed and never reassigned. The reference
/// implementation is a hard reset classified as
/// [`Fault`](crate::hal::reset::ResetReason::Fault).
pub trait GlitchHandler {
    fn on_glitch(&mut self) -> !;
}

/// Reference glitch policy: a classified hard reset, so telemetry can
/// tell "someone glitched us" apart from "the image was simply bad".
pub struct ResetOnGlitch<S: SystemReset>(pub S);

impl<S: SystemReset> GlitchHandler for ResetOnGlitch<S> {
    fn on_glitch(&mut self) -> ! { self.0.system_reset(ResetReason::Fault) }
}

// Volatile cell that always holds the TRUE encoding. Factored into every
// guarded condition so a skipped load corrupts the read, and so the guard
// is never foldable to a compile time constant.
#[used]
static FIXED_TRUE: u32 = SecureBool::TRUE.raw();

/// Volatile read of the always-true cell.
pub fn fixed_true() -> SecureBool {
    // NOTE(Safety): reads a static this crate never writes.
    SecureBool::from_raw(unsafe { read_volatile(&FIXED_TRUE) })
}

// Process-wide tally of detected glitches. Single writer during boot;
// sequentially consistent stores keep the count from being reordered past
// the reset that follows a detection.
static GLITCH_TALLY: AtomicU32 = AtomicU32::new(0);

/// How many times redundant evaluations have disagreed since power-up.
pub fn glitch_tally() -> u32 { GLITCH_TALLY.load(Ordering::SeqCst) }

/// Window the random evaluation jitter is drawn from.
#[derive(Clone, Copy, Debug)]
pub struct JitterWindow {
    pub shortest: Microseconds,
    pub longest: Microseconds,
}

impl Default for JitterWindow {
    fn default() -> Self {
        JitterWindow { shortest: Microseconds(100), longest: Microseconds(2000) }
    }
}

/// Owner of the fault-detection capabilities: the jitter entropy source,
/// the delay driver and the glitch policy. Construct one per boot, at
/// init, before any security decision is taken.
pub struct Guardian<R: RandomSource, D: Delay, G: GlitchHandler> {
    rng: R,
    delay: D,
    handler: G,
    window: JitterWindow,
}

impl<R: RandomSource, D: Delay, G: GlitchHandler> Guardian<R, D, G> {
    pub fn new(rng: R, delay: D, handler: G) -> Self {
        Self::with_window(rng, delay, handler, JitterWindow::default())
    }

    pub fn with_window(rng: R, delay: D, handler: G, window: JitterWindow) -> Self {
        Guardian { rng, delay, handler, window }
    }

    /// Records the detection and escalates to the injected policy.
    pub fn glitch_detected(&mut self) -> ! {
        GLITCH_TALLY.store(GLITCH_TALLY.load(Ordering::SeqCst).wrapping_add(1), Ordering::SeqCst);
        self.handler.on_glitch()
    }

    fn jitter(&mut self, completed: &mut u32) {
        let shortest = self.window.shortest.0;
        let span = self.window.longest.0.saturating_sub(shortest);
        let period = match span {
            0 => shortest,
            _ => shortest + self.rng.random() % (span + 1),
        };
        self.delay.delay_us(Microseconds(period));
        // NOTE(Safety): local counter, accessed volatilely so a skipped
        // delay shows up in the completion check instead of being folded
        // into a constant.
        unsafe { write_volatile(completed, read_volatile(completed).wrapping_add(1)) };
    }

    fn sample(
        &mut self,
        condition: &impl Fn() -> SecureBool,
        slot: &mut u32,
        completed: &mut u32,
    ) {
        self.jitter(completed);
        let value = condition().mask(fixed_true());
        // NOTE(Safety): each evaluation lands in its own stack slot.
        unsafe { write_volatile(slot, value.raw()) };
    }

    /// Fail-closed guard: `action` runs only if all three evaluations of
    /// `condition` read back as exactly TRUE. Use for privileged actions
    /// (booting an image). Disagreement between the raw evaluations, or an
    /// incomplete jitter count, escalates unconditionally.
    pub fn fail_out<T>(
        &mut self,
        condition: impl Fn() -> SecureBool,
        action: impl FnOnce() -> T,
    ) -> Option<T> {
        let mut first = SecureBool::FALSE.raw();
        let mut second = SecureBool::FALSE.raw();
        let mut third = SecureBool::FALSE.raw();
        let mut completed = 0u32;

        // Three separate evaluations in three separate slots. Deliberately
        // not a loop: a loop has a single back-edge to target.
        self.sample(&condition, &mut first, &mut completed);
        self.sample(&condition, &mut second, &mut completed);
        self.sample(&condition, &mut third, &mut completed);

        let (a, b, c) = unsafe {
            (read_volatile(&first), read_volatile(&second), read_volatile(&third))
        };
        if a != b || b != c || unsafe { read_volatile(&completed) } != 3 {
            self.glitch_detected();
        }

        let unanimous = SecureBool::from_raw(a).is_true()
            && SecureBool::from_raw(b).is_true()
            && SecureBool::from_raw(c).is_true();
        unanimous.then(action)
    }

    /// Fail-open guard: `action` runs if at least one of the three
    /// evaluations reads TRUE. Use only when the action is itself the safe
    /// outcome (resetting the device), so that a fault which spuriously
    /// trips the condition still lands somewhere harmless. The action runs
    /// before the consistency check, since it may never return.
    pub fn fail_in<T>(
        &mut self,
        condition: impl Fn() -> SecureBool,
        action: impl FnOnce() -> T,
    ) -> Option<T> {
        let mut first = SecureBool::FALSE.raw();
        let mut second = SecureBool::FALSE.raw();
        let mut third = SecureBool::FALSE.raw();
        let mut completed = 0u32;

        self.sample(&condition, &mut first, &mut completed);
        self.sample(&condition, &mut second, &mut completed);
        self.sample(&condition, &mut third, &mut completed);

        let (a, b, c) = unsafe {
            (read_volatile(&first), read_volatile(&second), read_volatile(&third))
        };
        let reached = SecureBool::from_raw(a).is_true()
            || SecureBool::from_raw(b).is_true()
            || SecureBool::from_raw(c).is_true();
        let outcome = reached.then(action);

        if a != b || b != c || unsafe { read_volatile(&completed) } != 3 {
            self.glitch_detected();
        }
        outcome
    }

    /// Fail-closed yes/no: true only on a unanimous TRUE reading.
    pub fn confirms(&mut self, condition: impl Fn() -> SecureBool) -> bool {
        self.fail_out(condition, || ()).is_some()
    }

    /// Assertion that defends its own mechanism: anything short of a
    /// unanimous, consistent TRUE reading escalates to the glitch handler.
    pub fn assert_true(&mut self, condition: impl Fn() -> SecureBool) {
        let mut first = SecureBool::FALSE.raw();
        let mut second = SecureBool::FALSE.raw();
        let mut third = SecureBool::FALSE.raw();
        let mut completed = 0u32;

        self.sample(&condition, &mut first, &mut completed);
        self.sample(&condition, &mut second, &mut completed);
        self.sample(&condition, &mut third, &mut completed);

        let (a, b, c) = unsafe {
            (read_volatile(&first), read_volatile(&second), read_volatile(&third))
        };
        if !(SecureBool::from_raw(a).is_true()
            && SecureBool::from_raw(b).is_true()
            && SecureBool::from_raw(c).is_true())
        {
            self.glitch_detected();
        }
        if a != b || b != c || unsafe { read_volatile(&completed) } != 3 {
            self.glitch_detected();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::doubles::{glitch::PanicOnGlitch, rng::FakeRng, time::FakeDelay};
    use std::cell::Cell;

    type TestGuardian = Guardian<FakeRng, FakeDelay, PanicOnGlitch>;

    fn guardian() -> TestGuardian {
        Guardian::new(FakeRng::default(), FakeDelay::default(), PanicOnGlitch)
    }

    #[test]
    fn fixed_true_reads_the_true_encoding() {
        assert!(fixed_true().is_true());
    }

    #[test]
    fn conditions_are_evaluated_exactly_three_times() {
        let mut guardian = guardian();
        let evaluations = Cell::new(0u32);
        let confirmed = guardian.confirms(|| {
            evaluations.set(evaluations.get() + 1);
            SecureBool::TRUE
        });
        assert!(confirmed);
        assert_eq!(evaluations.get(), 3);
    }

    #[test]
    fn every_evaluation_is_preceded_by_jitter_within_the_window() {
        let delay = FakeDelay::default();
        let log = delay.log();
        let mut guardian = Guardian::new(FakeRng::default(), delay, PanicOnGlitch);
        assert!(guardian.confirms(|| SecureBool::TRUE));
        let recorded = log.borrow();
        assert_eq!(recorded.len(), 3);
        let window = JitterWindow::default();
        for period in recorded.iter() {
            assert!(*period >= window.shortest.0 && *period <= window.longest.0);
        }
    }

    #[test]
    fn fail_out_withholds_the_action_on_a_false_condition() {
        let mut guardian = guardian();
        let executed = Cell::new(false);
        let outcome = guardian.fail_out(|| SecureBool::FALSE, || executed.set(true));
        assert!(outcome.is_none());
        assert!(!executed.get());
    }

    #[test]
    fn fail_out_withholds_the_action_on_an_anomalous_condition() {
        let mut guardian = guardian();
        let anomalous = SecureBool::from_raw(0xDEAD_BEEF);
        assert!(guardian.fail_out(|| anomalous, || ()).is_none());
    }

    #[test]
    fn fail_in_reaches_the_action_on_a_true_condition() {
        let mut guardian = guardian();
        let executed = Cell::new(false);
        guardian.fail_in(|| SecureBool::TRUE, || executed.set(true));
        assert!(executed.get());
    }

    #[test]
    fn fail_in_skips_the_action_on_a_false_condition() {
        let mut guardian = guardian();
        assert!(guardian.fail_in(|| SecureBool::FALSE, || ()).is_none());
    }

    #[test]
    #[should_panic(expected = "glitch detected")]
    fn disagreeing_evaluations_escalate() {
        let mut guardian = guardian();
        let flips = Cell::new(false);
        guardian.fail_out(
            || {
                flips.set(!flips.get());
                SecureBool::from(flips.get())
            },
            || (),
        );
    }

    #[test]
    #[should_panic(expected = "glitch detected")]
    fn disagreeing_evaluations_escalate_for_fail_in_too() {
        let mut guardian = guardian();
        let calls = Cell::new(0u32);
        guardian.fail_in(
            || {
                calls.set(calls.get() + 1);
                // Reads FALSE twice, then TRUE: no two raw samples agree on
                // a single verdict, so the consistency check must fire.
                SecureBool::from(calls.get() == 3)
            },
            || (),
        );
    }

    #[test]
    fn assert_true_passes_on_a_held_condition() {
        let mut guardian = guardian();
        guardian.assert_true(|| SecureBool::TRUE);
    }

    #[test]
    #[should_panic(expected = "glitch detected")]
    fn assert_true_escalates_on_a_broken_condition() {
        let mut guardian = guardian();
        guardian.assert_true(|| SecureBool::FALSE);
    }

    #[test]
    fn detections_bump_the_process_wide_tally() {
        let mut guardian = guardian();
        let before = glitch_tally();
        let escalation = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            guardian.assert_true(|| SecureBool::FALSE);
        }));
        assert!(escalation.is_err());
        assert!(glitch_tally() > before);
    }

    #[test]
    fn degenerate_jitter_window_is_tolerated() {
        let delay = FakeDelay::default();
        let log = delay.log();
        let window = JitterWindow { shortest: Microseconds(50), longest: Microseconds(50) };
        let mut guardian =
            Guardian::with_window(FakeRng::default(), delay, PanicOnGlitch, window);
        assert!(guardian.confirms(|| SecureBool::TRUE));
        assert!(log.borrow().iter().all(|period| *period == 50));
    }
}
