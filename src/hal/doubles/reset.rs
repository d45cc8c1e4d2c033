use crate::hal::reset::{ResetReason, SystemReset};

/// Reset double. A controlled reset is modelled as a panic carrying the
/// reason in its message, so tests assert on it with `should_panic`.
pub struct FakeReset {
    pub previous: ResetReason,
}

impl Default for FakeReset {
    fn default() -> Self { FakeReset { previous: ResetReason::Unknown } }
}

impl SystemReset for FakeReset {
    fn system_reset(&mut self, reason: ResetReason) -> ! {
        panic!("controlled reset: {:?}", reason);
    }

    fn boot_reason(&mut self) -> ResetReason { self.previous }
}
