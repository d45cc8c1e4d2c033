//! Cortex-M system drivers: cycle counted delay, classified reset, and
//! the final jump into a target image.
#[cfg(target_arch = "arm")]
use crate::devices::reset_record;
use crate::hal::{
    jump::BootJump,
    reset::{ResetReason, SystemReset},
    time::{Delay, MegaHertz, Microseconds},
};
use cortex_m::peripheral::SCB;

/// Busy delay calibrated against the core clock.
pub struct CycleDelay {
    sysclk: MegaHertz,
}

impl CycleDelay {
    pub fn new(sysclk: MegaHertz) -> Self { CycleDelay { sysclk } }
}

impl Delay for CycleDelay {
    fn delay_us(&mut self, period: Microseconds) {
        cortex_m::asm::delay(period.0.saturating_mul(self.sysclk.0));
    }
}

/// Classified reset through the System Control Block. The reason lands
/// in the RAM reset record an instant before the reset fires.
pub struct ScbReset;

impl SystemReset for ScbReset {
    fn system_reset(&mut self, reason: ResetReason) -> ! {
        #[cfg(target_arch = "arm")]
        // NOTE(Safety): the record is written at the very end of this
        // boot; nothing else will touch that RAM before the reset lands.
        unsafe {
            reset_record::reset_record_mut().store(reason)
        };
        #[cfg(not(target_arch = "arm"))]
        let _ = reason;
        SCB::sys_reset()
    }

    fn boot_reason(&mut self) -> ResetReason {
        #[cfg(target_arch = "arm")]
        // NOTE(Safety): read once, right after boot, before the stack can
        // have grown anywhere near the top of RAM.
        return unsafe { reset_record::reset_record_mut().reason() };
        #[cfg(not(target_arch = "arm"))]
        ResetReason::Unknown
    }
}

/// The one-way transfer. On parts with an active tamper or secure mode,
/// the port wraps this driver with one that disarms it first.
pub struct CortexJump;

impl BootJump for CortexJump {
    fn jump(&mut self, vector_base: u32, stack_pointer: u32, entry: u32) -> ! {
        // NOTE(Safety): thoroughly unsafe, and necessarily so: the machine
        // is being handed to a different firmware image. Both words were
        // read twice and cross-checked by the caller; once the stack
        // pointer moves there is no returning to this code.
        unsafe {
            let entry_function = core::mem::transmute::<*const (), fn() -> !>(entry as *const ());
            (*SCB::ptr()).vtor.write(vector_base);
            #[allow(deprecated)]
            cortex_m::register::msp::write(stack_pointer);
            entry_function()
        }
    }
}
