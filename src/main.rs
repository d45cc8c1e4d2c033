#![cfg_attr(target_arch = "arm", no_std)]
#![cfg_attr(target_arch = "arm", no_main)]

#[cfg(target_arch = "arm")]
use defmt_rtt as _;
#[cfg(target_arch = "arm")]
use panic_semihosting as _;

#[cfg(all(target_arch = "arm", feature = "stm32h743"))]
#[cortex_m_rt::entry]
fn main() -> ! {
    bulwark_lib::ports::loader::construct().run()
}

#[cfg(all(target_arch = "arm", not(feature = "stm32h743")))]
compile_error!("Select a port feature to build the bulwark binary.");

// The firmware entry point only exists on target; host builds get a stub
// so the workspace builds and tests everywhere.
#[cfg(not(target_arch = "arm"))]
fn main() {}
