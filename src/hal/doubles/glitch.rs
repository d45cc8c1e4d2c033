use crate::secutils::guard::GlitchHandler;

/// Glitch handler double: detection is modelled as a panic, the host-side
/// stand-in for the reference hard-reset policy.
#[derive(Default)]
pub struct PanicOnGlitch;

impl GlitchHandler for PanicOnGlitch {
    fn on_glitch(&mut self) -> ! {
        panic!("glitch detected");
    }
}
