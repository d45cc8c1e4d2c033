use crate::hal::jump::BootJump;

/// What the orchestrator handed to the jump driver. Carried as a panic
/// payload so tests can unwind and inspect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JumpRequest {
    pub vector_base: u32,
    pub stack_pointer: u32,
    pub entry: u32,
}

/// Jump double: "jumping" unwinds with the request as payload.
#[derive(Default)]
pub struct FakeJump;

impl BootJump for FakeJump {
    fn jump(&mut self, vector_base: u32, stack_pointer: u32, entry: u32) -> ! {
        std::panic::panic_any(JumpRequest { vector_base, stack_pointer, entry });
    }
}

/// Unwinds `action` (expected to end in a `FakeJump`) and returns the
/// captured request, or the reset/glitch panic message if it never jumped.
pub fn capture_jump(action: impl FnOnce() + std::panic::UnwindSafe) -> Result<JumpRequest, String> {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| ())); // keep expected panics quiet
    let outcome = std::panic::catch_unwind(action);
    std::panic::set_hook(hook);
    match outcome {
        Ok(()) => panic!("action returned instead of diverging"),
        Err(payload) => match payload.downcast::<JumpRequest>() {
            Ok(request) => Ok(*request),
            Err(other) => Err(other
                .downcast::<String>()
                .map(|s| *s)
                .or_else(|p| p.downcast::<&'static str>().map(|s| s.to_string()))
                .unwrap_or_else(|_| "unknown panic payload".to_string())),
        },
    }
}
