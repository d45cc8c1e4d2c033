//! One-way transfer of control into a firmware image.

/// The final, irrevocable handoff. `vector_base` points at a Cortex-M
/// style vector table (`[0] = initial SP, [1] = entry`); `stack_pointer`
/// and `entry` are the values the caller already read and cross-checked
/// from that table. Implementations must disarm any active tamper or
/// security mode before branching, and must never return.
pub trait BootJump {
    fn jump(&mut self, vector_base: u32, stack_pointer: u32, entry: u32) -> !;
}
