//! Time units and delays.

#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Eq)]
pub struct Microseconds(pub u32);

#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Eq)]
pub struct Milliseconds(pub u32);

/// MegaHertz
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Eq)]
pub struct MegaHertz(pub u32);

/// Synchronous busy delay.
pub trait Delay {
    fn delay_us(&mut self, period: Microseconds);
}

/// Extension trait that adds convenience methods to the `u32` type
pub trait U32Ext {
    /// Wrap in `Microseconds`
    fn us(self) -> Microseconds;

    /// Wrap in `Milliseconds`
    fn ms(self) -> Milliseconds;

    /// Wrap in `MegaHertz`
    fn mhz(self) -> MegaHertz;
}

impl U32Ext for u32 {
    fn us(self) -> Microseconds { Microseconds(self) }
    fn ms(self) -> Milliseconds { Milliseconds(self) }
    fn mhz(self) -> MegaHertz { MegaHertz(self) }
}
