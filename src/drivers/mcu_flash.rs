//! Memory mapped internal flash, read path only.
//!
//! The boot core never writes its own flash; programming is owned by the
//! update transport. Reading memory mapped flash is a plain load, done
//! volatilely so reads happen exactly where the code says they do.
use crate::utilities::memory::Region;
use core::ops::{Add, Sub};

#[derive(Copy, Clone, Debug, Ord, PartialOrd, PartialEq, Eq)]
pub struct Address(pub u32);

#[derive(Copy, Clone, Debug)]
pub enum Error {
    OutOfBounds,
}

pub struct McuFlash {
    start: Address,
    end: Address,
}

impl McuFlash {
    /// # Safety
    ///
    /// `[start, end)` must be the MCU's actual memory mapped flash range;
    /// every address inside it will be readable through a raw pointer.
    pub const unsafe fn new(start: u32, end: u32) -> Self {
        McuFlash { start: Address(start), end: Address(end) }
    }
}

impl crate::hal::flash::Read for McuFlash {
    type Error = Error;
    type Address = Address;

    fn read(&mut self, address: Self::Address, bytes: &mut [u8]) -> nb::Result<(), Self::Error> {
        if !(self.start, self.end).contains_range(address, bytes.len()) {
            return Err(nb::Error::Other(Error::OutOfBounds));
        }
        for (index, byte) in bytes.iter_mut().enumerate() {
            // NOTE(Safety): bounds checked against the physical flash
            // range above.
            *byte = unsafe { core::ptr::read_volatile((address.0 as usize + index) as *const u8) };
        }
        Ok(())
    }

    fn range(&self) -> (Self::Address, Self::Address) { (self.start, self.end) }
}

impl Add<usize> for Address {
    type Output = Address;
    fn add(self, rhs: usize) -> Self::Output { Address(self.0 + rhs as u32) }
}

impl Sub<Address> for Address {
    type Output = usize;
    fn sub(self, rhs: Address) -> Self::Output { self.0.saturating_sub(rhs.0) as usize }
}

impl From<u32> for Address {
    fn from(raw: u32) -> Self { Address(raw) }
}

impl From<Address> for u32 {
    fn from(address: Address) -> Self { address.0 }
}

impl From<Error> for crate::error::Error {
    fn from(error: Error) -> Self {
        match error {
            Error::OutOfBounds => {
                crate::error::Error::DriverError("[MCU Flash] Address out of range")
            }
        }
    }
}
