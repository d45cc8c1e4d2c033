use super::error::FakeError;
use crate::hal::flash;
use std::{
    cmp::max,
    ops::{Add, Sub},
};

/// In-memory flash double. Reads outside `[base, base + length)` fail the
/// way a real driver would, which is what the bounds rejection tests rely
/// on: a rejected address must never produce image bytes.
pub struct FakeFlash {
    base: Address,
    length: usize,
    data: Vec<u8>,
}

impl FakeFlash {
    pub fn new(base: Address) -> FakeFlash {
        FakeFlash { base, data: Vec::new(), length: MB!(16) }
    }

    pub fn with_length(base: Address, length: usize) -> FakeFlash {
        FakeFlash { base, data: Vec::new(), length }
    }
}

#[derive(Copy, Clone, Debug, Ord, PartialOrd, PartialEq, Eq)]
pub struct Address(pub u32);

impl flash::Read for FakeFlash {
    type Error = FakeError;
    type Address = Address;
    fn read(&mut self, address: Self::Address, bytes: &mut [u8]) -> nb::Result<(), Self::Error> {
        if address < self.base || (address + bytes.len()) > (self.base + self.length) {
            Err(nb::Error::Other(FakeError))
        } else {
            // Unprogrammed flash reads as erased zeros.
            bytes.fill(0);
            self.data.iter().skip(address - self.base).zip(bytes).for_each(|(i, o)| *o = *i);
            Ok(())
        }
    }
    fn range(&self) -> (Self::Address, Self::Address) { (self.base, self.base + self.length) }
}

impl flash::Write for FakeFlash {
    type Error = FakeError;
    type Address = Address;
    fn write(&mut self, address: Self::Address, bytes: &[u8]) -> nb::Result<(), Self::Error> {
        if address < self.base {
            Err(nb::Error::Other(FakeError))
        } else {
            let offset = address - self.base;
            self.data.resize_with(max(self.data.len(), offset + bytes.len()), Default::default);
            self.data.iter_mut().skip(offset).zip(bytes).for_each(|(o, i)| *o = *i);
            Ok(())
        }
    }
}

impl Add<usize> for Address {
    type Output = Address;
    fn add(self, rhs: usize) -> Self::Output { Address(self.0 + rhs as u32) }
}

impl Sub<usize> for Address {
    type Output = Address;
    fn sub(self, rhs: usize) -> Self::Output { Address(self.0.saturating_sub(rhs as u32)) }
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
