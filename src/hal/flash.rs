//! Flash memory interfaces.
use crate::utilities::memory::Address;
use core::{
    fmt,
    mem::{size_of, MaybeUninit},
    slice,
};

/// Reads a range of bytes, generic over an address.
pub trait Read {
    type Error: Clone + Copy + fmt::Debug;
    type Address: Address;
    fn read(&mut self, address: Self::Address, bytes: &mut [u8]) -> nb::Result<(), Self::Error>;

    /// Physical range this flash device occupies. Anything outside it is
    /// RAM, peripheral space or nothing at all, and must never be treated
    /// as image material.
    fn range(&self) -> (Self::Address, Self::Address);
}

/// Writes a range of bytes, generic over an address. This is a high level
/// write that abstracts away the need to first erase, or to keep writes
/// inside page boundaries.
pub trait Write {
    type Error: Clone + Copy + fmt::Debug;
    type Address: Address;
    fn write(&mut self, address: Self::Address, bytes: &[u8]) -> nb::Result<(), Self::Error>;
}

pub trait ReadWrite: Read + Write {}
impl<F> ReadWrite for F where F: Read + Write {}

pub trait RawRead: Read {
    /// NOTE(Safety): This is a very raw deserialization (the bytes are
    /// reinterpreted as-is). Must only be used with packed, padding-free
    /// `repr(C)` types for which any bit pattern is a valid value, and only
    /// after the address range has been bounds-checked against `range()`.
    unsafe fn read_raw<T: Sized>(
        &mut self,
        address: Self::Address,
    ) -> nb::Result<T, Self::Error> {
        // Zeroed, not uninit: a driver that reports success after a short
        // read must still hand back a defined value.
        let mut value: MaybeUninit<T> = MaybeUninit::zeroed();
        let bytes = slice::from_raw_parts_mut(value.as_mut_ptr() as *mut u8, size_of::<T>());
        self.read(address, bytes)?;
        Ok(value.assume_init())
    }
}
impl<F: Read> RawRead for F {}
