//! # Bulwark
//!
//! Secure boot core for dual-slot hardware wallets: decides, on every
//! power-on, which of two redundantly stored firmware images is authentic
//! and newest, and hands the machine over to it. Built throughout from
//! fault-injection resistant primitives, so that a single glitched branch
//! is never enough to boot an unverified image.
#![cfg_attr(test, allow(unused_imports))]
#![cfg_attr(target_arch = "arm", no_std)]

extern crate static_assertions;

#[macro_use]
pub mod utilities {
    pub mod memory;
    mod macros;
}

pub mod hal;
pub mod secutils;
pub mod devices;
pub mod drivers;
pub mod ports;
pub mod error;
