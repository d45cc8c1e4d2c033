//! Error type for driver and configuration plumbing.
//!
//! Security verdicts never travel through this type: the verification
//! path answers with `SecureBool` and fails closed on any driver error.
//! `Error` exists for the construction and tooling paths, where a
//! readable diagnosis beats a silent reboot.
use defmt::Format;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Format)]
pub enum Error {
    /// Error caused by a low level peripheral driver
    DriverError(&'static str),
    /// Error caused by a faulty configuration
    ConfigurationError(&'static str),
    /// Error caused by a high level device driver
    DeviceError(&'static str),
}
