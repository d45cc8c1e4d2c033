//! Controlled system reset interface and reset reason taxonomy.
use defmt::Format;

/// Why the last controlled reset happened. Exactly one code is recorded
/// per reset; the record is overwritten, never appended to.
#[repr(u32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Format)]
pub enum ResetReason {
    Unknown = 0,
    /// No slot carried a correctly chained certificate and image signature.
    InvalidSignature = 1,
    /// A code path invariant was violated; the most severe class.
    Fatal = 2,
    /// Structural failure: bad properties block or slot selection outcome.
    InvalidProperties = 3,
    /// The winning slot's boot address fell outside executable flash.
    BadBootAddress = 4,
    /// Reset explicitly requested by the application.
    FromRequest = 5,
    /// Redundant evaluations disagreed; the fingerprint of an injected
    /// fault, classified separately from ordinary verification failure.
    Fault = 6,
    FirmwareUpdate = 7,
    StackCanaryNotSet = 8,
    StackSmashingDetected = 9,
    WatchdogTimeout = 10,
    Tamper = 11,
}

impl From<u32> for ResetReason {
    fn from(raw: u32) -> Self {
        match raw {
            1 => ResetReason::InvalidSignature,
            2 => ResetReason::Fatal,
            3 => ResetReason::InvalidProperties,
            4 => ResetReason::BadBootAddress,
            5 => ResetReason::FromRequest,
            6 => ResetReason::Fault,
            7 => ResetReason::FirmwareUpdate,
            8 => ResetReason::StackCanaryNotSet,
            9 => ResetReason::StackSmashingDetected,
            10 => ResetReason::WatchdogTimeout,
            11 => ResetReason::Tamper,
            _ => ResetReason::Unknown,
        }
    }
}

/// Classified hard reset. Implementations must persist the reason through
/// a volatile path before the reset instruction, so the write cannot be
/// reordered past it.
pub trait SystemReset {
    /// Records `reason` and performs a warm reset. Never returns.
    fn system_reset(&mut self, reason: ResetReason) -> !;

    /// Reason recorded before the previous reset, `Unknown` if the record
    /// did not survive (e.g. cold power-up).
    fn boot_reason(&mut self) -> ResetReason;
}
