//! Reset reason record relayed across warm resets.
//!
//! Immediately before every controlled reset, the reason is stored in a
//! magic-framed record at the top of RAM, outside any linker-tracked
//! section so the runtime's zero-init never touches it. Diagnostics read
//! it once on the following boot. The record survives warm resets only;
//! a cold power-up leaves garbage magics and the record reads as
//! `Unknown`, which doubles as the record's initialization story.
use crate::hal::reset::ResetReason;
use core::ptr::write_volatile;

/// Bit pattern that should mark the start of a valid reset record.
pub const RECORD_MAGIC_START: u32 = 0x5AFE_B007;
/// Bit pattern that should mark the end of a valid reset record.
pub const RECORD_MAGIC_END: u32 = 0xB007_5AFE;

/// One reason per reset; overwritten, never appended to.
#[repr(C)]
pub struct ResetRecord {
    magic_start: u32,
    reason: u32,
    magic_end: u32,
}

impl ResetRecord {
    /// Both magics are intact, so the reason field is meaningful.
    pub fn is_valid(&self) -> bool {
        self.magic_start == RECORD_MAGIC_START && self.magic_end == RECORD_MAGIC_END
    }

    pub fn reason(&self) -> ResetReason {
        if self.is_valid() {
            ResetReason::from(self.reason)
        } else {
            ResetReason::Unknown
        }
    }

    /// Stores `reason` through a volatile path, so the writes cannot be
    /// reordered past the reset instruction that follows.
    pub fn store(&mut self, reason: ResetReason) {
        // NOTE(Safety): plain in-bounds field writes.
        unsafe {
            write_volatile(&mut self.magic_start, RECORD_MAGIC_START);
            write_volatile(&mut self.reason, reason as u32);
            write_volatile(&mut self.magic_end, RECORD_MAGIC_END);
        }
    }
}

/// Reinterprets the top of RAM as the reset record.
///
/// # Safety
///
/// Returns a raw view of untracked RAM. Only touch it immediately before
/// a reset, or once right after boot before the stack has grown anywhere
/// near the top of RAM.
#[cfg(target_arch = "arm")]
pub unsafe fn reset_record_mut() -> &'static mut ResetRecord {
    // Top of the reference part's DTCM; kept in sync with the port's
    // linker script, which shortens RAM by the record's size.
    let ram_end = 0x2002_0000usize;
    let record = (ram_end - core::mem::size_of::<ResetRecord>()) as *mut ResetRecord;
    &mut *record
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_garbage_record_reads_as_unknown() {
        let record = ResetRecord { magic_start: 0xFFFF_FFFF, reason: 3, magic_end: 0 };
        assert!(!record.is_valid());
        assert_eq!(record.reason(), ResetReason::Unknown);
    }

    #[test]
    fn storing_frames_the_reason_with_both_magics() {
        let mut record = ResetRecord { magic_start: 0, reason: 0, magic_end: 0 };
        record.store(ResetReason::InvalidSignature);
        assert!(record.is_valid());
        assert_eq!(record.reason(), ResetReason::InvalidSignature);
    }

    #[test]
    fn storing_overwrites_the_previous_reason() {
        let mut record = ResetRecord { magic_start: 0, reason: 0, magic_end: 0 };
        record.store(ResetReason::WatchdogTimeout);
        record.store(ResetReason::Fault);
        assert_eq!(record.reason(), ResetReason::Fault);
    }

    #[test]
    fn out_of_range_codes_degrade_to_unknown() {
        let record =
            ResetRecord { magic_start: RECORD_MAGIC_START, reason: 99, magic_end: RECORD_MAGIC_END };
        assert_eq!(record.reason(), ResetReason::Unknown);
    }
}
