// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(all(not(feature = "std"), feature = "alloc"))]
extern crate alloc;

#[macro_use]
mod macros;

/// Protective MBR + GPT image builder.
pub mod builder;
/// Table-driven CRC-32 (ISO-HDLC), as mandated for GPT headers and entry arrays.
pub mod crc32;
/// Forward-only write cursor over a caller-owned buffer.
pub mod cursor;
pub mod errors;
/// GUID Partition Table (GPT) header and entry encoding.
pub mod gpt;
/// Common Partition Type GUIDs.
pub mod guids;
/// Protective Master Boot Record (MBR) encoding.
pub mod mbr;
/// Disk verifiers (protective MBR, GPT mirroring).
pub mod verify;

pub use builder::{DiskParams, build_disk_into};
#[cfg(feature = "alloc")]
pub use builder::{build_disk, try_build_disk};
pub use crc32::crc32;
pub use cursor::LayoutCursor;
pub use errors::{DiskError, GptError, GptResult, VerifyError};
pub use verify::{
    LEGACY_SIZE_SENTINEL, ProtectiveSizeRule, VerifyOptions, verify_disk, verify_disk_with,
    verify_full_disk, verify_gpt,
};

/// Logical sector size. Every LBA in this crate is expressed in units of this.
pub const SECTOR_SIZE: u64 = 512;

/// Saturating cast of a sector count into a 32-bit LBA field.
///
/// Legacy MBR records only carry 32-bit sizes: anything larger is clamped to
/// `u32::MAX`, so two different oversized disks report the same value.
#[inline]
pub const fn saturating_lba32(sectors: u64) -> u32 {
    if sectors > u32::MAX as u64 {
        u32::MAX
    } else {
        sectors as u32
    }
}
