// SPDX-License-Identifier: MIT

use tracing::trace;

use crate::errors::*;
use crate::gpt::{GPT_ENTRY_SIZE, GPT_HEADER_SIZE, GPT_PRIMARY_HEADER_LBA, GPT_REVISION, GptHeader};
use crate::mbr::{Chs, MBR_BOOT_SIGNATURE, PROTECTIVE_GPT, ProtectiveMbr};
use crate::{SECTOR_SIZE, crc32::crc32, saturating_lba32};

/// Size the protective record historically had to carry, whatever the disk.
pub const LEGACY_SIZE_SENTINEL: u32 = 0x00FF_FFFF;

/// What `size_in_lba` of the protective record is compared against.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProtectiveSizeRule {
    /// `len / 512 - 1`, saturated to 32 bits.
    #[default]
    FromDiskLength,
    /// A fixed value. `Fixed(LEGACY_SIZE_SENTINEL)` only accepts disks of
    /// exactly 0x1000000 sectors.
    Fixed(u32),
}

impl ProtectiveSizeRule {
    #[inline]
    pub fn expected(&self, disk_len: usize) -> u32 {
        match *self {
            ProtectiveSizeRule::FromDiskLength => {
                saturating_lba32((disk_len as u64 / SECTOR_SIZE).saturating_sub(1))
            }
            ProtectiveSizeRule::Fixed(v) => v,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VerifyOptions {
    pub size_rule: ProtectiveSizeRule,
}

impl VerifyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size_rule(mut self, rule: ProtectiveSizeRule) -> Self {
        self.size_rule = rule;
        self
    }
}

#[inline]
fn reject<E: core::fmt::Display>(e: E) -> Result<(), E> {
    trace!(error = %e, "disk rejected");
    Err(e)
}

/// Checks the protective MBR of `disk` with the default options.
///
/// Returns the first violated rule. Never panics, whatever the input.
pub fn verify_disk(disk: &[u8]) -> Result<(), VerifyError> {
    verify_disk_with(disk, VerifyOptions::default())
}

/// Checks the protective MBR of `disk`. Rules are evaluated in the order of
/// [`VerifyError`]'s variants and the first one violated is returned.
pub fn verify_disk_with(disk: &[u8], opts: VerifyOptions) -> Result<(), VerifyError> {
    if disk.is_empty() {
        return reject(VerifyError::DiskEmpty);
    }
    if disk.len() % SECTOR_SIZE as usize != 0 {
        return reject(VerifyError::DiskNotSectorSized);
    }
    let Some(mbr) = ProtectiveMbr::read(disk) else {
        return reject(VerifyError::DiskNotSectorSized);
    };

    if mbr.disk_signature.get() != 0 {
        return reject(VerifyError::DiskSignatureNotZero);
    }
    if mbr.reserved.get() != 0 {
        return reject(VerifyError::ReservedNotZero);
    }
    if !mbr.records[1..].iter().all(|r| r.is_zeroed()) {
        return reject(VerifyError::UnusedRecordsNotZeroed);
    }
    if mbr.boot_signature != MBR_BOOT_SIGNATURE {
        return reject(VerifyError::BadBootSignature);
    }

    let rec = mbr.protective_record();
    if rec.boot_indicator != 0 {
        return reject(VerifyError::BootIndicatorNotZero);
    }
    if rec.starting_chs != Chs::PROTECTIVE_START {
        return reject(VerifyError::BadStartingChs);
    }
    if rec.os_type != PROTECTIVE_GPT {
        return reject(VerifyError::NotProtectiveType);
    }
    if rec.ending_chs != Chs::PROTECTIVE_END {
        return reject(VerifyError::BadEndingChs);
    }
    if rec.starting_lba.get() != 1 {
        return reject(VerifyError::BadStartingLba);
    }
    let expected = opts.size_rule.expected(disk.len());
    if rec.size_in_lba.get() != expected {
        trace!(
            found = rec.size_in_lba.get(),
            expected, "protective size mismatch"
        );
        return reject(VerifyError::BadSizeInLba);
    }

    trace!(disk_len = disk.len(), "protective MBR ok");
    Ok(())
}

/// Header-level checks shared by both copies.
fn check_header(disk: &[u8], lba: u64, copy: GptCopy) -> GptResult<&GptHeader> {
    let hdr = GptHeader::read(disk, lba).ok_or(GptError::DiskTooSmall)?;
    if !hdr.has_valid_signature() {
        return Err(GptError::BadSignature(copy));
    }
    if hdr.revision.get() != GPT_REVISION {
        return Err(GptError::BadRevision(copy));
    }
    if hdr.header_size.get() != GPT_HEADER_SIZE {
        return Err(GptError::BadHeaderSize(copy));
    }
    if hdr.partition_entry_size.get() != GPT_ENTRY_SIZE {
        return Err(GptError::BadEntrySize(copy));
    }
    if hdr.compute_header_crc32() != hdr.header_crc32.get() {
        return Err(GptError::HeaderCrcMismatch(copy));
    }
    if hdr.header_lba.get() != lba {
        return Err(GptError::HeaderLbaMismatch(copy));
    }
    Ok(hdr)
}

/// The entry array a header points at, after checking its CRC.
fn check_entries<'a>(disk: &'a [u8], hdr: &GptHeader, copy: GptCopy) -> GptResult<&'a [u8]> {
    let array = hdr
        .partition_entry_lba
        .get()
        .checked_mul(SECTOR_SIZE)
        .and_then(|start| Some(start..start.checked_add(hdr.entry_array_len())?))
        .and_then(|r| Some(usize::try_from(r.start).ok()?..usize::try_from(r.end).ok()?))
        .and_then(|r| disk.get(r))
        .ok_or(GptError::EntriesOutOfBounds(copy))?;
    if crc32(array) != hdr.partition_entry_crc32.get() {
        return Err(GptError::EntriesCrcMismatch(copy));
    }
    Ok(array)
}

fn verify_gpt_inner(disk: &[u8]) -> GptResult {
    if disk.is_empty() {
        return Err(GptError::DiskEmpty);
    }
    if disk.len() % SECTOR_SIZE as usize != 0 {
        return Err(GptError::DiskNotSectorSized);
    }
    let last_lba = disk.len() as u64 / SECTOR_SIZE - 1;

    let primary = check_header(disk, GPT_PRIMARY_HEADER_LBA, GptCopy::Primary)?;
    let primary_array = check_entries(disk, primary, GptCopy::Primary)?;
    trace!(
        entries_crc32 = primary.partition_entry_crc32.get(),
        "primary GPT ok"
    );

    if primary.alternate_lba.get() != last_lba {
        return Err(GptError::BackupLocationMismatch);
    }
    let backup = check_header(disk, last_lba, GptCopy::Backup)?;
    if backup.header_lba != primary.alternate_lba || backup.alternate_lba != primary.header_lba {
        return Err(GptError::BackupLbaNotSwapped);
    }
    if backup.partition_entry_lba.get() != primary.last_usable_lba.get().wrapping_add(1) {
        return Err(GptError::BackupEntriesMisplaced);
    }
    let backup_array = check_entries(disk, backup, GptCopy::Backup)?;
    if backup_array != primary_array {
        return Err(GptError::BackupEntriesDiffer);
    }

    let mut normalized = *backup;
    normalized.header_lba = primary.header_lba;
    normalized.alternate_lba = primary.alternate_lba;
    normalized.partition_entry_lba = primary.partition_entry_lba;
    normalized.header_crc32 = primary.header_crc32;
    if normalized != *primary {
        return Err(GptError::BackupFieldsDiffer);
    }

    trace!(backup_lba = last_lba, "backup GPT ok");
    Ok(())
}

/// Checks both GPT copies of `disk` and their mirroring.
pub fn verify_gpt(disk: &[u8]) -> GptResult {
    verify_gpt_inner(disk).or_else(reject)
}

/// [`verify_disk`] then [`verify_gpt`].
pub fn verify_full_disk(disk: &[u8]) -> Result<(), DiskError> {
    verify_disk(disk)?;
    verify_gpt(disk)?;
    Ok(())
}
