// SPDX-License-Identifier: MIT

use core::fmt;

/// First protective-MBR rule a disk image violates.
///
/// The order of the variants is the order in which `verify_disk` checks them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerifyError {
    DiskEmpty,
    DiskNotSectorSized,
    DiskSignatureNotZero,
    ReservedNotZero,
    UnusedRecordsNotZeroed,
    BadBootSignature,
    BootIndicatorNotZero,
    BadStartingChs,
    NotProtectiveType,
    BadEndingChs,
    BadStartingLba,
    BadSizeInLba,
}

impl VerifyError {
    pub fn msg(&self) -> &'static str {
        match self {
            VerifyError::DiskEmpty => "Disk is empty",
            VerifyError::DiskNotSectorSized => "Disk size is not a multiple of the sector size",
            VerifyError::DiskSignatureNotZero => "MBR: disk signature is not zero",
            VerifyError::ReservedNotZero => "MBR: reserved field is not zero",
            VerifyError::UnusedRecordsNotZeroed => "MBR: records 1..3 are not zeroed",
            VerifyError::BadBootSignature => "MBR: invalid boot signature",
            VerifyError::BootIndicatorNotZero => "MBR: protective record boot indicator is not zero",
            VerifyError::BadStartingChs => "MBR: protective record starting CHS is not 0x000200",
            VerifyError::NotProtectiveType => "MBR: record 0 is not of protective type 0xEE",
            VerifyError::BadEndingChs => "MBR: protective record ending CHS is not 0xFFFFFF",
            VerifyError::BadStartingLba => "MBR: protective record does not start at LBA 1",
            VerifyError::BadSizeInLba => "MBR: protective record size does not match the disk",
        }
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        Ok(())
    }
}

/// Which of the two GPT copies a fault was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GptCopy {
    Primary,
    Backup,
}

/// GPT geometry, parameter and structure errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GptError {
    DiskEmpty,
    DiskNotSectorSized,
    DiskTooSmall,
    NoEntrySlots,
    PartitionEmpty,
    PartitionOutsideUsable,
    BadSignature(GptCopy),
    BadRevision(GptCopy),
    BadHeaderSize(GptCopy),
    BadEntrySize(GptCopy),
    HeaderCrcMismatch(GptCopy),
    HeaderLbaMismatch(GptCopy),
    EntriesOutOfBounds(GptCopy),
    EntriesCrcMismatch(GptCopy),
    BackupLocationMismatch,
    BackupLbaNotSwapped,
    BackupEntriesMisplaced,
    BackupEntriesDiffer,
    BackupFieldsDiffer,
}

impl GptError {
    pub fn msg(&self) -> &'static str {
        use GptCopy::*;
        match self {
            GptError::DiskEmpty => "GPT: disk is empty",
            GptError::DiskNotSectorSized => "GPT: disk size is not a multiple of the sector size",
            GptError::DiskTooSmall => "GPT: disk too small (headers/tables)",
            GptError::NoEntrySlots => "GPT: partition entry count is zero",
            GptError::PartitionEmpty => "GPT: zero-sized partition",
            GptError::PartitionOutsideUsable => "GPT: partition starts outside the usable area",
            GptError::BadSignature(Primary) => "GPT: primary header has an invalid signature",
            GptError::BadSignature(Backup) => "GPT: backup header has an invalid signature",
            GptError::BadRevision(Primary) => "GPT: primary header has an unsupported revision",
            GptError::BadRevision(Backup) => "GPT: backup header has an unsupported revision",
            GptError::BadHeaderSize(Primary) => "GPT: primary header_size is not 92",
            GptError::BadHeaderSize(Backup) => "GPT: backup header_size is not 92",
            GptError::BadEntrySize(Primary) => "GPT: primary entry_size is not 128",
            GptError::BadEntrySize(Backup) => "GPT: backup entry_size is not 128",
            GptError::HeaderCrcMismatch(Primary) => "GPT: primary header CRC mismatch",
            GptError::HeaderCrcMismatch(Backup) => "GPT: backup header CRC mismatch",
            GptError::HeaderLbaMismatch(Primary) => "GPT: primary header does not sit at LBA 1",
            GptError::HeaderLbaMismatch(Backup) => "GPT: backup header LBA field does not match its location",
            GptError::EntriesOutOfBounds(Primary) => "GPT: primary entry array is out of bounds",
            GptError::EntriesOutOfBounds(Backup) => "GPT: backup entry array is out of bounds",
            GptError::EntriesCrcMismatch(Primary) => "GPT: primary entries CRC mismatch",
            GptError::EntriesCrcMismatch(Backup) => "GPT: backup entries CRC mismatch",
            GptError::BackupLocationMismatch => "GPT: backup header is not on the last LBA",
            GptError::BackupLbaNotSwapped => "GPT: backup header/alternate LBAs are not swapped",
            GptError::BackupEntriesMisplaced => {
                "GPT: backup entry array does not follow the last usable LBA"
            }
            GptError::BackupEntriesDiffer => "GPT: backup entry array differs from primary",
            GptError::BackupFieldsDiffer => "GPT: backup header fields differ from primary",
        }
    }
}

impl fmt::Display for GptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        Ok(())
    }
}

/// Unified error type for whole-disk checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskError {
    Mbr(VerifyError),
    Gpt(GptError),
}

impl DiskError {
    pub fn msg(&self) -> &'static str {
        match self {
            DiskError::Mbr(e) => e.msg(),
            DiskError::Gpt(e) => e.msg(),
        }
    }
}

impl From<VerifyError> for DiskError {
    fn from(e: VerifyError) -> Self {
        DiskError::Mbr(e)
    }
}

impl From<GptError> for DiskError {
    fn from(e: GptError) -> Self {
        DiskError::Gpt(e)
    }
}

impl fmt::Display for DiskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        Ok(())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for VerifyError {}
#[cfg(feature = "std")]
impl std::error::Error for GptError {}
#[cfg(feature = "std")]
impl std::error::Error for DiskError {}

pub type GptResult<T = ()> = Result<T, GptError>;
