// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::string::String;

use tracing::{debug, warn};
use zerocopy::byteorder::little_endian::{U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::errors::*;
use crate::guids::GptPartitionKind;
use crate::{SECTOR_SIZE, crc32::crc32, cursor::LayoutCursor};

pub const GPT_SIGNATURE: &[u8; 8] = b"EFI PART";
pub const GPT_REVISION: u32 = 0x0001_0000;
/// Bytes covered by the header CRC (the trailing reserved word is excluded).
pub const GPT_HEADER_SIZE: u32 = 92;
pub const GPT_ENTRY_SIZE: u32 = 128;
pub const GPT_DEFAULT_NUM_ENTRIES: u32 = 128;
pub const GPT_PRIMARY_HEADER_LBA: u64 = 1;
pub const GPT_PRIMARY_ENTRIES_LBA: u64 = 2;
pub const GPT_NAME_SIZE: usize = 72;

const SECTOR: usize = SECTOR_SIZE as usize;

/// Byte offset of an LBA inside an in-memory image.
#[inline]
#[track_caller]
pub(crate) fn lba_offset(lba: u64) -> usize {
    lba.checked_mul(SECTOR_SIZE)
        .and_then(|off| usize::try_from(off).ok())
        .expect("gpt: LBA offset does not fit in memory")
}

/// Encodes a partition name as UTF-16LE, truncated to 36 code units.
pub fn encode_gpt_name(name: &str) -> [u8; GPT_NAME_SIZE] {
    let mut buf = [0u8; GPT_NAME_SIZE];
    for (i, c) in name.encode_utf16().take(GPT_NAME_SIZE / 2).enumerate() {
        buf[i * 2..i * 2 + 2].copy_from_slice(&c.to_le_bytes());
    }
    buf
}

/// Decodes a UTF-16LE partition name up to the first NUL.
#[cfg(feature = "alloc")]
pub fn decode_gpt_name(name: &[u8; GPT_NAME_SIZE]) -> String {
    let units = name
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .take_while(|&c| c != 0);
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}

#[derive(
    FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug, PartialEq, Eq,
)]
#[repr(C, packed)]
pub struct GptHeader {
    pub signature: [u8; 8],
    pub revision: U32,
    pub header_size: U32,
    pub header_crc32: U32,
    pub reserved0: U32,
    pub header_lba: U64,
    pub alternate_lba: U64,
    pub first_usable_lba: U64,
    pub last_usable_lba: U64,
    pub disk_guid: [u8; 16],
    pub partition_entry_lba: U64,
    pub partition_entry_count: U32,
    pub partition_entry_size: U32,
    pub partition_entry_crc32: U32,
    pub reserved1: U32,
}

const _: () = assert!(core::mem::size_of::<GptHeader>() == 96);
const _: () = assert!(core::mem::size_of::<GptHeader>() - 4 == GPT_HEADER_SIZE as usize);

#[derive(
    FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug, PartialEq, Eq,
)]
#[repr(C, packed)]
pub struct GptPartitionEntry {
    pub partition_type_guid: [u8; 16],
    pub unique_partition_guid: [u8; 16],
    pub starting_lba: U64,
    /// Inclusive.
    pub ending_lba: U64,
    pub attributes: U64,
    pub partition_name: [u8; GPT_NAME_SIZE],
}

const _: () = assert!(core::mem::size_of::<GptPartitionEntry>() == GPT_ENTRY_SIZE as usize);

/// Sector placement shared by the primary and backup structures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GptGeometry {
    pub total_sectors: u64,
    pub entry_count: u32,
    pub entry_array_sectors: u64,
    pub first_usable_lba: u64,
    pub last_usable_lba: u64,
}

impl GptGeometry {
    /// Lays out a disk of `total_sectors` with an array of `entry_count`
    /// 128-byte entries mirrored at both ends.
    pub fn new(total_sectors: u64, entry_count: u32) -> GptResult<Self> {
        if entry_count == 0 {
            return Err(GptError::NoEntrySlots);
        }
        let entry_array_sectors =
            (entry_count as u64 * GPT_ENTRY_SIZE as u64).div_ceil(SECTOR_SIZE);
        let first_usable_lba = GPT_PRIMARY_ENTRIES_LBA + entry_array_sectors;
        let last_usable_lba = total_sectors
            .checked_sub(1)
            .and_then(|x| x.checked_sub(entry_array_sectors))
            .and_then(|x| x.checked_sub(1))
            .ok_or(GptError::DiskTooSmall)?;
        if first_usable_lba > last_usable_lba {
            return Err(GptError::DiskTooSmall);
        }
        Ok(Self {
            total_sectors,
            entry_count,
            entry_array_sectors,
            first_usable_lba,
            last_usable_lba,
        })
    }

    #[inline]
    pub fn backup_header_lba(&self) -> u64 {
        self.total_sectors - 1
    }

    #[inline]
    pub fn backup_entries_lba(&self) -> u64 {
        self.last_usable_lba + 1
    }

    /// Bytes hashed into the entry-array CRC.
    #[inline]
    pub fn entry_array_len(&self) -> usize {
        self.entry_count as usize * GPT_ENTRY_SIZE as usize
    }
}

impl GptHeader {
    pub fn primary(geo: &GptGeometry, disk_guid: [u8; 16]) -> Self {
        Self {
            signature: *GPT_SIGNATURE,
            revision: U32::new(GPT_REVISION),
            header_size: U32::new(GPT_HEADER_SIZE),
            header_crc32: U32::new(0),
            reserved0: U32::new(0),
            header_lba: U64::new(GPT_PRIMARY_HEADER_LBA),
            alternate_lba: U64::new(geo.backup_header_lba()),
            first_usable_lba: U64::new(geo.first_usable_lba),
            last_usable_lba: U64::new(geo.last_usable_lba),
            disk_guid,
            partition_entry_lba: U64::new(GPT_PRIMARY_ENTRIES_LBA),
            partition_entry_count: U32::new(geo.entry_count),
            partition_entry_size: U32::new(GPT_ENTRY_SIZE),
            partition_entry_crc32: U32::new(0),
            reserved1: U32::new(0),
        }
    }

    /// Mirror of a finished primary header: own/alternate LBAs swapped, entry
    /// array right after the usable area, header CRC recomputed. The entry-array
    /// CRC carries over since both arrays hold the same bytes.
    pub fn to_backup(&self) -> Self {
        let mut backup = *self;
        backup.header_lba = self.alternate_lba;
        backup.alternate_lba = self.header_lba;
        backup.partition_entry_lba = U64::new(self.last_usable_lba.get() + 1);
        backup.seal();
        backup
    }

    /// CRC over `header_size` bytes with the CRC field zeroed.
    pub fn compute_header_crc32(&self) -> u32 {
        let mut h = *self;
        h.header_crc32 = U32::new(0);
        let len = (h.header_size.get() as usize).min(core::mem::size_of::<GptHeader>());
        crc32(&h.as_bytes()[..len])
    }

    /// Recomputes and stores the header CRC.
    #[inline]
    pub fn seal(&mut self) {
        self.header_crc32 = U32::new(self.compute_header_crc32());
    }

    /// Views the header stored at `lba`, if `disk` covers it.
    pub fn read(disk: &[u8], lba: u64) -> Option<&GptHeader> {
        let off = usize::try_from(lba.checked_mul(SECTOR_SIZE)?).ok()?;
        let tail = disk.get(off..)?;
        GptHeader::ref_from_prefix(tail).ok().map(|(h, _)| h)
    }

    #[inline]
    pub fn has_valid_signature(&self) -> bool {
        &self.signature == GPT_SIGNATURE
    }

    /// `entry count × entry size`, saturating on corrupt fields.
    #[inline]
    pub fn entry_array_len(&self) -> u64 {
        (self.partition_entry_count.get() as u64)
            .saturating_mul(self.partition_entry_size.get() as u64)
    }
}

impl GptPartitionEntry {
    pub const EMPTY: GptPartitionEntry = GptPartitionEntry {
        partition_type_guid: [0; 16],
        unique_partition_guid: [0; 16],
        starting_lba: U64::new(0),
        ending_lba: U64::new(0),
        attributes: U64::new(0),
        partition_name: [0; GPT_NAME_SIZE],
    };

    pub fn new(
        type_guid: [u8; 16],
        unique_guid: [u8; 16],
        starting_lba: u64,
        ending_lba: u64,
        attributes: u64,
        name: &str,
    ) -> Self {
        Self {
            partition_type_guid: type_guid,
            unique_partition_guid: unique_guid,
            starting_lba: U64::new(starting_lba),
            ending_lba: U64::new(ending_lba),
            attributes: U64::new(attributes),
            partition_name: encode_gpt_name(name),
        }
    }

    /// Entry of `len_sectors` starting at `starting_lba`, clamped so it never
    /// ends past `last_usable_lba`. A zero length is treated as one sector.
    pub fn spanning(
        type_guid: [u8; 16],
        unique_guid: [u8; 16],
        starting_lba: u64,
        len_sectors: u64,
        last_usable_lba: u64,
    ) -> Self {
        let requested_end = starting_lba.saturating_add(len_sectors.saturating_sub(1));
        let ending_lba = requested_end.min(last_usable_lba);
        if ending_lba != requested_end {
            warn!(
                requested_end,
                ending_lba, "partition clamped to the last usable LBA"
            );
        }
        Self::new(type_guid, unique_guid, starting_lba, ending_lba, 0, "")
    }

    #[inline]
    pub fn kind(&self) -> GptPartitionKind {
        GptPartitionKind::from_guid(&self.partition_type_guid)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.as_bytes().iter().all(|&b| b == 0)
    }

    #[inline]
    pub fn len_sectors(&self) -> u64 {
        self.ending_lba
            .get()
            .saturating_add(1)
            .saturating_sub(self.starting_lba.get())
    }

    #[cfg(feature = "alloc")]
    pub fn name(&self) -> String {
        decode_gpt_name(&self.partition_name)
    }
}

/// Headers as they were written.
#[derive(Clone, Copy, Debug)]
pub struct GptLayout {
    pub primary: GptHeader,
    pub backup: GptHeader,
}

/// Writes both GPT copies through the cursor, which must sit at LBA 1.
///
/// Order on disk: primary header, primary entry array (LBA 2), backup entry
/// array (`last usable + 1`), backup header (last LBA). The cursor ends on the
/// last byte of the disk.
#[track_caller]
pub fn write_gpt(
    cur: &mut LayoutCursor<'_>,
    geo: &GptGeometry,
    disk_guid: [u8; 16],
    entries: &[GptPartitionEntry],
) -> GptLayout {
    assert!(
        entries.len() <= geo.entry_count as usize,
        "gpt: {} entries do not fit {} slots",
        entries.len(),
        geo.entry_count
    );
    assert_eq!(
        cur.offset(),
        lba_offset(GPT_PRIMARY_HEADER_LBA),
        "gpt: primary header must be written at LBA 1"
    );

    let mut primary = GptHeader::primary(geo, disk_guid);
    let header_at = cur.put(&primary);
    cur.align(SECTOR);

    let array_at = cur.put(entries);
    debug_assert_eq!(array_at, lba_offset(GPT_PRIMARY_ENTRIES_LBA));
    cur.pad(geo.entry_array_len() - entries.len() * GPT_ENTRY_SIZE as usize);
    let array = array_at..array_at + geo.entry_array_len();
    cur.align(SECTOR);

    primary.partition_entry_crc32 = U32::new(crc32(cur.bytes(array.clone())));
    primary.seal();
    cur.store(header_at, &primary);
    debug!(
        entries = entries.len(),
        slots = geo.entry_count,
        entries_crc32 = primary.partition_entry_crc32.get(),
        header_crc32 = primary.header_crc32.get(),
        "primary GPT written"
    );

    let backup = primary.to_backup();
    cur.pad_to(lba_offset(backup.partition_entry_lba.get()));
    cur.mirror(array);
    cur.pad_to(lba_offset(backup.header_lba.get()));
    cur.put(&backup);
    cur.align(SECTOR);
    debug!(
        header_lba = backup.header_lba.get(),
        entries_lba = backup.partition_entry_lba.get(),
        header_crc32 = backup.header_crc32.get(),
        "backup GPT written"
    );

    GptLayout { primary, backup }
}
