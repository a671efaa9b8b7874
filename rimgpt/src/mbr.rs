// SPDX-License-Identifier: MIT

use tracing::{debug, warn};
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::{SECTOR_SIZE, cursor::LayoutCursor, saturating_lba32};

pub const MBR_SIZE: usize = 512;
pub const MBR_BOOT_CODE_SIZE: usize = 440;
pub const MBR_DISK_SIGNATURE_OFFSET: usize = 440;
pub const MBR_RESERVED_OFFSET: usize = 444;
pub const MBR_RECORDS_OFFSET: usize = 446;
pub const MBR_RECORD_COUNT: usize = 4;
pub const MBR_BOOT_SIGNATURE_OFFSET: usize = 510;
pub const MBR_BOOT_SIGNATURE: [u8; 2] = [0x55, 0xAA];
pub const PROTECTIVE_GPT: u8 = 0xEE;

/// 24-bit cylinder/head/sector triple, packed little-endian.
#[derive(
    FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug, PartialEq, Eq,
)]
#[repr(transparent)]
pub struct Chs(pub [u8; 3]);

impl Chs {
    /// Starting CHS of the protective record: the sector size (0x000200).
    pub const PROTECTIVE_START: Chs = Chs::from_u32(SECTOR_SIZE as u32);
    /// Ending CHS of the protective record: all ones.
    pub const PROTECTIVE_END: Chs = Chs::from_u32(0x00FF_FFFF);
    pub const ZERO: Chs = Chs([0; 3]);

    /// Packs the low 24 bits of `v`; the top byte is dropped.
    #[inline]
    pub const fn from_u32(v: u32) -> Self {
        let b = v.to_le_bytes();
        Chs([b[0], b[1], b[2]])
    }

    #[inline]
    pub const fn to_u32(self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], 0])
    }
}

#[derive(
    FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug, PartialEq, Eq,
)]
#[repr(C, packed)]
pub struct MbrPartitionRecord {
    pub boot_indicator: u8,
    pub starting_chs: Chs,
    pub os_type: u8,
    pub ending_chs: Chs,
    pub starting_lba: U32,
    pub size_in_lba: U32,
}

const _: () = assert!(core::mem::size_of::<MbrPartitionRecord>() == 16);

impl MbrPartitionRecord {
    pub const EMPTY: MbrPartitionRecord = MbrPartitionRecord {
        boot_indicator: 0,
        starting_chs: Chs::ZERO,
        os_type: 0,
        ending_chs: Chs::ZERO,
        starting_lba: U32::new(0),
        size_in_lba: U32::new(0),
    };

    /// The single record spanning the disk past LBA 0.
    pub fn protective(total_sectors: u64) -> Self {
        let sectors = total_sectors.saturating_sub(1);
        let size_in_lba = saturating_lba32(sectors);
        if u64::from(size_in_lba) != sectors {
            warn!(sectors, size_in_lba, "protective MBR size saturated");
        }
        Self {
            boot_indicator: 0,
            starting_chs: Chs::PROTECTIVE_START,
            os_type: PROTECTIVE_GPT,
            ending_chs: Chs::PROTECTIVE_END,
            starting_lba: U32::new(1),
            size_in_lba: U32::new(size_in_lba),
        }
    }

    #[inline]
    pub fn is_zeroed(&self) -> bool {
        self.as_bytes().iter().all(|&b| b == 0)
    }

    #[inline]
    pub fn is_protective(&self) -> bool {
        self.os_type == PROTECTIVE_GPT
    }
}

#[derive(FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct ProtectiveMbr {
    pub boot_code: [u8; MBR_BOOT_CODE_SIZE],
    /// Legacy disk signature, zero on GPT disks.
    pub disk_signature: U32,
    pub reserved: U16,
    pub records: [MbrPartitionRecord; MBR_RECORD_COUNT],
    pub boot_signature: [u8; 2],
}

const _: () = assert!(core::mem::size_of::<ProtectiveMbr>() == MBR_SIZE);

impl ProtectiveMbr {
    pub fn new(total_sectors: u64) -> Self {
        let mut records = [MbrPartitionRecord::EMPTY; MBR_RECORD_COUNT];
        records[0] = MbrPartitionRecord::protective(total_sectors);
        Self {
            boot_code: [0; MBR_BOOT_CODE_SIZE],
            disk_signature: U32::new(0),
            reserved: U16::new(0),
            records,
            boot_signature: MBR_BOOT_SIGNATURE,
        }
    }

    /// Views the first sector of `disk`, if it is long enough.
    #[inline]
    pub fn read(disk: &[u8]) -> Option<&ProtectiveMbr> {
        ProtectiveMbr::ref_from_prefix(disk).ok().map(|(mbr, _)| mbr)
    }

    #[inline]
    pub fn protective_record(&self) -> &MbrPartitionRecord {
        &self.records[0]
    }
}

/// Writes the protective MBR at the cursor start: boot code, signature and
/// reserved fields are skipped (left zero), then the four records and the boot
/// signature.
///
/// `total_sectors` must be at least 1.
#[track_caller]
pub fn write_protective_mbr(cur: &mut LayoutCursor<'_>, total_sectors: u64) {
    assert!(total_sectors >= 1, "mbr: disk has no sectors");
    assert_eq!(cur.offset(), 0, "mbr: must be written at LBA 0");

    cur.pad(MBR_RECORDS_OFFSET);
    let mut records = [MbrPartitionRecord::EMPTY; MBR_RECORD_COUNT];
    records[0] = MbrPartitionRecord::protective(total_sectors);
    cur.put(&records);
    cur.write_bytes(&MBR_BOOT_SIGNATURE);

    debug!(
        total_sectors,
        size_in_lba = records[0].size_in_lba.get(),
        "protective MBR written"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::mem::offset_of;

    #[test]
    fn field_offsets() {
        assert_eq!(offset_of!(ProtectiveMbr, disk_signature), MBR_DISK_SIGNATURE_OFFSET);
        assert_eq!(offset_of!(ProtectiveMbr, reserved), MBR_RESERVED_OFFSET);
        assert_eq!(offset_of!(ProtectiveMbr, records), MBR_RECORDS_OFFSET);
        assert_eq!(offset_of!(ProtectiveMbr, boot_signature), MBR_BOOT_SIGNATURE_OFFSET);

        assert_eq!(offset_of!(MbrPartitionRecord, starting_chs), 1);
        assert_eq!(offset_of!(MbrPartitionRecord, os_type), 4);
        assert_eq!(offset_of!(MbrPartitionRecord, ending_chs), 5);
        assert_eq!(offset_of!(MbrPartitionRecord, starting_lba), 8);
        assert_eq!(offset_of!(MbrPartitionRecord, size_in_lba), 12);
    }

    #[test]
    fn chs_packing() {
        assert_eq!(Chs::PROTECTIVE_START.0, [0x00, 0x02, 0x00]);
        assert_eq!(Chs::PROTECTIVE_START.to_u32(), 0x200);
        assert_eq!(Chs::PROTECTIVE_END.0, [0xFF; 3]);
        assert_eq!(Chs::from_u32(0x1234_5678).to_u32(), 0x34_5678);
    }

    #[test]
    fn protective_record_bytes() {
        let rec = MbrPartitionRecord::protective(131_072);
        assert_eq!(
            rec.as_bytes(),
            &[
                0x00, 0x00, 0x02, 0x00, 0xEE, 0xFF, 0xFF, 0xFF, 0x01, 0x00, 0x00, 0x00, 0xFF, 0xFF,
                0x01, 0x00,
            ]
        );
    }

    #[test]
    fn protective_size_saturates() {
        let huge = (u32::MAX as u64) + 10;
        assert_eq!(MbrPartitionRecord::protective(huge).size_in_lba.get(), u32::MAX);
        assert_eq!(MbrPartitionRecord::protective(1).size_in_lba.get(), 0);
    }

    #[test]
    fn written_sector_matches_struct() {
        let mut buf = [0u8; 1024];
        let mut cur = LayoutCursor::new(&mut buf);
        write_protective_mbr(&mut cur, 2);
        assert_eq!(cur.offset(), MBR_SIZE);

        let expected = ProtectiveMbr::new(2);
        assert_eq!(&buf[..MBR_SIZE], expected.as_bytes());

        let mbr = ProtectiveMbr::read(&buf).unwrap();
        assert!(mbr.protective_record().is_protective());
        assert!(mbr.records[1..].iter().all(MbrPartitionRecord::is_zeroed));
        assert_eq!(mbr.boot_signature, MBR_BOOT_SIGNATURE);
    }

    #[test]
    fn read_short_buffer() {
        assert!(ProtectiveMbr::read(&[0u8; 511]).is_none());
    }
}
