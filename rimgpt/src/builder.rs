// SPDX-License-Identifier: MIT
#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{vec, vec::Vec};

use tracing::{debug, instrument};

use crate::errors::*;
use crate::gpt::{
    GPT_DEFAULT_NUM_ENTRIES, GPT_NAME_SIZE, GptGeometry, GptLayout, GptPartitionEntry,
    encode_gpt_name, write_gpt,
};
use crate::guids::GPT_PARTITION_TYPE_LINUX;
use crate::mbr::write_protective_mbr;
use crate::{SECTOR_SIZE, cursor::LayoutCursor};

/// Disk GUID of the reference 64 MiB image.
pub const REFERENCE_DISK_GUID: [u8; 16] = [
    0xE0, 0xBD, 0xA4, 0xCC, 0xB1, 0x29, 0x46, 0x42, 0x9D, 0x7A, 0xF5, 0x74, 0xE9, 0x60, 0x37, 0xB0,
];
/// Unique partition GUID of the reference 64 MiB image.
pub const REFERENCE_PARTITION_GUID: [u8; 16] = [
    0x4A, 0xEF, 0x1B, 0xC4, 0x3C, 0xBF, 0x76, 0x40, 0xBF, 0x25, 0x8C, 0x04, 0x14, 0x4A, 0x0C, 0x31,
];

pub const MIB: u64 = 1 << 20;

/// Inputs of a single-partition GPT disk.
///
/// `Default` reproduces the reference image: a 64 MiB disk with one Linux
/// partition at 1 MiB that is requested 64 MiB long and therefore clamped to
/// the last usable LBA.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiskParams {
    /// Total disk size in bytes.
    pub disk_size: u64,
    pub partition_start_lba: u64,
    pub partition_sectors: u64,
    pub entry_count: u32,
    pub disk_guid: [u8; 16],
    pub partition_type_guid: [u8; 16],
    pub unique_partition_guid: [u8; 16],
    pub attributes: u64,
    pub partition_name: [u8; GPT_NAME_SIZE],
}

impl Default for DiskParams {
    fn default() -> Self {
        Self {
            disk_size: 64 * MIB,
            partition_start_lba: MIB / SECTOR_SIZE,
            partition_sectors: 64 * MIB / SECTOR_SIZE,
            entry_count: GPT_DEFAULT_NUM_ENTRIES,
            disk_guid: REFERENCE_DISK_GUID,
            partition_type_guid: GPT_PARTITION_TYPE_LINUX,
            unique_partition_guid: REFERENCE_PARTITION_GUID,
            attributes: 0,
            partition_name: [0; GPT_NAME_SIZE],
        }
    }
}

impl DiskParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_disk_size(mut self, bytes: u64) -> Self {
        self.disk_size = bytes;
        self
    }

    pub fn with_partition(mut self, start_lba: u64, sectors: u64) -> Self {
        self.partition_start_lba = start_lba;
        self.partition_sectors = sectors;
        self
    }

    pub fn with_entry_count(mut self, count: u32) -> Self {
        self.entry_count = count;
        self
    }

    pub fn with_disk_guid(mut self, guid: [u8; 16]) -> Self {
        self.disk_guid = guid;
        self
    }

    pub fn with_partition_type(mut self, guid: [u8; 16]) -> Self {
        self.partition_type_guid = guid;
        self
    }

    pub fn with_partition_guid(mut self, guid: [u8; 16]) -> Self {
        self.unique_partition_guid = guid;
        self
    }

    pub fn with_attributes(mut self, attributes: u64) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.partition_name = encode_gpt_name(name);
        self
    }

    #[inline]
    pub fn total_sectors(&self) -> u64 {
        self.disk_size / SECTOR_SIZE
    }

    #[inline]
    pub fn geometry(&self) -> GptResult<GptGeometry> {
        GptGeometry::new(self.total_sectors(), self.entry_count)
    }

    /// Checked front door for the encoder, which itself only asserts.
    pub fn validate(&self) -> GptResult<()> {
        if self.disk_size == 0 {
            return Err(GptError::DiskEmpty);
        }
        if self.disk_size % SECTOR_SIZE != 0 {
            return Err(GptError::DiskNotSectorSized);
        }
        let geo = self.geometry()?;
        if self.partition_sectors == 0 {
            return Err(GptError::PartitionEmpty);
        }
        if !(geo.first_usable_lba..=geo.last_usable_lba).contains(&self.partition_start_lba) {
            return Err(GptError::PartitionOutsideUsable);
        }
        Ok(())
    }

    /// The partition entry these parameters describe on `geo`.
    pub fn partition_entry(&self, geo: &GptGeometry) -> GptPartitionEntry {
        let mut entry = GptPartitionEntry::spanning(
            self.partition_type_guid,
            self.unique_partition_guid,
            self.partition_start_lba,
            self.partition_sectors,
            geo.last_usable_lba,
        );
        entry.attributes.set(self.attributes);
        entry.partition_name = self.partition_name;
        entry
    }
}

/// Encodes the whole disk into `disk`, which must be zero-filled and exactly
/// `params.disk_size` bytes long.
///
/// Inputs are preconditions, not errors: a mismatched buffer or a disk too
/// small for both GPT copies panics. Use [`DiskParams::validate`] (or
/// [`try_build_disk`]) to reject them gracefully.
#[instrument(level = "debug", skip_all, fields(disk_size = params.disk_size))]
pub fn build_disk_into(disk: &mut [u8], params: &DiskParams) -> GptLayout {
    assert_eq!(
        disk.len() as u64,
        params.disk_size,
        "builder: buffer length does not match the disk size"
    );
    assert!(
        params.disk_size % SECTOR_SIZE == 0,
        "builder: disk size is not a multiple of the sector size"
    );
    let geo = match params.geometry() {
        Ok(geo) => geo,
        Err(e) => panic!("builder: {e}"),
    };

    let mut cur = LayoutCursor::new(disk);
    write_protective_mbr(&mut cur, geo.total_sectors);
    let entry = params.partition_entry(&geo);
    let layout = write_gpt(&mut cur, &geo, params.disk_guid, &[entry]);
    debug_assert_eq!(cur.remaining(), 0);

    debug!(
        total_sectors = geo.total_sectors,
        first_usable = geo.first_usable_lba,
        last_usable = geo.last_usable_lba,
        partition_end = entry.ending_lba.get(),
        "disk layout built"
    );
    layout
}

/// Allocates a zeroed image and encodes it.
#[cfg(feature = "alloc")]
pub fn build_disk(params: &DiskParams) -> Vec<u8> {
    let len =
        usize::try_from(params.disk_size).expect("builder: disk size does not fit in memory");
    let mut disk = vec![0u8; len];
    build_disk_into(&mut disk, params);
    disk
}

/// Validates `params` before encoding.
#[cfg(feature = "alloc")]
pub fn try_build_disk(params: &DiskParams) -> GptResult<Vec<u8>> {
    params.validate()?;
    Ok(build_disk(params))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpt::GptHeader;
    use crate::mbr::ProtectiveMbr;

    fn small() -> DiskParams {
        DiskParams::default()
            .with_disk_size(2 * MIB)
            .with_partition(1024, 1024)
    }

    #[test]
    fn default_matches_reference_inputs() {
        let p = DiskParams::default();
        assert_eq!(p.total_sectors(), 131_072);
        assert_eq!(p.partition_start_lba, 2048);
        assert_eq!(p.partition_sectors, 131_072);
        assert!(p.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_inputs() {
        let p = DiskParams::default();
        assert_eq!(p.with_disk_size(0).validate(), Err(GptError::DiskEmpty));
        assert_eq!(p.with_disk_size(1000).validate(), Err(GptError::DiskNotSectorSized));
        assert_eq!(p.with_disk_size(512 * 40).validate(), Err(GptError::DiskTooSmall));
        assert_eq!(p.with_entry_count(0).validate(), Err(GptError::NoEntrySlots));
        assert_eq!(p.with_partition(2048, 0).validate(), Err(GptError::PartitionEmpty));
        assert_eq!(
            p.with_partition(33, 10).validate(),
            Err(GptError::PartitionOutsideUsable)
        );
        assert_eq!(
            p.with_partition(131_039, 10).validate(),
            Err(GptError::PartitionOutsideUsable)
        );
    }

    #[test]
    fn build_small_disk() {
        let params = small().with_name("primary").with_attributes(1);
        let disk = build_disk(&params);
        assert_eq!(disk.len() as u64, 2 * MIB);

        let mbr = ProtectiveMbr::read(&disk).unwrap();
        assert_eq!(mbr.protective_record().size_in_lba.get(), 4095);

        let hdr = GptHeader::read(&disk, 1).unwrap();
        assert_eq!(hdr.alternate_lba.get(), 4095);
        assert_eq!(hdr.last_usable_lba.get(), 4096 - 34);

        let entry = params.partition_entry(&params.geometry().unwrap());
        assert_eq!(entry.starting_lba.get(), 1024);
        assert_eq!(entry.ending_lba.get(), 2047);
        assert_eq!(entry.attributes.get(), 1);
        assert_eq!(entry.name(), "primary");
    }

    #[test]
    fn try_build_reports_errors() {
        assert_eq!(
            try_build_disk(&small().with_partition(0, 10)),
            Err(GptError::PartitionOutsideUsable)
        );
        assert!(try_build_disk(&small()).is_ok());
    }

    #[test]
    #[should_panic(expected = "buffer length")]
    fn mismatched_buffer_panics() {
        let mut disk = vec![0u8; 4096];
        build_disk_into(&mut disk, &small());
    }

    #[test]
    #[should_panic(expected = "disk too small")]
    fn tiny_disk_panics() {
        let params = small().with_disk_size(512 * 40);
        let mut disk = vec![0u8; 512 * 40];
        build_disk_into(&mut disk, &params);
    }
}
