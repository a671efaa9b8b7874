// SPDX-License-Identifier: MIT

//! Reflected CRC-32 (ISO-HDLC): polynomial 0xEDB88320, register seeded with
//! 0xFFFFFFFF and inverted on output. Processed one byte at a time through a
//! 256-entry table, so any independent reader (firmware, loaders) gets the
//! same bits.

pub const CRC32_POLY: u32 = 0xEDB8_8320;
const CRC32_INIT: u32 = 0xFFFF_FFFF;

/// Lookup table indexed by `(register ^ byte) & 0xFF`.
pub const CRC32_TABLE: [u32; 256] = make_table();

const fn make_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut c = i as u32;
        let mut k = 0;
        while k < 8 {
            c = if c & 1 != 0 { (c >> 1) ^ CRC32_POLY } else { c >> 1 };
            k += 1;
        }
        table[i] = c;
        i += 1;
    }
    table
}

/// Streaming hasher. Feeding the same bytes in any split yields the same value
/// as a single [`crc32`] call.
#[derive(Clone, Copy, Debug)]
pub struct Crc32 {
    state: u32,
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Crc32 {
    #[inline]
    pub const fn new() -> Self {
        Self { state: CRC32_INIT }
    }

    #[inline]
    pub fn update(&mut self, bytes: &[u8]) {
        let mut crc = self.state;
        for &b in bytes {
            crc = CRC32_TABLE[((crc ^ b as u32) & 0xFF) as usize] ^ (crc >> 8);
        }
        self.state = crc;
    }

    #[inline]
    pub const fn finalize(self) -> u32 {
        self.state ^ CRC32_INIT
    }
}

/// One-shot CRC-32 over `bytes`. An empty slice yields 0.
#[inline]
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut hasher = Crc32::new();
    hasher.update(bytes);
    hasher.finalize()
}
