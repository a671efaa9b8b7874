// SPDX-License-Identifier: MIT

use core::ops::Range;

use zerocopy::{Immutable, IntoBytes};

/// Linear, forward-only write cursor over a caller-owned buffer.
///
/// The buffer keeps its capacity for the whole build: running past the end is a
/// precondition violation and panics. Skipped bytes (`pad`, `align`) are left
/// untouched, so callers hand in a zero-initialized buffer.
#[derive(Debug)]
pub struct LayoutCursor<'a> {
    buf: &'a mut [u8],
    offset: usize,
}

impl<'a> LayoutCursor<'a> {
    #[inline]
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Reserves `len` bytes and returns their start offset.
    #[track_caller]
    pub fn allocate_bytes(&mut self, len: usize) -> usize {
        let start = self.offset;
        let end = start.checked_add(len).expect("layout: offset overflow");
        assert!(
            end <= self.buf.len(),
            "layout: allocation of {len} bytes at {start} exceeds capacity {}",
            self.buf.len()
        );
        self.offset = end;
        start
    }

    /// Reserves room for `count` values of `T`.
    #[inline]
    #[track_caller]
    pub fn allocate<T>(&mut self, count: usize) -> usize {
        let len = core::mem::size_of::<T>()
            .checked_mul(count)
            .expect("layout: allocation size overflow");
        self.allocate_bytes(len)
    }

    #[inline]
    #[track_caller]
    pub fn pad(&mut self, len: usize) {
        self.allocate_bytes(len);
    }

    /// Pads forward to an absolute offset.
    #[track_caller]
    pub fn pad_to(&mut self, offset: usize) {
        assert!(
            offset >= self.offset,
            "layout: cannot move back from {} to {offset}",
            self.offset
        );
        self.pad(offset - self.offset);
    }

    /// Aligns forward to the next multiple of `alignment` (a power of two).
    #[track_caller]
    pub fn align(&mut self, alignment: usize) {
        assert!(
            alignment.is_power_of_two(),
            "layout: alignment {alignment} is not a power of two"
        );
        let aligned = self
            .offset
            .checked_add(alignment - 1)
            .expect("layout: offset overflow")
            & !(alignment - 1);
        self.pad_to(aligned);
    }

    #[inline]
    #[track_caller]
    pub fn write_byte(&mut self, byte: u8) {
        let at = self.allocate_bytes(1);
        self.buf[at] = byte;
    }

    #[track_caller]
    pub fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        let at = self.allocate_bytes(bytes.len());
        self.buf[at..at + bytes.len()].copy_from_slice(bytes);
        at
    }

    /// Allocates and serializes `val`, returning its offset.
    #[inline]
    #[track_caller]
    pub fn put<T: IntoBytes + Immutable + ?Sized>(&mut self, val: &T) -> usize {
        self.write_bytes(val.as_bytes())
    }

    /// Overwrites a value inside the region already allocated.
    #[track_caller]
    pub fn store<T: IntoBytes + Immutable + ?Sized>(&mut self, offset: usize, val: &T) {
        let bytes = val.as_bytes();
        let end = offset
            .checked_add(bytes.len())
            .expect("layout: offset overflow");
        assert!(
            end <= self.offset,
            "layout: store at {offset}..{end} is past the cursor ({})",
            self.offset
        );
        self.buf[offset..end].copy_from_slice(bytes);
    }

    /// Read-back of an allocated region.
    #[track_caller]
    pub fn bytes(&self, range: Range<usize>) -> &[u8] {
        assert!(
            range.end <= self.offset,
            "layout: read of {range:?} is past the cursor ({})",
            self.offset
        );
        &self.buf[range]
    }

    /// Allocates a new region and fills it with a copy of an earlier one.
    #[track_caller]
    pub fn mirror(&mut self, src: Range<usize>) -> usize {
        assert!(
            src.start <= src.end && src.end <= self.offset,
            "layout: mirror source {src:?} is past the cursor ({})",
            self.offset
        );
        let len = src.end - src.start;
        let at = self.allocate_bytes(len);
        self.buf.copy_within(src, at);
        at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::byteorder::little_endian::U32;

    #[test]
    fn allocate_and_write_advance() {
        let mut buf = [0u8; 64];
        let mut cur = LayoutCursor::new(&mut buf);

        assert_eq!(cur.allocate_bytes(4), 0);
        assert_eq!(cur.allocate::<u64>(2), 4);
        assert_eq!(cur.offset(), 20);
        cur.write_byte(0x55);
        assert_eq!(cur.write_bytes(&[1, 2, 3]), 21);
        assert_eq!(cur.remaining(), 40);
        assert_eq!(buf[20..24], [0x55, 1, 2, 3]);
    }

    #[test]
    fn pad_leaves_bytes_untouched() {
        let mut buf = [0xAAu8; 16];
        let mut cur = LayoutCursor::new(&mut buf);
        cur.pad(8);
        cur.write_byte(1);
        assert_eq!(buf[..8], [0xAA; 8]);
        assert_eq!(buf[8], 1);
    }

    #[test]
    fn align_moves_to_boundary() {
        let mut buf = [0u8; 2048];
        let mut cur = LayoutCursor::new(&mut buf);
        cur.align(512);
        assert_eq!(cur.offset(), 0);
        cur.pad(608);
        cur.align(512);
        assert_eq!(cur.offset(), 1024);
        cur.align(512);
        assert_eq!(cur.offset(), 1024);
    }

    #[test]
    fn put_store_and_read_back() {
        let mut buf = [0u8; 16];
        let mut cur = LayoutCursor::new(&mut buf);
        let at = cur.put(&U32::new(0xDEAD_BEEF));
        assert_eq!(cur.bytes(at..at + 4), [0xEF, 0xBE, 0xAD, 0xDE]);
        cur.store(at, &U32::new(1));
        assert_eq!(cur.bytes(0..4), [1, 0, 0, 0]);
    }

    #[test]
    fn mirror_copies_earlier_region() {
        let mut buf = [0u8; 16];
        let mut cur = LayoutCursor::new(&mut buf);
        cur.write_bytes(&[9, 8, 7]);
        cur.pad(5);
        assert_eq!(cur.mirror(0..3), 8);
        assert_eq!(buf[8..11], [9, 8, 7]);
    }

    #[test]
    #[should_panic(expected = "exceeds capacity")]
    fn overrun_panics() {
        let mut buf = [0u8; 8];
        let mut cur = LayoutCursor::new(&mut buf);
        cur.allocate_bytes(9);
    }

    #[test]
    #[should_panic(expected = "not a power of two")]
    fn bad_alignment_panics() {
        let mut buf = [0u8; 8];
        let mut cur = LayoutCursor::new(&mut buf);
        cur.align(3);
    }

    #[test]
    #[should_panic(expected = "past the cursor")]
    fn store_past_cursor_panics() {
        let mut buf = [0u8; 8];
        let mut cur = LayoutCursor::new(&mut buf);
        cur.pad(2);
        cur.store(0, &U32::new(1));
    }
}
