//! Cursor over a borrowed byte slice.
//!
//! Every read either returns exactly what it promises or fails; there is no
//! partial-read state to clean up. Multi-byte values honour the reader's
//! endianness flag, which containers set once after inspecting their header.

use crate::io::text::TextEncoding;
use crate::{Error, Result};

/// Sequential reader with slice-based random access.
///
/// Sequential methods advance the position. The `get_*` family reads at an
/// absolute offset and never touches it, which is how name and data pools
/// are resolved in whatever order the header table references them.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    buf: &'a [u8],
    pos: usize,
    big_endian: bool,
}

macro_rules! read_num {
    ($($seq:ident, $get:ident => $ty:ty;)*) => {$(
        #[doc = concat!("Read a `", stringify!($ty), "` and advance.")]
        #[inline]
        pub fn $seq(&mut self) -> Result<$ty> {
            let raw = self.array()?;
            Ok(<$ty>::from_le_bytes(self.ordered(raw)))
        }

        #[doc = concat!("Read a `", stringify!($ty), "` at `offset` without moving.")]
        #[inline]
        pub fn $get(&self, offset: usize) -> Result<$ty> {
            let raw = self.get_array(offset)?;
            Ok(<$ty>::from_le_bytes(self.ordered(raw)))
        }
    )*};
}

impl<'a> BinaryReader<'a> {
    /// Create a little-endian reader positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            big_endian: false,
        }
    }

    /// Whether multi-byte values are decoded big-endian.
    #[inline]
    pub fn big_endian(&self) -> bool {
        self.big_endian
    }

    /// Switch byte order for every subsequent multi-byte read.
    #[inline]
    pub fn set_big_endian(&mut self, big_endian: bool) {
        self.big_endian = big_endian;
    }

    /// Offset of the next sequential read.
    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Total length of the underlying buffer.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Bytes left after the current position.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Move to an absolute offset. Seeking exactly to the end is allowed.
    pub fn seek(&mut self, offset: usize) -> Result<()> {
        if offset > self.buf.len() {
            return Err(Error::InvalidRange);
        }
        self.pos = offset;
        Ok(())
    }

    /// Advance by `count` bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    /// Run `f` with the cursor moved to `offset`, then restore the position.
    ///
    /// The position is restored on both success and failure.
    pub fn peek_at<T>(
        &mut self,
        offset: usize,
        f: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<T> {
        let saved = self.pos;
        let result = self.seek(offset).and_then(|()| f(self));
        self.pos = saved;
        result
    }

    /// Swap the byte window so little-endian decoding yields the right value.
    #[inline]
    fn ordered<const N: usize>(&self, mut raw: [u8; N]) -> [u8; N] {
        if self.big_endian {
            raw.reverse();
        }
        raw
    }

    /// Read exactly `len` bytes and advance.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(len).ok_or(Error::UnexpectedEof)?;
        let slice = self.buf.get(self.pos..end).ok_or(Error::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    /// Read exactly `N` bytes into a fixed-size array.
    #[inline]
    pub fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Borrow `len` bytes at `offset` without moving.
    pub fn get_bytes(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        let end = offset.checked_add(len).ok_or(Error::InvalidRange)?;
        self.buf.get(offset..end).ok_or(Error::InvalidRange)
    }

    #[inline]
    fn get_array<const N: usize>(&self, offset: usize) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.get_bytes(offset, N)?);
        Ok(out)
    }

    /// Read one byte.
    #[inline]
    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    /// Read one signed byte.
    #[inline]
    pub fn i8(&mut self) -> Result<i8> {
        Ok(self.u8()? as i8)
    }

    /// Read one byte at `offset` without moving.
    #[inline]
    pub fn get_u8(&self, offset: usize) -> Result<u8> {
        Ok(self.get_array::<1>(offset)?[0])
    }

    read_num! {
        u16, get_u16 => u16;
        i16, get_i16 => i16;
        u32, get_u32 => u32;
        i32, get_i32 => i32;
        u64, get_u64 => u64;
        i64, get_i64 => i64;
        f32, get_f32 => f32;
    }

    /// Read `count` consecutive `f32` values.
    pub fn f32s(&mut self, count: usize) -> Result<Vec<f32>> {
        (0..count).map(|_| self.f32()).collect()
    }

    /// Read a boolean byte; anything other than 0 or 1 is corruption.
    pub fn bool(&mut self, field: &'static str) -> Result<bool> {
        Ok(self.assert_u8(field, &[0, 1])? == 1)
    }

    /// Read a byte and check it against the accepted values.
    pub fn assert_u8(&mut self, field: &'static str, expected: &[u8]) -> Result<u8> {
        let offset = self.pos;
        let found = self.u8()?;
        if !expected.contains(&found) {
            return Err(Error::Assert {
                field,
                offset,
                found: found as i64,
            });
        }
        Ok(found)
    }

    /// Read an `i32` and check it against the accepted values.
    pub fn assert_i32(&mut self, field: &'static str, expected: &[i32]) -> Result<i32> {
        let offset = self.pos;
        let found = self.i32()?;
        if !expected.contains(&found) {
            return Err(Error::Assert {
                field,
                offset,
                found: found as i64,
            });
        }
        Ok(found)
    }

    /// Read an `i64` and check it against the accepted values.
    pub fn assert_i64(&mut self, field: &'static str, expected: &[i64]) -> Result<i64> {
        let offset = self.pos;
        let found = self.i64()?;
        if !expected.contains(&found) {
            return Err(Error::Assert {
                field,
                offset,
                found,
            });
        }
        Ok(found)
    }

    /// Verify a 4-byte container marker.
    ///
    /// Returns [`Error::BadMagic`] on mismatch.
    pub fn assert_magic(&mut self, expected: &[u8; 4]) -> Result<()> {
        let found = self.array::<4>()?;
        if &found != expected {
            return Err(Error::BadMagic(found));
        }
        Ok(())
    }

    /// Read a fixed-width string, trimmed at the first terminator.
    pub fn fixed_string(&mut self, encoding: TextEncoding, len: usize) -> Result<String> {
        let raw = self.take(len)?;
        let end = terminator(raw, encoding).unwrap_or(raw.len());
        encoding.decode(&raw[..end], self.big_endian)
    }

    /// Read a null-terminated string and advance past its terminator.
    pub fn cstring(&mut self, encoding: TextEncoding) -> Result<String> {
        let start = self.pos;
        let tail = self.buf.get(start..).ok_or(Error::InvalidRange)?;
        let end = terminator(tail, encoding).ok_or(Error::UnterminatedString(start))?;
        self.pos = start + end + encoding.unit_width();
        encoding.decode(&tail[..end], self.big_endian)
    }

    /// Read a null-terminated string at `offset` without moving.
    pub fn get_cstring(&self, offset: usize, encoding: TextEncoding) -> Result<String> {
        let tail = self.buf.get(offset..).ok_or(Error::InvalidRange)?;
        let end = terminator(tail, encoding).ok_or(Error::UnterminatedString(offset))?;
        encoding.decode(&tail[..end], self.big_endian)
    }
}

/// Byte index of the first zero code unit in `raw`, if any.
fn terminator(raw: &[u8], encoding: TextEncoding) -> Option<usize> {
    match encoding.unit_width() {
        2 => raw
            .chunks_exact(2)
            .position(|unit| unit == [0, 0])
            .map(|i| i * 2),
        _ => raw.iter().position(|&b| b == 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endianness_flips_the_window() {
        let data = [0x12, 0x34, 0x56, 0x78];
        let mut r = BinaryReader::new(&data);
        assert_eq!(r.u32().unwrap(), 0x7856_3412);
        r.seek(0).unwrap();
        r.set_big_endian(true);
        assert_eq!(r.u32().unwrap(), 0x1234_5678);
        assert_eq!(r.get_u16(2).unwrap(), 0x5678);
    }

    #[test]
    fn peek_restores_position_even_on_failure() {
        let data = [1u8, 2, 3, 4];
        let mut r = BinaryReader::new(&data);
        r.u8().unwrap();
        let got = r.peek_at(3, |r| r.u8()).unwrap();
        assert_eq!(got, 4);
        assert_eq!(r.position(), 1);

        assert!(r.peek_at(3, |r| r.u32()).is_err());
        assert_eq!(r.position(), 1);
        assert!(r.peek_at(10, |r| r.u8()).is_err());
        assert_eq!(r.position(), 1);
    }

    #[test]
    fn sequential_reads_stop_at_end() {
        let data = [0u8; 3];
        let mut r = BinaryReader::new(&data);
        assert!(matches!(r.u32(), Err(Error::UnexpectedEof)));
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn assert_reports_offset_and_value() {
        let data = [0u8, 7];
        let mut r = BinaryReader::new(&data);
        r.assert_u8("first", &[0]).unwrap();
        match r.assert_u8("second", &[0, 1]) {
            Err(Error::Assert {
                field,
                offset,
                found,
            }) => {
                assert_eq!(field, "second");
                assert_eq!(offset, 1);
                assert_eq!(found, 7);
            }
            other => panic!("expected assert failure, got {other:?}"),
        }
    }

    #[test]
    fn cstrings_in_each_encoding() {
        let data = b"ab\0c\0\0\0x";
        let mut r = BinaryReader::new(data);
        assert_eq!(r.cstring(TextEncoding::Ascii).unwrap(), "ab");
        assert_eq!(r.position(), 3);
        // "c" as UTF-16LE followed by a zero unit.
        assert_eq!(r.cstring(TextEncoding::Utf16).unwrap(), "c");
        assert_eq!(r.position(), 7);
        assert!(matches!(
            r.cstring(TextEncoding::Ascii),
            Err(Error::UnterminatedString(7))
        ));
        assert_eq!(r.get_cstring(0, TextEncoding::ShiftJis).unwrap(), "ab");
    }

    #[test]
    fn fixed_string_trims_at_terminator() {
        let data = b"07D7R6\0\0rest";
        let mut r = BinaryReader::new(data);
        assert_eq!(r.fixed_string(TextEncoding::Ascii, 8).unwrap(), "07D7R6");
        assert_eq!(r.position(), 8);
    }

    #[test]
    fn floats_follow_endianness() {
        let mut data = Vec::new();
        data.extend_from_slice(&1.5f32.to_be_bytes());
        data.extend_from_slice(&(-2.0f32).to_be_bytes());
        let mut r = BinaryReader::new(&data);
        r.set_big_endian(true);
        assert_eq!(r.f32s(2).unwrap(), vec![1.5, -2.0]);
    }

    #[test]
    fn bad_magic_carries_found_bytes() {
        let mut r = BinaryReader::new(b"ZIP\0");
        assert!(matches!(
            r.assert_magic(b"BND4"),
            Err(Error::BadMagic(found)) if &found == b"ZIP\0"
        ));
    }
}
