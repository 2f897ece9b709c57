//! Append-only writer with reserve-then-fill slots.
//!
//! Container headers point at data whose position is only known once that
//! data has been emitted. The writer hands out a [`Slot`] for each such
//! field, writes zeros in its place and lets the caller patch it later.
//! [`BinaryWriter::finish`] refuses to release the bytes while any slot is
//! still unfilled.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::io::text::TextEncoding;
use crate::{Error, Result};

static NEXT_SESSION: AtomicU32 = AtomicU32::new(1);

mod sealed {
    pub trait Sealed {}
    impl Sealed for u32 {}
    impl Sealed for i32 {}
    impl Sealed for i64 {}
}

/// Integer types that may back a reserved slot.
pub trait SlotValue: Copy + sealed::Sealed {
    /// Encoded width in bytes.
    const WIDTH: usize;

    #[doc(hidden)]
    fn encode(self, big_endian: bool, out: &mut [u8]);
}

macro_rules! slot_value {
    ($($ty:ty),*) => {$(
        impl SlotValue for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            fn encode(self, big_endian: bool, out: &mut [u8]) {
                let bytes = if big_endian { self.to_be_bytes() } else { self.to_le_bytes() };
                out.copy_from_slice(&bytes);
            }
        }
    )*};
}

slot_value!(u32, i32, i64);

/// Handle to a reserved field.
///
/// Handles are move-only: [`BinaryWriter::fill`] consumes them, so a slot
/// cannot be filled twice through safe use. Each handle remembers the writer
/// that issued it.
#[derive(Debug)]
#[must_use = "a reserved slot must be filled before the writer finishes"]
pub struct Slot<T> {
    session: u32,
    index: usize,
    _value: PhantomData<T>,
}

#[derive(Debug)]
struct Reservation {
    label: &'static str,
    offset: usize,
    filled: bool,
}

/// Growable output buffer for one write session.
#[derive(Debug)]
pub struct BinaryWriter {
    buf: Vec<u8>,
    big_endian: bool,
    session: u32,
    slots: Vec<Reservation>,
}

macro_rules! write_num {
    ($($name:ident => $ty:ty;)*) => {$(
        #[doc = concat!("Write a `", stringify!($ty), "`.")]
        #[inline]
        pub fn $name(&mut self, value: $ty) {
            let bytes = if self.big_endian { value.to_be_bytes() } else { value.to_le_bytes() };
            self.buf.extend_from_slice(&bytes);
        }
    )*};
}

impl BinaryWriter {
    /// Empty writer encoding multi-byte values in the given byte order.
    pub fn new(big_endian: bool) -> Self {
        Self {
            buf: Vec::new(),
            big_endian,
            session: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            slots: Vec::new(),
        }
    }

    /// Whether multi-byte values are encoded big-endian.
    #[inline]
    pub fn big_endian(&self) -> bool {
        self.big_endian
    }

    /// Current write position, i.e. bytes written so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// Append one byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Append `0` or `1`.
    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    write_num! {
        write_u16 => u16;
        write_i16 => i16;
        write_u32 => u32;
        write_i32 => i32;
        write_u64 => u64;
        write_i64 => i64;
        write_f32 => f32;
    }

    /// Append raw bytes unchanged.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Append `count` zero bytes.
    pub fn write_zeros(&mut self, count: usize) {
        self.buf.resize(self.buf.len() + count, 0);
    }

    /// Write zeros until the position is a multiple of `align`.
    pub fn pad(&mut self, align: usize) {
        let rem = self.buf.len() % align;
        if rem != 0 {
            self.write_zeros(align - rem);
        }
    }

    /// Write `text` into a field of exactly `len` bytes, zero-filled.
    pub fn fixed_string(&mut self, text: &str, encoding: TextEncoding, len: usize) -> Result<()> {
        let bytes = encoding.encode(text, self.big_endian)?;
        if bytes.len() > len {
            return Err(Error::Text("string longer than its fixed field"));
        }
        self.write_bytes(&bytes);
        self.write_zeros(len - bytes.len());
        Ok(())
    }

    /// Write `text` followed by a terminator of the encoding's unit width.
    pub fn cstring(&mut self, text: &str, encoding: TextEncoding) -> Result<()> {
        let bytes = encoding.encode(text, self.big_endian)?;
        self.write_bytes(&bytes);
        self.write_zeros(encoding.unit_width());
        Ok(())
    }

    /// Reserve a `T`-wide field at the current position.
    ///
    /// `label` only shows up in error messages.
    pub fn reserve<T: SlotValue>(&mut self, label: &'static str) -> Slot<T> {
        let index = self.slots.len();
        self.slots.push(Reservation {
            label,
            offset: self.buf.len(),
            filled: false,
        });
        self.write_zeros(T::WIDTH);
        Slot {
            session: self.session,
            index,
            _value: PhantomData,
        }
    }

    /// Patch a reserved field with its final value.
    pub fn fill<T: SlotValue>(&mut self, slot: Slot<T>, value: T) -> Result<()> {
        if slot.session != self.session {
            return Err(Error::ForeignSlot);
        }
        let big_endian = self.big_endian;
        let Some(reservation) = self.slots.get_mut(slot.index) else {
            return Err(Error::ForeignSlot);
        };
        reservation.filled = true;
        let offset = reservation.offset;
        value.encode(big_endian, &mut self.buf[offset..offset + T::WIDTH]);
        Ok(())
    }

    /// Number of reservations not yet filled.
    pub fn outstanding(&self) -> usize {
        self.slots.iter().filter(|s| !s.filled).count()
    }

    /// Release the written bytes.
    ///
    /// Fails with [`Error::UnfilledSlots`] if any reservation is still open.
    pub fn finish(self) -> Result<Vec<u8>> {
        let open: Vec<&'static str> = self
            .slots
            .iter()
            .filter(|s| !s.filled)
            .map(|s| s.label)
            .collect();
        if !open.is_empty() {
            return Err(Error::UnfilledSlots(open));
        }
        Ok(self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_patches_in_place() {
        let mut w = BinaryWriter::new(false);
        w.write_u8(0xAA);
        let slot = w.reserve::<u32>("offset");
        w.write_u8(0xBB);
        w.fill(slot, w.position() as u32).unwrap();
        assert_eq!(w.finish().unwrap(), [0xAA, 0x06, 0, 0, 0, 0xBB]);
    }

    #[test]
    fn big_endian_slots() {
        let mut w = BinaryWriter::new(true);
        let slot = w.reserve::<i64>("size");
        w.write_i32(-1);
        w.fill(slot, 0x0102).unwrap();
        assert_eq!(
            w.finish().unwrap(),
            [0, 0, 0, 0, 0, 0, 1, 2, 0xFF, 0xFF, 0xFF, 0xFF]
        );
    }

    #[test]
    fn finish_fails_exactly_when_slots_remain() {
        for reserved in 0..4usize {
            for filled in 0..=reserved {
                let mut w = BinaryWriter::new(false);
                let slots: Vec<Slot<i32>> = (0..reserved).map(|_| w.reserve("n")).collect();
                for slot in slots.into_iter().take(filled) {
                    w.fill(slot, 1).unwrap();
                }
                assert_eq!(w.outstanding(), reserved - filled);
                let result = w.finish();
                if filled == reserved {
                    assert!(result.is_ok());
                } else {
                    assert!(matches!(result, Err(Error::UnfilledSlots(v)) if v.len() == reserved - filled));
                }
            }
        }
    }

    #[test]
    fn slots_from_another_writer_are_rejected() {
        let mut a = BinaryWriter::new(false);
        let mut b = BinaryWriter::new(false);
        let slot = a.reserve::<u32>("a");
        let _ = b.reserve::<u32>("b");
        assert!(matches!(b.fill(slot, 1), Err(Error::ForeignSlot)));
    }

    #[test]
    fn pad_aligns_to_boundary() {
        let mut w = BinaryWriter::new(false);
        w.pad(0x10);
        assert_eq!(w.position(), 0);
        w.write_u8(1);
        w.pad(0x10);
        assert_eq!(w.position(), 0x10);
        w.pad(0x10);
        assert_eq!(w.position(), 0x10);
    }

    #[test]
    fn strings_are_terminated_and_padded() {
        let mut w = BinaryWriter::new(false);
        w.fixed_string("07D7R6", TextEncoding::Ascii, 8).unwrap();
        w.cstring("a", TextEncoding::Utf16).unwrap();
        assert_eq!(w.finish().unwrap(), b"07D7R6\0\0a\0\0\0");

        let mut w = BinaryWriter::new(false);
        assert!(w.fixed_string("123456789", TextEncoding::Ascii, 8).is_err());
    }
}
