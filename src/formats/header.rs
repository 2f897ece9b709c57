//! Entry-header codec for both binder generations.
//!
//! ## Generation 3 (BND3 / BHF3)
//! ```text
//! [0x00] Flags                          (u8)
//! [0x01] Reserved, zero                 (3 bytes)
//! [0x04] CompressedSize                 (i32)
//! [0x08] DataOffset                     (u32, or i64 with long offsets)
//! [....] ID                             (i32, if the format has IDs)
//! [....] NameOffset                     (i32, if the format has names)
//! [....] UncompressedSize               (i32, if the format has sizes)
//! ```
//!
//! ## Generation 4 (BND4 / BHF4)
//! ```text
//! [0x00] Flags                          (u8)
//! [0x01] Reserved, zero                 (3 bytes)
//! [0x04] Marker, always -1              (i32)
//! [0x08] CompressedSize                 (i64)
//! [....] UncompressedSize               (i64, if the format has sizes)
//! [....] DataOffset                     (u32, or i64 with long offsets)
//! [....] ID                             (i32, if the format has IDs)
//! [....] NameOffset                     (u32, if the format has names)
//! [....] ID, 0                          (i32 × 2, format 0x20 only)
//! ```
//!
//! Writing is split into three calls per entry (header, name, data) so the
//! container can emit every header before any name and every name before
//! any data. Name and data offsets are absolute within their stream.

use std::borrow::Cow;

use log::{trace, warn};

use crate::compression::{Codec, CompressionType};
use crate::formats::file::BinderFile;
use crate::formats::format::{FileFlags, Format};
use crate::io::{BinaryReader, BinaryWriter, Slot, TextEncoding};
use crate::{Error, Result};

/// Alignment of every entry's stored bytes.
pub(crate) const DATA_ALIGNMENT: usize = 0x10;

/// Header-field widths: generation 3 or generation 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Generation {
    Narrow,
    Wide,
}

/// One decoded entry header. Lives only for the duration of a read.
#[derive(Debug)]
pub(crate) struct EntryHeader {
    flags: FileFlags,
    id: Option<i32>,
    name: Option<String>,
    compressed_size: i64,
    uncompressed_size: Option<i64>,
    data_offset: i64,
}

fn to_usize(value: i64) -> Result<usize> {
    usize::try_from(value).map_err(|_| Error::InvalidRange)
}

fn entry_padding(r: &mut BinaryReader<'_>) -> Result<()> {
    for _ in 0..3 {
        r.assert_u8("entry padding", &[0])?;
    }
    Ok(())
}

impl EntryHeader {
    pub(crate) fn read(
        r: &mut BinaryReader<'_>,
        generation: Generation,
        format: Format,
        names: TextEncoding,
    ) -> Result<Self> {
        match generation {
            Generation::Narrow => Self::read_narrow(r, format, names),
            Generation::Wide => Self::read_wide(r, format, names),
        }
    }

    fn read_narrow(r: &mut BinaryReader<'_>, format: Format, names: TextEncoding) -> Result<Self> {
        let flags = FileFlags(r.u8()?);
        entry_padding(r)?;
        let compressed_size = r.i32()? as i64;
        let data_offset = if format.has_long_offsets() {
            r.i64()?
        } else {
            r.u32()? as i64
        };
        let id = if format.has_id() { Some(r.i32()?) } else { None };
        let name = if format.has_name() {
            let offset = to_usize(r.i32()? as i64)?;
            Some(r.get_cstring(offset, names)?)
        } else {
            None
        };
        let uncompressed_size = if format.has_uncompressed_size() {
            Some(r.i32()? as i64)
        } else {
            None
        };

        Ok(Self {
            flags,
            id,
            name,
            compressed_size,
            uncompressed_size,
            data_offset,
        })
    }

    fn read_wide(r: &mut BinaryReader<'_>, format: Format, names: TextEncoding) -> Result<Self> {
        let flags = FileFlags(r.u8()?);
        entry_padding(r)?;
        r.assert_i32("entry marker", &[-1])?;
        let compressed_size = r.i64()?;
        let uncompressed_size = if format.has_uncompressed_size() {
            Some(r.i64()?)
        } else {
            None
        };
        let data_offset = if format.has_long_offsets() {
            r.i64()?
        } else {
            r.u32()? as i64
        };
        let mut id = if format.has_id() { Some(r.i32()?) } else { None };
        let name = if format.has_name() {
            let offset = r.u32()? as usize;
            Some(r.get_cstring(offset, names)?)
        } else {
            None
        };
        if format.has_trailing_id() {
            id = Some(r.i32()?);
            r.assert_i32("entry trailing zero", &[0])?;
        }

        Ok(Self {
            flags,
            id,
            name,
            compressed_size,
            uncompressed_size,
            data_offset,
        })
    }

    /// Resolve the payload from `data` and produce the logical entry.
    ///
    /// `data` is the stream the data offsets point into: the same buffer as
    /// the headers for single-stream binders, the BDT for split ones.
    pub(crate) fn into_file(self, data: &BinaryReader<'_>, codec: &dyn Codec) -> Result<BinderFile> {
        let stored = data.get_bytes(to_usize(self.data_offset)?, to_usize(self.compressed_size)?)?;

        let (bytes, compression) = if self.flags.is_compressed() {
            let expected = self.uncompressed_size.map(to_usize).transpose()?;
            let (bytes, kind) = codec.decompress(stored, expected)?;
            if let Some(expected) = self.uncompressed_size
                && bytes.len() as i64 != expected
            {
                return Err(Error::Compression(format!(
                    "entry expanded to {} bytes, header says {expected}",
                    bytes.len()
                )));
            }
            (bytes, kind)
        } else {
            (stored.to_vec(), CompressionType::default())
        };

        trace!(
            "entry id={:?} name={:?} offset={:#x} stored={} logical={}",
            self.id,
            self.name,
            self.data_offset,
            stored.len(),
            bytes.len()
        );

        Ok(BinderFile {
            flags: self.flags,
            id: self.id,
            name: self.name,
            compression,
            bytes,
        })
    }
}

#[derive(Debug)]
enum SizeSlot {
    Narrow(Slot<i32>),
    Wide(Slot<i64>),
}

impl SizeSlot {
    fn reserve(w: &mut BinaryWriter, generation: Generation, label: &'static str) -> Self {
        match generation {
            Generation::Narrow => SizeSlot::Narrow(w.reserve(label)),
            Generation::Wide => SizeSlot::Wide(w.reserve(label)),
        }
    }

    fn fill(self, w: &mut BinaryWriter, value: usize) -> Result<()> {
        match self {
            SizeSlot::Narrow(slot) => {
                w.fill(slot, i32::try_from(value).map_err(|_| Error::InvalidRange)?)
            }
            SizeSlot::Wide(slot) => {
                w.fill(slot, i64::try_from(value).map_err(|_| Error::InvalidRange)?)
            }
        }
    }
}

#[derive(Debug)]
enum OffsetSlot {
    Short(Slot<u32>),
    Long(Slot<i64>),
}

impl OffsetSlot {
    fn reserve(w: &mut BinaryWriter, format: Format) -> Self {
        if format.has_long_offsets() {
            OffsetSlot::Long(w.reserve("data offset"))
        } else {
            OffsetSlot::Short(w.reserve("data offset"))
        }
    }

    fn fill(self, w: &mut BinaryWriter, value: usize) -> Result<()> {
        match self {
            OffsetSlot::Short(slot) => {
                w.fill(slot, u32::try_from(value).map_err(|_| Error::InvalidRange)?)
            }
            OffsetSlot::Long(slot) => {
                w.fill(slot, i64::try_from(value).map_err(|_| Error::InvalidRange)?)
            }
        }
    }
}

/// Slots an entry header still owes the writer.
#[derive(Debug)]
pub(crate) struct PendingEntry {
    compressed_size: SizeSlot,
    uncompressed_size: Option<SizeSlot>,
    data_offset: OffsetSlot,
    name_offset: Option<Slot<u32>>,
}

impl PendingEntry {
    /// Write the fixed fields of one header and reserve the rest.
    pub(crate) fn write_header(
        w: &mut BinaryWriter,
        file: &BinderFile,
        generation: Generation,
        format: Format,
    ) -> Self {
        w.write_u8(file.flags.0);
        w.write_zeros(3);

        match generation {
            Generation::Narrow => {
                let compressed_size = SizeSlot::reserve(w, generation, "compressed size");
                let data_offset = OffsetSlot::reserve(w, format);
                if format.has_id() {
                    w.write_i32(file.id.unwrap_or(-1));
                }
                let name_offset = format.has_name().then(|| w.reserve("name offset"));
                let uncompressed_size = format
                    .has_uncompressed_size()
                    .then(|| SizeSlot::reserve(w, generation, "uncompressed size"));
                Self {
                    compressed_size,
                    uncompressed_size,
                    data_offset,
                    name_offset,
                }
            }
            Generation::Wide => {
                w.write_i32(-1);
                let compressed_size = SizeSlot::reserve(w, generation, "compressed size");
                let uncompressed_size = format
                    .has_uncompressed_size()
                    .then(|| SizeSlot::reserve(w, generation, "uncompressed size"));
                let data_offset = OffsetSlot::reserve(w, format);
                if format.has_id() {
                    w.write_i32(file.id.unwrap_or(-1));
                }
                let name_offset = format.has_name().then(|| w.reserve("name offset"));
                if format.has_trailing_id() {
                    w.write_i32(file.id.unwrap_or(-1));
                    w.write_i32(0);
                }
                Self {
                    compressed_size,
                    uncompressed_size,
                    data_offset,
                    name_offset,
                }
            }
        }
    }

    /// Emit the entry's name at the current position and point the header
    /// at it. No-op when the format has no names.
    pub(crate) fn write_name(
        &mut self,
        w: &mut BinaryWriter,
        file: &BinderFile,
        encoding: TextEncoding,
    ) -> Result<()> {
        let Some(slot) = self.name_offset.take() else {
            return Ok(());
        };
        let offset = u32::try_from(w.position()).map_err(|_| Error::InvalidRange)?;
        w.fill(slot, offset)?;
        let name = file.name.as_deref().unwrap_or_else(|| {
            warn!("entry {:?} has no name; writing an empty one", file.id);
            ""
        });
        w.cstring(name, encoding)
    }

    /// Emit the entry's stored bytes and settle its size and offset slots.
    ///
    /// Bytes go to `data` when given (split-stream binders), otherwise to
    /// `headers` itself. The slots always live in `headers`.
    pub(crate) fn write_data(
        self,
        headers: &mut BinaryWriter,
        data: Option<&mut BinaryWriter>,
        file: &BinderFile,
        codec: &dyn Codec,
    ) -> Result<()> {
        let stored: Cow<'_, [u8]> = if file.flags.is_compressed() {
            Cow::Owned(codec.compress(&file.bytes, file.compression)?)
        } else {
            Cow::Borrowed(&file.bytes)
        };

        let offset = {
            let sink = match data {
                Some(sink) => sink,
                None => &mut *headers,
            };
            sink.pad(DATA_ALIGNMENT);
            let offset = sink.position();
            sink.write_bytes(&stored);
            offset
        };

        self.data_offset.fill(headers, offset)?;
        self.compressed_size.fill(headers, stored.len())?;
        if let Some(slot) = self.uncompressed_size {
            slot.fill(headers, file.bytes.len())?;
        }
        Ok(())
    }
}
