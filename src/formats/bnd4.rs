//! BND4 - generation-4 single-stream binder.
//!
//! ## Layout
//! ```text
//! [0x00] BND4 header   (0x40 bytes)
//! [0x40] Entry headers (FileCount × header size)
//! [...]  Name pool     (UTF-16 if Unicode, else Shift-JIS; if the format has names)
//! [...]  Aux tables    (Extended == 4 only, aligned to 8)
//! [...]  Data pool     (each entry aligned to 0x10)
//! ```
//!
//! ## BND4 Header (0x40 bytes)
//! ```text
//! [0x00] Magic "BND4"                   (4 bytes)
//! [0x04] Unk04                          (u8, 0/1, preserved)
//! [0x05] Unk05                          (u8, 0/1, preserved)
//! [0x06] Reserved, zero                 (3 bytes)
//! [0x09] BigEndian                      (u8, 0/1)
//! [0x0A] !BitBigEndian                  (u8, 0/1, preserved)
//! [0x0B] Reserved, zero                 (u8)
//! [0x0C] FileCount                      (i32)
//! [0x10] HeaderSize, always 0x40        (i64)
//! [0x18] Signature                      (8 bytes, ASCII, zero-padded)
//! [0x20] EntryHeaderSize                (i64; must match the format)
//! [0x28] HeadersEnd                     (i64; end of names and aux tables)
//! [0x30] Unicode                        (u8, 0/1)
//! [0x31] Format                         (u8)
//! [0x32] Extended (0, 1, 4 or 0x80)     (u8)
//! [0x33] Reserved, zero                 (u8)
//! [0x34] Reserved, zero                 (i32)
//! [0x38] AuxTablesOffset                (i64; zero unless Extended == 4)
//! ```
//!
//! The same header (with magic `BHF4` and a zero `HeadersEnd`) opens the
//! header stream of a [`Bxf4`](crate::formats::bxf4::Bxf4).

use std::fs;
use std::ops::Index;
use std::path::Path;

use log::debug;

use crate::compression::{Codec, default_codec};
use crate::formats::assembly::{
    Layout, read_count, read_headers, resolve_files, write_count, write_headers,
};
use crate::formats::aux_table::{AUX_ALIGNMENT, AuxTables};
use crate::formats::file::{BinderFile, find_by_id, find_by_name};
use crate::formats::format::Format;
use crate::formats::header::Generation;
use crate::io::{BinaryReader, BinaryWriter, Slot, TextEncoding};
use crate::{Error, Result};

/// Container marker.
pub const MAGIC: &[u8; 4] = b"BND4";

/// Size of the fixed generation-4 header.
pub const HEADER_SIZE: usize = 0x40;

/// Extended-byte value that places aux tables after the name pool.
pub const EXTENDED_AUX_TABLES: u8 = 4;

/// Offset of the format byte, read ahead of the fields it governs.
const FORMAT_OFFSET: usize = 0x31;

/// Header fields shared by BND4 and BHF4.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WideHeader {
    pub unk04: bool,
    pub unk05: bool,
    pub big_endian: bool,
    pub bit_big_endian: bool,
    pub signature: String,
    pub unicode: bool,
    /// Decides which fields each entry header carries.
    pub format: Format,
    pub extended: u8,
}

/// Header parse result: the fields plus what the entry table needs.
pub(crate) struct WideHeaderRead {
    pub header: WideHeader,
    pub count: usize,
    pub aux_offset: Option<usize>,
}

/// Slots left open by [`WideHeader::write`].
pub(crate) struct WideHeaderSlots {
    pub headers_end: Option<Slot<i64>>,
    pub aux_offset: Option<Slot<i64>>,
}

impl WideHeader {
    pub(crate) fn layout(&self) -> Layout {
        Layout {
            generation: Generation::Wide,
            format: self.format,
            names: TextEncoding::for_names(self.unicode),
        }
    }

    pub(crate) fn effective_big_endian(&self) -> bool {
        self.big_endian || self.format.force_big_endian()
    }

    /// Parse the 0x40-byte header and leave `r` at the entry table.
    ///
    /// With `tracks_headers_end` unset the `HeadersEnd` field must be zero.
    pub(crate) fn read(
        r: &mut BinaryReader<'_>,
        magic: &[u8; 4],
        tracks_headers_end: bool,
    ) -> Result<WideHeaderRead> {
        r.assert_magic(magic)?;
        let unk04 = r.bool("unk04")?;
        let unk05 = r.bool("unk05")?;
        for _ in 0..3 {
            r.assert_u8("header padding", &[0])?;
        }
        let big_endian = r.bool("big endian")?;
        let bit_big_endian = !r.bool("bit big endian")?;
        r.assert_u8("header padding", &[0])?;

        let format = Format::try_from(r.get_u8(FORMAT_OFFSET)?)?;
        r.set_big_endian(big_endian || format.force_big_endian());

        let count = read_count(r)?;
        r.assert_i64("header size", &[HEADER_SIZE as i64])?;
        let signature = r.fixed_string(TextEncoding::Ascii, 8)?;
        r.assert_i64("entry header size", &[format.header_size() as i64])?;
        if tracks_headers_end {
            r.i64()?;
        } else {
            r.assert_i64("headers end", &[0])?;
        }
        let unicode = r.bool("unicode")?;
        r.skip(1)?;
        let extended = r.assert_u8("extended", &[0, 1, EXTENDED_AUX_TABLES, 0x80])?;
        r.assert_u8("header padding", &[0])?;
        r.assert_i32("header padding", &[0])?;
        let aux_offset = if extended == EXTENDED_AUX_TABLES {
            let offset = r.i64()?;
            Some(usize::try_from(offset).map_err(|_| Error::InvalidRange)?)
        } else {
            r.assert_i64("aux tables offset", &[0])?;
            None
        };

        Ok(WideHeaderRead {
            header: WideHeader {
                unk04,
                unk05,
                big_endian,
                bit_big_endian,
                signature,
                unicode,
                format,
                extended,
            },
            count,
            aux_offset,
        })
    }

    /// Write the 0x40-byte header for `files`.
    pub(crate) fn write(
        &self,
        w: &mut BinaryWriter,
        magic: &[u8; 4],
        files: &[BinderFile],
        tracks_headers_end: bool,
    ) -> Result<WideHeaderSlots> {
        w.write_bytes(magic);
        w.write_bool(self.unk04);
        w.write_bool(self.unk05);
        w.write_zeros(3);
        w.write_bool(self.big_endian);
        w.write_bool(!self.bit_big_endian);
        w.write_u8(0);
        write_count(w, files)?;
        w.write_i64(HEADER_SIZE as i64);
        w.fixed_string(&self.signature, TextEncoding::Ascii, 8)?;
        w.write_i64(self.format.header_size() as i64);
        let headers_end = if tracks_headers_end {
            Some(w.reserve("headers end"))
        } else {
            w.write_i64(0);
            None
        };
        w.write_bool(self.unicode);
        w.write_u8(self.format.code());
        w.write_u8(self.extended);
        w.write_u8(0);
        w.write_i32(0);
        let aux_offset = if self.extended == EXTENDED_AUX_TABLES {
            Some(w.reserve("aux tables offset"))
        } else {
            w.write_i64(0);
            None
        };
        Ok(WideHeaderSlots {
            headers_end,
            aux_offset,
        })
    }
}

/// Write the aux tables (when the header reserved room for them).
pub(crate) fn write_aux_tables(
    w: &mut BinaryWriter,
    slot: Option<Slot<i64>>,
    aux: Option<&AuxTables>,
    entry_count: usize,
) -> Result<()> {
    let Some(slot) = slot else {
        return Ok(());
    };
    let aux = aux.ok_or(Error::Inconsistent("extended binder without aux tables"))?;
    if aux.second.len() != entry_count {
        return Err(Error::Inconsistent("aux table length differs from entry count"));
    }
    w.pad(AUX_ALIGNMENT);
    let offset = i64::try_from(w.position()).map_err(|_| Error::InvalidRange)?;
    w.fill(slot, offset)?;
    aux.write(w)
}

/// A parsed BND4 binder.
#[derive(Debug, Clone, PartialEq)]
pub struct Bnd4 {
    /// Preserved header flag.
    pub unk04: bool,
    /// Preserved header flag.
    pub unk05: bool,
    /// Header-level endianness flag.
    pub big_endian: bool,
    /// Preserved header flag; does not change how the format byte is read.
    pub bit_big_endian: bool,
    /// Free-form 8-byte signature.
    pub signature: String,
    /// Names are UTF-16 instead of Shift-JIS.
    pub unicode: bool,
    /// Decides which fields each entry header carries.
    pub format: Format,
    /// Extended byte; `4` means [`Bnd4::aux`] is present.
    pub extended: u8,
    /// Opaque tables carried by extended binders.
    pub aux: Option<AuxTables>,
    /// Entries in container order.
    pub files: Vec<BinderFile>,
}

impl Bnd4 {
    /// Empty little-endian, unicode-named binder.
    pub fn new(signature: impl Into<String>, format: Format) -> Self {
        Self {
            unk04: false,
            unk05: false,
            big_endian: false,
            bit_big_endian: false,
            signature: signature.into(),
            unicode: true,
            format,
            extended: 0,
            aux: None,
            files: Vec::new(),
        }
    }

    fn header(&self) -> WideHeader {
        WideHeader {
            unk04: self.unk04,
            unk05: self.unk05,
            big_endian: self.big_endian,
            bit_big_endian: self.bit_big_endian,
            signature: self.signature.clone(),
            unicode: self.unicode,
            format: self.format,
            extended: self.extended,
        }
    }

    fn from_parts(header: WideHeader, aux: Option<AuxTables>, files: Vec<BinderFile>) -> Self {
        Self {
            unk04: header.unk04,
            unk05: header.unk05,
            big_endian: header.big_endian,
            bit_big_endian: header.bit_big_endian,
            signature: header.signature,
            unicode: header.unicode,
            format: header.format,
            extended: header.extended,
            aux,
            files,
        }
    }

    /// Parse a BND4 using the default codec for compressed entries.
    pub fn read(bytes: &[u8]) -> Result<Self> {
        Self::read_with(bytes, default_codec())
    }

    /// Parse a BND4, decompressing entries through `codec`.
    pub fn read_with(bytes: &[u8], codec: &dyn Codec) -> Result<Self> {
        let mut r = BinaryReader::new(bytes);
        let WideHeaderRead {
            header,
            count,
            aux_offset,
        } = WideHeader::read(&mut r, MAGIC, true)?;

        let headers = read_headers(&mut r, count, header.layout())?;
        let aux = aux_offset
            .map(|offset| AuxTables::read(&mut r, offset, count))
            .transpose()?;
        let files = resolve_files(headers, &r, codec)?;

        debug!(
            "read BND4 format={} entries={} unicode={} extended={}",
            header.format,
            files.len(),
            header.unicode,
            header.extended
        );
        Ok(Self::from_parts(header, aux, files))
    }

    /// Serialize using the default codec for compressed entries.
    pub fn write(&self) -> Result<Vec<u8>> {
        self.write_with(default_codec())
    }

    /// Serialize, compressing flagged entries through `codec`.
    pub fn write_with(&self, codec: &dyn Codec) -> Result<Vec<u8>> {
        let header = self.header();
        let mut w = BinaryWriter::new(header.effective_big_endian());
        let slots = header.write(&mut w, MAGIC, &self.files, true)?;

        let data = write_headers(&mut w, &self.files, header.layout()).write_names(&mut w)?;
        write_aux_tables(&mut w, slots.aux_offset, self.aux.as_ref(), self.files.len())?;
        if let Some(slot) = slots.headers_end {
            let end = i64::try_from(w.position()).map_err(|_| Error::InvalidRange)?;
            w.fill(slot, end)?;
        }
        data.write_data(&mut w, None, codec)?;

        let bytes = w.finish()?;
        debug!(
            "wrote BND4 format={} entries={} size={:#x}",
            self.format,
            self.files.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Read and parse a BND4 file.
    pub fn read_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::read(&fs::read(path)?)
    }

    /// Serialize and write to `path`.
    pub fn write_path(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.write()?)?;
        Ok(())
    }

    /// Find an entry by its exact name.
    pub fn file_by_name(&self, name: &str) -> Option<&BinderFile> {
        find_by_name(&self.files, name)
    }

    /// Find an entry by ID.
    pub fn file_by_id(&self, id: i32) -> Option<&BinderFile> {
        find_by_id(&self.files, id)
    }
}

impl Index<&str> for Bnd4 {
    type Output = BinderFile;

    /// Index by entry name.
    ///
    /// # Panics
    /// Panics if no entry has that name.
    fn index(&self, index: &str) -> &Self::Output {
        self.file_by_name(index)
            .unwrap_or_else(|| panic!("no file '{index}' in BND4"))
    }
}
