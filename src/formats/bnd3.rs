//! BND3 - generation-3 single-stream binder.
//!
//! ## Layout
//! ```text
//! [0x00] BND3 header   (0x20 bytes)
//! [0x20] Entry headers (FileCount × narrow header size)
//! [...]  Name pool     (Shift-JIS, null-terminated; if the format has names)
//! [...]  Data pool     (each entry aligned to 0x10)
//! ```
//!
//! ## BND3 Header (0x20 bytes)
//! ```text
//! [0x00] Magic "BND3"                   (4 bytes)
//! [0x04] Signature                      (8 bytes, ASCII, zero-padded)
//! [0x0C] Format                         (u8)
//! [0x0D] BigEndian                      (u8, 0/1)
//! [0x0E] BitBigEndian                   (u8, 0/1, preserved)
//! [0x0F] Reserved, zero                 (u8)
//! [0x10] FileCount                      (i32)
//! [0x14] HeadersEnd                     (i32; end of the name pool)
//! [0x18] Unk18 (0 or 0x80000000)        (i32, preserved)
//! [0x1C] Reserved, zero                 (i32)
//! ```
//!
//! Multi-byte fields are big-endian when `BigEndian` is set or the format
//! forces it. Name and data offsets are absolute from the start of the file.

use std::fs;
use std::ops::Index;
use std::path::Path;

use log::debug;

use crate::compression::{Codec, default_codec};
use crate::formats::assembly::{
    Layout, read_count, read_headers, resolve_files, write_count, write_headers,
};
use crate::formats::file::{BinderFile, find_by_id, find_by_name};
use crate::formats::format::Format;
use crate::formats::header::Generation;
use crate::io::{BinaryReader, BinaryWriter, TextEncoding};
use crate::{Error, Result};

/// Container marker.
pub const MAGIC: &[u8; 4] = b"BND3";

/// Size of the fixed BND3 header.
pub const HEADER_SIZE: usize = 0x20;

/// A parsed BND3 binder.
#[derive(Debug, Clone, PartialEq)]
pub struct Bnd3 {
    /// Free-form 8-byte signature, usually a date code such as `07D7R6`.
    pub signature: String,
    /// Decides which fields each entry header carries.
    pub format: Format,
    /// Header-level endianness flag.
    pub big_endian: bool,
    /// Preserved header flag; does not change how the format byte is read.
    pub bit_big_endian: bool,
    /// Preserved; either `0` or `0x80000000` in shipped files.
    pub unk18: i32,
    /// Entries in container order.
    pub files: Vec<BinderFile>,
}

impl Bnd3 {
    /// Empty little-endian binder.
    pub fn new(signature: impl Into<String>, format: Format) -> Self {
        Self {
            signature: signature.into(),
            format,
            big_endian: false,
            bit_big_endian: false,
            unk18: 0,
            files: Vec::new(),
        }
    }

    fn layout(&self) -> Layout {
        Layout {
            generation: Generation::Narrow,
            format: self.format,
            names: TextEncoding::ShiftJis,
        }
    }

    /// Parse a BND3 using the default codec for compressed entries.
    pub fn read(bytes: &[u8]) -> Result<Self> {
        Self::read_with(bytes, default_codec())
    }

    /// Parse a BND3, decompressing entries through `codec`.
    pub fn read_with(bytes: &[u8], codec: &dyn Codec) -> Result<Self> {
        let mut r = BinaryReader::new(bytes);
        r.assert_magic(MAGIC)?;
        let signature = r.fixed_string(TextEncoding::Ascii, 8)?;
        let format = Format::try_from(r.u8()?)?;
        let big_endian = r.bool("big endian")?;
        let bit_big_endian = r.bool("bit big endian")?;
        r.assert_u8("header padding", &[0])?;
        r.set_big_endian(big_endian || format.force_big_endian());

        let count = read_count(&mut r)?;
        let _headers_end = r.i32()?;
        let unk18 = r.assert_i32("unk18", &[0, i32::MIN])?;
        r.assert_i32("header padding", &[0])?;

        let mut bnd = Self {
            signature,
            format,
            big_endian,
            bit_big_endian,
            unk18,
            files: Vec::new(),
        };
        let headers = read_headers(&mut r, count, bnd.layout())?;
        bnd.files = resolve_files(headers, &r, codec)?;

        debug!(
            "read BND3 format={} entries={} big_endian={}",
            format,
            bnd.files.len(),
            r.big_endian()
        );
        Ok(bnd)
    }

    /// Serialize using the default codec for compressed entries.
    pub fn write(&self) -> Result<Vec<u8>> {
        self.write_with(default_codec())
    }

    /// Serialize, compressing flagged entries through `codec`.
    pub fn write_with(&self, codec: &dyn Codec) -> Result<Vec<u8>> {
        let mut w = BinaryWriter::new(self.big_endian || self.format.force_big_endian());
        w.write_bytes(MAGIC);
        w.fixed_string(&self.signature, TextEncoding::Ascii, 8)?;
        w.write_u8(self.format.code());
        w.write_bool(self.big_endian);
        w.write_bool(self.bit_big_endian);
        w.write_u8(0);
        write_count(&mut w, &self.files)?;
        let headers_end = w.reserve::<i32>("headers end");
        w.write_i32(self.unk18);
        w.write_i32(0);

        let data = write_headers(&mut w, &self.files, self.layout()).write_names(&mut w)?;
        let end = i32::try_from(w.position()).map_err(|_| Error::InvalidRange)?;
        w.fill(headers_end, end)?;
        data.write_data(&mut w, None, codec)?;

        let bytes = w.finish()?;
        debug!(
            "wrote BND3 format={} entries={} size={:#x}",
            self.format,
            self.files.len(),
            bytes.len()
        );
        Ok(bytes)
    }

    /// Read and parse a BND3 file.
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

impl Index<&str> for Bnd3 {
    type Output = BinderFile;

    /// Index by entry name.
    ///
    /// # Panics
    /// Panics if no entry has that name.
    fn index(&self, index: &str) -> &Self::Output {
        self.file_by_name(index)
            .unwrap_or_else(|| panic!("no file '{index}' in BND3"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Bnd3 {
        let mut bnd = Bnd3::new("07D7R6", Format::IDS_NAMES_SIZES);
        bnd.files.push(BinderFile::new(100, "N:\\model\\a.flver", vec![1, 2, 3]));
        bnd.files.push(BinderFile::new(200, "N:\\model\\b.tpf", vec![]));
        bnd
    }

    #[test]
    fn header_fields() {
        let bytes = sample().write().unwrap();
        assert_eq!(&bytes[..4], b"BND3");
        assert_eq!(&bytes[4..12], b"07D7R6\0\0");
        assert_eq!(bytes[0x0C], 0x74);
        assert_eq!(&bytes[0x10..0x14], &2i32.to_le_bytes());
        let names_len = "N:\\model\\a.flver\0N:\\model\\b.tpf\0".len();
        let headers_end = 0x20 + 2 * 0x18 + names_len;
        assert_eq!(&bytes[0x14..0x18], &(headers_end as i32).to_le_bytes());
    }

    #[test]
    fn round_trip_is_byte_identical() {
        let bnd = sample();
        let bytes = bnd.write().unwrap();
        let back = Bnd3::read(&bytes).unwrap();
        assert_eq!(back, bnd);
        assert_eq!(back.write().unwrap(), bytes);
        assert_eq!(back["N:\\model\\a.flver"].bytes, [1, 2, 3]);
        assert_eq!(back.file_by_id(200).unwrap().len(), 0);
    }

    #[test]
    fn big_endian_header_and_entries() {
        let mut bnd = sample();
        bnd.big_endian = true;
        bnd.unk18 = i32::MIN;
        let bytes = bnd.write().unwrap();
        assert_eq!(&bytes[0x10..0x14], &[0, 0, 0, 2]);
        assert_eq!(&bytes[0x18..0x1C], &[0x80, 0, 0, 0]);
        assert_eq!(Bnd3::read(&bytes).unwrap(), bnd);
    }

    #[test]
    fn rejects_unknown_format_and_bad_unk18() {
        let mut bytes = sample().write().unwrap();
        bytes[0x0C] = 0x01;
        assert!(matches!(Bnd3::read(&bytes), Err(Error::UnsupportedFormat(0x01))));

        let mut bytes = sample().write().unwrap();
        bytes[0x18] = 1;
        assert!(matches!(
            Bnd3::read(&bytes),
            Err(Error::Assert { field: "unk18", offset: 0x18, .. })
        ));
    }
}
