//! BXF3 - generation-3 split binder (`.bhd` headers + `.bdt` data).
//!
//! ## BHF3 header stream
//! ```text
//! [0x00] Magic "BHF3"                   (4 bytes)
//! [0x04] Signature                      (8 bytes, ASCII, zero-padded)
//! [0x0C] Format                         (u8)
//! [0x0D] BigEndian                      (u8, 0/1)
//! [0x0E] BitBigEndian                   (u8, 0/1, preserved)
//! [0x0F] Reserved, zero                 (u8)
//! [0x10] FileCount                      (i32)
//! [0x14] Reserved, zero                 (i32 × 3)
//! [0x20] Entry headers, then the Shift-JIS name pool
//! ```
//!
//! ## BDF3 data stream
//! ```text
//! [0x00] Magic "BDF3"                   (4 bytes)
//! [0x04] Signature                      (8 bytes, ASCII, zero-padded)
//! [0x0C] Reserved, zero                 (i32)
//! [0x10] Data pool                      (each entry aligned to 0x10)
//! ```
//!
//! Data offsets in the header stream are absolute within the data stream.

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
use crate::Result;

/// Header stream marker.
pub const HEADER_MAGIC: &[u8; 4] = b"BHF3";

/// Data stream marker.
pub const DATA_MAGIC: &[u8; 4] = b"BDF3";

/// A parsed BXF3 header/data pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Bxf3 {
    /// Signature of the header stream.
    pub header_signature: String,
    /// Signature of the data stream; usually equal to the header's.
    pub data_signature: String,
    /// Decides which fields each entry header carries.
    pub format: Format,
    /// Header-level endianness flag, shared by both streams.
    pub big_endian: bool,
    /// Preserved header flag.
    pub bit_big_endian: bool,
    /// Entries in container order.
    pub files: Vec<BinderFile>,
}

impl Bxf3 {
    /// Empty little-endian binder with the same signature on both streams.
    pub fn new(signature: impl Into<String>, format: Format) -> Self {
        let signature = signature.into();
        Self {
            header_signature: signature.clone(),
            data_signature: signature,
            format,
            big_endian: false,
            bit_big_endian: false,
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

    fn effective_big_endian(&self) -> bool {
        self.big_endian || self.format.force_big_endian()
    }

    /// Parse a header stream and its data stream with the default codec.
    pub fn read(bhd: &[u8], bdt: &[u8]) -> Result<Self> {
        Self::read_with(bhd, bdt, default_codec())
    }

    /// Parse a header stream and its data stream through `codec`.
    pub fn read_with(bhd: &[u8], bdt: &[u8], codec: &dyn Codec) -> Result<Self> {
        let mut r = BinaryReader::new(bhd);
        r.assert_magic(HEADER_MAGIC)?;
        let header_signature = r.fixed_string(TextEncoding::Ascii, 8)?;
        let format = Format::try_from(r.u8()?)?;
        let big_endian = r.bool("big endian")?;
        let bit_big_endian = r.bool("bit big endian")?;
        r.assert_u8("header padding", &[0])?;
        r.set_big_endian(big_endian || format.force_big_endian());
        let count = read_count(&mut r)?;
        for _ in 0..3 {
            r.assert_i32("header padding", &[0])?;
        }

        let mut bxf = Self {
            header_signature,
            data_signature: String::new(),
            format,
            big_endian,
            bit_big_endian,
            files: Vec::new(),
        };
        let headers = read_headers(&mut r, count, bxf.layout())?;

        let mut data = BinaryReader::new(bdt);
        data.set_big_endian(r.big_endian());
        data.assert_magic(DATA_MAGIC)?;
        bxf.data_signature = data.fixed_string(TextEncoding::Ascii, 8)?;
        data.assert_i32("data header padding", &[0])?;

        bxf.files = resolve_files(headers, &data, codec)?;
        debug!(
            "read BXF3 format={} entries={} data={:#x}",
            format,
            bxf.files.len(),
            bdt.len()
        );
        Ok(bxf)
    }

    /// Serialize to `(bhd, bdt)` with the default codec.
    pub fn write(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        self.write_with(default_codec())
    }

    /// Serialize to `(bhd, bdt)`, compressing flagged entries through `codec`.
    pub fn write_with(&self, codec: &dyn Codec) -> Result<(Vec<u8>, Vec<u8>)> {
        let big_endian = self.effective_big_endian();
        let mut bhd = BinaryWriter::new(big_endian);
        bhd.write_bytes(HEADER_MAGIC);
        bhd.fixed_string(&self.header_signature, TextEncoding::Ascii, 8)?;
        bhd.write_u8(self.format.code());
        bhd.write_bool(self.big_endian);
        bhd.write_bool(self.bit_big_endian);
        bhd.write_u8(0);
        write_count(&mut bhd, &self.files)?;
        bhd.write_zeros(12);

        let mut bdt = BinaryWriter::new(big_endian);
        bdt.write_bytes(DATA_MAGIC);
        bdt.fixed_string(&self.data_signature, TextEncoding::Ascii, 8)?;
        bdt.write_i32(0);

        write_headers(&mut bhd, &self.files, self.layout())
            .write_names(&mut bhd)?
            .write_data(&mut bhd, Some(&mut bdt), codec)?;

        let (bhd, bdt) = (bhd.finish()?, bdt.finish()?);
        debug!(
            "wrote BXF3 format={} entries={} headers={:#x} data={:#x}",
            self.format,
            self.files.len(),
            bhd.len(),
            bdt.len()
        );
        Ok((bhd, bdt))
    }

    /// Read and parse a `.bhd`/`.bdt` pair.
    pub fn read_paths(bhd: impl AsRef<Path>, bdt: impl AsRef<Path>) -> Result<Self> {
        Self::read(&fs::read(bhd)?, &fs::read(bdt)?)
    }

    /// Serialize and write a `.bhd`/`.bdt` pair.
    pub fn write_paths(&self, bhd: impl AsRef<Path>, bdt: impl AsRef<Path>) -> Result<()> {
        let (headers, data) = self.write()?;
        fs::write(bhd, headers)?;
        fs::write(bdt, data)?;
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

impl Index<&str> for Bxf3 {
    type Output = BinderFile;

    /// Index by entry name.
    ///
    /// # Panics
    /// Panics if no entry has that name.
    fn index(&self, index: &str) -> &Self::Output {
        self.file_by_name(index)
            .unwrap_or_else(|| panic!("no file '{index}' in BXF3"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn sample() -> Bxf3 {
        let mut bxf = Bxf3::new("07D7R6", Format::IDS_NAMES);
        bxf.files.push(BinderFile::new(10, "chr\\c0000.anibnd", vec![0xAA; 5]));
        bxf.files.push(BinderFile::new(11, "chr\\c0000.chrbnd", vec![0xBB; 0x11]));
        bxf
    }

    #[test]
    fn payloads_live_in_the_data_stream() {
        let (bhd, bdt) = sample().write().unwrap();
        assert_eq!(&bhd[..4], b"BHF3");
        assert_eq!(&bdt[..4], b"BDF3");
        assert_eq!(&bdt[4..12], b"07D7R6\0\0");

        // First header's data offset points past the 0x10-byte BDF3 header.
        assert_eq!(&bhd[0x28..0x2C], &0x10u32.to_le_bytes());
        assert_eq!(&bdt[0x10..0x15], &[0xAA; 5]);
        assert_eq!(bdt.len(), 0x20 + 0x11);
        assert!(!bhd.windows(5).any(|w| w == [0xAA; 5]));
    }

    #[test]
    fn round_trip() {
        let bxf = sample();
        let (bhd, bdt) = bxf.write().unwrap();
        let back = Bxf3::read(&bhd, &bdt).unwrap();
        assert_eq!(back, bxf);
        assert_eq!(back["chr\\c0000.chrbnd"].bytes, vec![0xBB; 0x11]);
        assert_eq!(back.file_by_id(10).unwrap().len(), 5);
    }

    #[test]
    fn swapped_streams_are_rejected() {
        let (bhd, bdt) = sample().write().unwrap();
        assert!(matches!(
            Bxf3::read(&bdt, &bhd),
            Err(Error::BadMagic(found)) if &found == b"BDF3"
        ));
    }
}
