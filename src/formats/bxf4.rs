//! BXF4 - generation-4 split binder (`.bhd` headers + `.bdt` data).
//!
//! The header stream opens with the BND4 header (magic `BHF4`, zero
//! `HeadersEnd`), followed by entry headers, the name pool and, for
//! extended binders, the aux tables. See [`bnd4`](crate::formats::bnd4).
//!
//! ## BDF4 data stream
//! ```text
//! [0x00] Magic "BDF4"                   (4 bytes)
//! [0x04] Unk04                          (u8, must match the BHF4)
//! [0x05] Unk05                          (u8, must match the BHF4)
//! [0x06] Reserved, zero                 (3 bytes)
//! [0x09] BigEndian                      (u8, must match the BHF4)
//! [0x0A] !BitBigEndian                  (u8, must match the BHF4)
//! [0x0B] Reserved, zero                 (u8)
//! [0x0C] Reserved, zero                 (i32)
//! [0x10] HeaderSize, always 0x30        (i64)
//! [0x18] Signature                      (8 bytes, ASCII, zero-padded)
//! [0x20] Reserved, zero                 (i64 × 2)
//! [0x30] Data pool                      (each entry aligned to 0x10)
//! ```

use std::fs;
use std::ops::Index;
use std::path::Path;

use log::debug;

use crate::compression::{Codec, default_codec};
use crate::formats::assembly::{read_headers, resolve_files, write_headers};
use crate::formats::aux_table::AuxTables;
use crate::formats::bnd4::{WideHeader, WideHeaderRead, write_aux_tables};
use crate::formats::file::{BinderFile, find_by_id, find_by_name};
use crate::formats::format::Format;
use crate::io::{BinaryReader, BinaryWriter, TextEncoding};
use crate::Result;

/// Header stream marker.
pub const HEADER_MAGIC: &[u8; 4] = b"BHF4";

/// Data stream marker.
pub const DATA_MAGIC: &[u8; 4] = b"BDF4";

/// Size of the BDF4 header.
pub const DATA_HEADER_SIZE: usize = 0x30;

/// A parsed BXF4 header/data pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Bxf4 {
    /// Preserved flag, shared by both streams.
    pub unk04: bool,
    /// Preserved flag, shared by both streams.
    pub unk05: bool,
    /// Endianness flag; must match in both streams.
    pub big_endian: bool,
    /// Preserved flag; must match in both streams.
    pub bit_big_endian: bool,
    /// Signature of the header stream.
    pub header_signature: String,
    /// Signature of the data stream.
    pub data_signature: String,
    /// Names are UTF-16 instead of Shift-JIS.
    pub unicode: bool,
    /// Decides which fields each entry header carries.
    pub format: Format,
    /// Extended byte; `4` means [`Bxf4::aux`] is present.
    pub extended: u8,
    /// Opaque tables carried by extended binders.
    pub aux: Option<AuxTables>,
    /// Entries in container order.
    pub files: Vec<BinderFile>,
}

/// Compare one BDF4 flag against the header stream's value.
fn agree(r: &mut BinaryReader<'_>, field: &'static str, expected: bool) -> Result<()> {
    r.assert_u8(field, &[u8::from(expected)])?;
    Ok(())
}

impl Bxf4 {
    /// Empty little-endian, unicode-named binder.
    pub fn new(signature: impl Into<String>, format: Format) -> Self {
        let signature = signature.into();
        Self {
            unk04: false,
            unk05: false,
            big_endian: false,
            bit_big_endian: false,
            header_signature: signature.clone(),
            data_signature: signature,
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
            signature: self.header_signature.clone(),
            unicode: self.unicode,
            format: self.format,
            extended: self.extended,
        }
    }

    /// Parse a header stream and its data stream with the default codec.
    pub fn read(bhd: &[u8], bdt: &[u8]) -> Result<Self> {
        Self::read_with(bhd, bdt, default_codec())
    }

    /// Parse a header stream and its data stream through `codec`.
    pub fn read_with(bhd: &[u8], bdt: &[u8], codec: &dyn Codec) -> Result<Self> {
        let mut r = BinaryReader::new(bhd);
        let WideHeaderRead {
            header,
            count,
            aux_offset,
        } = WideHeader::read(&mut r, HEADER_MAGIC, false)?;
        let headers = read_headers(&mut r, count, header.layout())?;
        let aux = aux_offset
            .map(|offset| AuxTables::read(&mut r, offset, count))
            .transpose()?;

        let mut data = BinaryReader::new(bdt);
        data.set_big_endian(r.big_endian());
        let data_signature = Self::read_data_header(&mut data, &header)?;
        let files = resolve_files(headers, &data, codec)?;

        debug!(
            "read BXF4 format={} entries={} data={:#x}",
            header.format,
            files.len(),
            bdt.len()
        );
        Ok(Self {
            unk04: header.unk04,
            unk05: header.unk05,
            big_endian: header.big_endian,
            bit_big_endian: header.bit_big_endian,
            header_signature: header.signature,
            data_signature,
            unicode: header.unicode,
            format: header.format,
            extended: header.extended,
            aux,
            files,
        })
    }

    fn read_data_header(r: &mut BinaryReader<'_>, header: &WideHeader) -> Result<String> {
        r.assert_magic(DATA_MAGIC)?;
        agree(r, "unk04", header.unk04)?;
        agree(r, "unk05", header.unk05)?;
        for _ in 0..3 {
            r.assert_u8("data header padding", &[0])?;
        }
        agree(r, "big endian", header.big_endian)?;
        agree(r, "bit big endian", !header.bit_big_endian)?;
        r.assert_u8("data header padding", &[0])?;
        r.assert_i32("data header padding", &[0])?;
        r.assert_i64("data header size", &[DATA_HEADER_SIZE as i64])?;
        let signature = r.fixed_string(TextEncoding::Ascii, 8)?;
        r.assert_i64("data header padding", &[0])?;
        r.assert_i64("data header padding", &[0])?;
        Ok(signature)
    }

    fn write_data_header(&self, w: &mut BinaryWriter) -> Result<()> {
        w.write_bytes(DATA_MAGIC);
        w.write_bool(self.unk04);
        w.write_bool(self.unk05);
        w.write_zeros(3);
        w.write_bool(self.big_endian);
        w.write_bool(!self.bit_big_endian);
        w.write_u8(0);
        w.write_i32(0);
        w.write_i64(DATA_HEADER_SIZE as i64);
        w.fixed_string(&self.data_signature, TextEncoding::Ascii, 8)?;
        w.write_i64(0);
        w.write_i64(0);
        Ok(())
    }

    /// Serialize to `(bhd, bdt)` with the default codec.
    pub fn write(&self) -> Result<(Vec<u8>, Vec<u8>)> {
        self.write_with(default_codec())
    }

    /// Serialize to `(bhd, bdt)`, compressing flagged entries through `codec`.
    pub fn write_with(&self, codec: &dyn Codec) -> Result<(Vec<u8>, Vec<u8>)> {
        let header = self.header();
        let big_endian = header.effective_big_endian();
        let mut bhd = BinaryWriter::new(big_endian);
        let slots = header.write(&mut bhd, HEADER_MAGIC, &self.files, false)?;

        let mut bdt = BinaryWriter::new(big_endian);
        self.write_data_header(&mut bdt)?;

        let data = write_headers(&mut bhd, &self.files, header.layout()).write_names(&mut bhd)?;
        write_aux_tables(&mut bhd, slots.aux_offset, self.aux.as_ref(), self.files.len())?;
        data.write_data(&mut bhd, Some(&mut bdt), codec)?;

        let (bhd, bdt) = (bhd.finish()?, bdt.finish()?);
        debug!(
            "wrote BXF4 format={} entries={} headers={:#x} data={:#x}",
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

impl Index<&str> for Bxf4 {
    type Output = BinderFile;

    /// Index by entry name.
    ///
    /// # Panics
    /// Panics if no entry has that name.
    fn index(&self, index: &str) -> &Self::Output {
        self.file_by_name(index)
            .unwrap_or_else(|| panic!("no file '{index}' in BXF4"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    fn sample() -> Bxf4 {
        let mut bxf = Bxf4::new("20180405", Format::IDS_NAMES_SIZES);
        bxf.files.push(BinderFile::new(0, "map\\m10_00.msb", vec![1; 9]));
        bxf.files.push(BinderFile::new(1, "map\\m10_01.msb", vec![2; 0x10]));
        bxf
    }

    #[test]
    fn header_stream_has_no_headers_end() {
        let (bhd, bdt) = sample().write().unwrap();
        assert_eq!(&bhd[..4], b"BHF4");
        assert_eq!(&bhd[0x28..0x30], &[0; 8]);
        assert_eq!(&bdt[..4], b"BDF4");
        assert_eq!(&bdt[0x10..0x18], &0x30i64.to_le_bytes());
        assert_eq!(&bdt[0x30..0x39], &[1; 9]);
        assert_eq!(&bdt[0x40..0x50], &[2; 0x10]);
    }

    #[test]
    fn round_trip_big_endian() {
        let mut bxf = sample();
        bxf.big_endian = true;
        bxf.unk04 = true;
        let (bhd, bdt) = bxf.write().unwrap();
        assert_eq!(&bdt[0x10..0x18], &0x30i64.to_be_bytes());
        assert_eq!(Bxf4::read(&bhd, &bdt).unwrap(), bxf);
    }

    #[test]
    fn data_flags_must_match_headers() {
        let (bhd, mut bdt) = sample().write().unwrap();
        bdt[0x04] = 1;
        assert!(matches!(
            Bxf4::read(&bhd, &bdt),
            Err(Error::Assert { field: "unk04", offset: 0x04, found: 1 })
        ));
    }
}
