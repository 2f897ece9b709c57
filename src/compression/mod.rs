//! Per-entry compression.
//!
//! The binder core never compresses anything itself. When an entry's
//! [`FileFlags`](crate::formats::FileFlags) mark it as compressed, the entry
//! codec hands the stored bytes to a [`Codec`] and keeps the returned
//! [`CompressionType`] on the entry, so that writing it back uses the same
//! scheme.
//!
//! [`StandardCodec`] (requires the `compression` feature, on by default)
//! covers the schemes that have ordinary Rust implementations:
//!
//! | Module   | Algorithm | Detected by |
//! |----------|-----------|-------------|
//! | [`zlib`] | zlib/DEFLATE | RFC 1950 header (`0x78 ..`) |
//! | [`zstd`] | Zstandard | frame magic `28 B5 2F FD` |
//! | [`lz4`]  | LZ4 block, size-prepended | fallback when neither header matches |
//!
//! Anything else (vendor block compressors, the whole-file DCX wrapper) is
//! plugged in by implementing [`Codec`].

#[cfg(feature = "compression")]
pub mod lz4;

#[cfg(feature = "compression")]
pub mod zlib;

#[cfg(feature = "compression")]
pub mod zstd;

#[cfg(feature = "compression")]
use std::io::Read;

use crate::{Error, Result};

/// Compression scheme recorded on an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionType {
    /// zlib stream; the scheme new entries get unless told otherwise.
    #[default]
    Zlib,
    /// Zstandard frame.
    Zstd,
    /// Size-prepended LZ4 block.
    Lz4,
}

/// Compression collaborator consulted for entries flagged as compressed.
pub trait Codec {
    /// Expand stored bytes and report which scheme they used.
    ///
    /// `expected_len` is the logical size recorded in the entry header, when
    /// the format stores one; output beyond it is an error.
    fn decompress(
        &self,
        data: &[u8],
        expected_len: Option<usize>,
    ) -> Result<(Vec<u8>, CompressionType)>;

    /// Compress logical bytes with the given scheme.
    fn compress(&self, data: &[u8], kind: CompressionType) -> Result<Vec<u8>>;
}

/// Codec that fails every call.
///
/// Returned by [`default_codec`] when the crate is built without the
/// `compression` feature. Binders without compressed entries never call it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCodec;

impl Codec for NoCodec {
    fn decompress(
        &self,
        _data: &[u8],
        _expected_len: Option<usize>,
    ) -> Result<(Vec<u8>, CompressionType)> {
        Err(Error::Compression("no codec available".into()))
    }

    fn compress(&self, _data: &[u8], _kind: CompressionType) -> Result<Vec<u8>> {
        Err(Error::Compression("no codec available".into()))
    }
}

/// zlib / Zstandard / LZ4 codec.
#[cfg(feature = "compression")]
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardCodec;

#[cfg(feature = "compression")]
impl StandardCodec {
    /// Identify a stream by its header bytes.
    pub fn sniff(data: &[u8]) -> Option<CompressionType> {
        if data.starts_with(&self::zstd::ZSTD_MAGIC) {
            return Some(CompressionType::Zstd);
        }
        if let [cmf, flg, ..] = *data
            && cmf & 0x0F == 8
            && u16::from_be_bytes([cmf, flg]) % 31 == 0
        {
            return Some(CompressionType::Zlib);
        }
        None
    }
}

#[cfg(feature = "compression")]
impl Codec for StandardCodec {
    fn decompress(
        &self,
        data: &[u8],
        expected_len: Option<usize>,
    ) -> Result<(Vec<u8>, CompressionType)> {
        match Self::sniff(data) {
            Some(CompressionType::Zlib) => Ok((
                self::zlib::decompress_zlib(data, expected_len)?,
                CompressionType::Zlib,
            )),
            Some(CompressionType::Zstd) => Ok((
                self::zstd::decompress_zstd(data, expected_len)?,
                CompressionType::Zstd,
            )),
            Some(CompressionType::Lz4) | None => Ok((
                self::lz4::decompress_lz4(data, expected_len)?,
                CompressionType::Lz4,
            )),
        }
    }

    fn compress(&self, data: &[u8], kind: CompressionType) -> Result<Vec<u8>> {
        match kind {
            CompressionType::Zlib => self::zlib::compress_zlib(data),
            CompressionType::Zstd => self::zstd::compress_zstd(data),
            CompressionType::Lz4 => Ok(self::lz4::compress_lz4(data)),
        }
    }
}

/// Drain a decompressing reader, stopping one byte past `limit`.
#[cfg(feature = "compression")]
pub(crate) fn read_bounded(
    mut reader: impl Read,
    limit: Option<usize>,
    scheme: &str,
) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let read = match limit {
        Some(limit) => reader
            .take((limit as u64).saturating_add(1))
            .read_to_end(&mut out),
        None => reader.read_to_end(&mut out),
    };
    read.map_err(|e| Error::Compression(format!("{scheme}: {e}")))?;
    if let Some(limit) = limit
        && out.len() > limit
    {
        return Err(Error::Compression(format!(
            "{scheme}: output exceeds the expected {limit} bytes"
        )));
    }
    Ok(out)
}

/// Codec used by the `read`/`write` conveniences on every container.
pub fn default_codec() -> &'static dyn Codec {
    #[cfg(feature = "compression")]
    {
        static CODEC: StandardCodec = StandardCodec;
        &CODEC
    }
    #[cfg(not(feature = "compression"))]
    {
        static CODEC: NoCodec = NoCodec;
        &CODEC
    }
}

#[cfg(all(test, feature = "compression"))]
mod tests {
    use super::*;

    #[test]
    fn each_scheme_survives_the_standard_codec() {
        let data = b"binder payload binder payload binder payload".repeat(8);
        for kind in [CompressionType::Zlib, CompressionType::Zstd, CompressionType::Lz4] {
            let packed = StandardCodec.compress(&data, kind).unwrap();
            let (unpacked, found) = StandardCodec.decompress(&packed, None).unwrap();
            assert_eq!(found, kind);
            assert_eq!(unpacked, data);
        }
    }

    #[test]
    fn output_is_capped_at_the_expected_length() {
        let data = b"binder payload binder payload binder payload".repeat(8);
        for kind in [CompressionType::Zlib, CompressionType::Zstd, CompressionType::Lz4] {
            let packed = StandardCodec.compress(&data, kind).unwrap();
            let (unpacked, _) = StandardCodec.decompress(&packed, Some(data.len())).unwrap();
            assert_eq!(unpacked, data);
            assert!(
                matches!(
                    StandardCodec.decompress(&packed, Some(data.len() - 1)),
                    Err(Error::Compression(_))
                ),
                "{kind:?}"
            );
        }
    }

    #[test]
    fn sniff_recognises_headers() {
        assert_eq!(StandardCodec::sniff(&[0x78, 0xDA, 0]), Some(CompressionType::Zlib));
        assert_eq!(StandardCodec::sniff(&[0x78, 0x9C, 0]), Some(CompressionType::Zlib));
        assert_eq!(
            StandardCodec::sniff(&[0x28, 0xB5, 0x2F, 0xFD, 0]),
            Some(CompressionType::Zstd)
        );
        assert_eq!(StandardCodec::sniff(b"DCX\0"), None);
    }

    #[test]
    fn garbage_is_a_compression_error() {
        assert!(matches!(
            StandardCodec.decompress(&[0xFF, 0xFF, 0xFF, 0xFF, 1, 2, 3], None),
            Err(Error::Compression(_))
        ));
    }
}
