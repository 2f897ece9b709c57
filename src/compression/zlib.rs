//! zlib (RFC 1950) compression (requires the `compression` feature).
//!
//! The default scheme for compressed binder entries.

#![cfg(feature = "compression")]

use std::io::Write;

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use super::read_bounded;
use crate::Result;

/// Decompress a complete zlib stream, producing at most `limit` bytes.
pub fn decompress_zlib(data: &[u8], limit: Option<usize>) -> Result<Vec<u8>> {
    read_bounded(ZlibDecoder::new(data), limit, "zlib")
}

/// Compress `data` at the highest zlib level.
pub fn compress_zlib(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
