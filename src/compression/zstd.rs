//! Zstandard compression (requires the `compression` feature).

#![cfg(feature = "compression")]

use super::read_bounded;
use crate::{Error, Result};

/// Frame magic that opens every Zstandard stream.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Decompress a complete Zstandard-compressed buffer, producing at most
/// `limit` bytes.
pub fn decompress_zstd(data: &[u8], limit: Option<usize>) -> Result<Vec<u8>> {
    let decoder = zstd::stream::read::Decoder::with_buffer(data)
        .map_err(|e| Error::Compression(format!("zstd: {e}")))?;
    read_bounded(decoder, limit, "zstd")
}

/// Compress `data` at the library's default level.
pub fn compress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::encode_all(data, 0).map_err(|e| Error::Compression(format!("zstd: {e}")))
}
