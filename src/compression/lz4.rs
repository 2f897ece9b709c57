//! LZ4 compression (requires the `compression` feature).
//!
//! Entries use the **size-prepended block format**: a little-endian `u32`
//! giving the decompressed byte count, immediately followed by the raw LZ4
//! block. This matches [`lz4_flex::decompress_size_prepended`].

#![cfg(feature = "compression")]

use crate::{Error, Result};

/// Upper bound on the LZ4 expansion ratio.
const MAX_RATIO: usize = 255;

/// Decompress a size-prepended LZ4 block.
///
/// A declared size the block could not possibly expand to, or one larger
/// than `limit`, is rejected before anything is allocated.
pub fn decompress_lz4(data: &[u8], limit: Option<usize>) -> Result<Vec<u8>> {
    let Some(&[a, b, c, d]) = data.first_chunk::<4>() else {
        return Err(Error::Compression("lz4: missing size prefix".into()));
    };
    let declared = u32::from_le_bytes([a, b, c, d]) as usize;
    if declared > (data.len() - 4).saturating_mul(MAX_RATIO) + 16 {
        return Err(Error::Compression("lz4: implausible decompressed size".into()));
    }
    if let Some(limit) = limit
        && declared > limit
    {
        return Err(Error::Compression(format!(
            "lz4: declared size {declared} exceeds the expected {limit} bytes"
        )));
    }
    lz4_flex::decompress_size_prepended(data).map_err(|e| Error::Compression(format!("lz4: {e}")))
}

/// Compress `data` into a size-prepended LZ4 block.
pub fn compress_lz4(data: &[u8]) -> Vec<u8> {
    lz4_flex::compress_prepend_size(data)
}
