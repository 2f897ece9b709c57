//! Binder container formats.
//!
//! Each container module follows the same conventions:
//!
//! * **Whole-buffer parsing** - `read` takes the complete container as a
//!   byte slice and returns an owned value with every entry's logical bytes
//!   already decompressed. `read_path` / `read_paths` wrap [`std::fs::read`].
//! * **Byte-identical writes** - `write` recomputes every size and offset.
//!   Writing a freshly read container reproduces its input for any binder
//!   laid out in the standard order.
//! * **Compression is pluggable** - `read_with` / `write_with` take a
//!   [`Codec`](crate::compression::Codec); the plain variants use
//!   [`default_codec`](crate::compression::default_codec).
//!
//! ## Format overview
//!
//! | Module    | Format      | Description |
//! |-----------|-------------|-------------|
//! | [`bnd3`]  | BND3        | Generation-3 binder; 32-bit sizes, Shift-JIS names |
//! | [`bnd4`]  | BND4        | Generation-4 binder; 64-bit sizes, UTF-16 or Shift-JIS names |
//! | [`bxf3`]  | BHF3 + BDF3 | Generation-3 headers and data in separate files |
//! | [`bxf4`]  | BHF4 + BDF4 | Generation-4 headers and data in separate files |
//!
//! [`Binder`] and [`read_binder`] pick the container by its magic.

pub(crate) mod assembly;
pub mod aux_table;
pub mod bnd3;
pub mod bnd4;
pub mod bxf3;
pub mod bxf4;
pub mod file;
pub mod format;
pub(crate) mod header;

use std::fmt;

use log::debug;

pub use self::aux_table::AuxTables;
pub use self::bnd3::Bnd3;
pub use self::bnd4::Bnd4;
pub use self::bxf3::Bxf3;
pub use self::bxf4::Bxf4;
pub use self::file::BinderFile;
pub use self::format::{FileFlags, Format, KNOWN_FORMATS};

use crate::{Error, Result};

/// Container kind identified by a stream's leading magic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinderKind {
    /// Generation-3 single-stream binder.
    Bnd3,
    /// Generation-4 single-stream binder.
    Bnd4,
    /// BHF3 header stream; needs its BDF3 data stream.
    Bhf3,
    /// BHF4 header stream; needs its BDF4 data stream.
    Bhf4,
    /// BDF3 data stream; unreadable without its header stream.
    Bdf3,
    /// BDF4 data stream; unreadable without its header stream.
    Bdf4,
}

impl BinderKind {
    /// Whether the stream is one half of a split binder.
    pub fn is_split(self) -> bool {
        !matches!(self, Self::Bnd3 | Self::Bnd4)
    }
}

impl fmt::Display for BinderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bnd3 => "BND3",
            Self::Bnd4 => "BND4",
            Self::Bhf3 => "BHF3",
            Self::Bhf4 => "BHF4",
            Self::Bdf3 => "BDF3",
            Self::Bdf4 => "BDF4",
        })
    }
}

/// Identify a binder stream from its first four bytes.
pub fn sniff(bytes: &[u8]) -> Option<BinderKind> {
    let magic: &[u8; 4] = bytes.get(..4)?.try_into().ok()?;
    Some(match magic {
        bnd3::MAGIC => BinderKind::Bnd3,
        bnd4::MAGIC => BinderKind::Bnd4,
        bxf3::HEADER_MAGIC => BinderKind::Bhf3,
        bxf4::HEADER_MAGIC => BinderKind::Bhf4,
        bxf3::DATA_MAGIC => BinderKind::Bdf3,
        bxf4::DATA_MAGIC => BinderKind::Bdf4,
        _ => return None,
    })
}

/// Any parsed binder.
#[derive(Debug, Clone, PartialEq)]
pub enum Binder {
    /// Generation-3 single-stream binder.
    Bnd3(Bnd3),
    /// Generation-4 single-stream binder.
    Bnd4(Bnd4),
    /// Generation-3 split binder.
    Bxf3(Bxf3),
    /// Generation-4 split binder.
    Bxf4(Bxf4),
}

impl Binder {
    /// Parse a single-stream binder of either generation.
    ///
    /// Split-stream halves are recognised and rejected with
    /// [`Error::NeedsDataStream`]; use [`Binder::read_split`] for those.
    pub fn read(bytes: &[u8]) -> Result<Self> {
        let kind = sniff(bytes).ok_or_else(|| Error::BadMagic(leading_magic(bytes)))?;
        debug!("sniffed {kind} ({:#x} bytes)", bytes.len());
        match kind {
            BinderKind::Bnd3 => Bnd3::read(bytes).map(Self::Bnd3),
            BinderKind::Bnd4 => Bnd4::read(bytes).map(Self::Bnd4),
            _ => Err(Error::NeedsDataStream),
        }
    }

    /// Parse a split binder from its header and data streams.
    pub fn read_split(bhd: &[u8], bdt: &[u8]) -> Result<Self> {
        match sniff(bhd) {
            Some(BinderKind::Bhf3) => Bxf3::read(bhd, bdt).map(Self::Bxf3),
            Some(BinderKind::Bhf4) => Bxf4::read(bhd, bdt).map(Self::Bxf4),
            _ => Err(Error::BadMagic(leading_magic(bhd))),
        }
    }

    /// Kind of the (header) stream this binder was read from.
    pub fn kind(&self) -> BinderKind {
        match self {
            Self::Bnd3(_) => BinderKind::Bnd3,
            Self::Bnd4(_) => BinderKind::Bnd4,
            Self::Bxf3(_) => BinderKind::Bhf3,
            Self::Bxf4(_) => BinderKind::Bhf4,
        }
    }

    /// Format code shared by every entry header.
    pub fn format(&self) -> Format {
        match self {
            Self::Bnd3(b) => b.format,
            Self::Bnd4(b) => b.format,
            Self::Bxf3(b) => b.format,
            Self::Bxf4(b) => b.format,
        }
    }

    /// Entries in container order.
    pub fn files(&self) -> &[BinderFile] {
        match self {
            Self::Bnd3(b) => &b.files,
            Self::Bnd4(b) => &b.files,
            Self::Bxf3(b) => &b.files,
            Self::Bxf4(b) => &b.files,
        }
    }

    /// Entries in container order, mutably.
    pub fn files_mut(&mut self) -> &mut Vec<BinderFile> {
        match self {
            Self::Bnd3(b) => &mut b.files,
            Self::Bnd4(b) => &mut b.files,
            Self::Bxf3(b) => &mut b.files,
            Self::Bxf4(b) => &mut b.files,
        }
    }
}

/// Parse a single-stream binder, picking the generation by magic.
pub fn read_binder(bytes: &[u8]) -> Result<Binder> {
    Binder::read(bytes)
}

fn leading_magic(bytes: &[u8]) -> [u8; 4] {
    let mut magic = [0u8; 4];
    let n = bytes.len().min(4);
    magic[..n].copy_from_slice(&bytes[..n]);
    magic
}
