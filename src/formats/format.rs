//! Format capability model.
//!
//! Every binder stores a one-byte format code that decides which optional
//! fields each entry header carries. The code is read once per container
//! and interpreted exactly as stored; the capability tables below are plain
//! membership sets over the 29 codes seen in shipped files.
//!
//! | Capability            | Codes |
//! |-----------------------|-------|
//! | forced big-endian     | `80 A0 C0 E0 E4 F0` |
//! | ID field              | `40 54 60 64 6C 70 74 7C 7E C0 E0 E4 F0` |
//! | name offset           | `10 20 24 26 2C 2E 30 3C 3E 54 60 64 6C 70 74 7C 7E A0 E0 E4 F0` |
//! | uncompressed size     | `0C 0E 24 26 2C 2E 3C 3E 54 64 6C 74 7C 7E E4` |
//! | 64-bit data offset    | `0C 0E 2C 2E 3C 3E 6C 7C 7E` |
//!
//! Code `0x20` additionally carries an `id:i32, 0:i32` pair after the name
//! offset in generation-4 headers.

use std::fmt;

use crate::{Error, Result};

/// Every format code known to appear in a binder header.
pub const KNOWN_FORMATS: [u8; 29] = [
    0x00, 0x02, 0x03, 0x0C, 0x0E, 0x10, 0x20, 0x24, 0x26, 0x2C, 0x2E, 0x30, 0x3C, 0x3E, 0x40, 0x54,
    0x60, 0x64, 0x6C, 0x70, 0x74, 0x7C, 0x7E, 0x80, 0xA0, 0xC0, 0xE0, 0xE4, 0xF0,
];

/// Container format code.
///
/// Only values from [`KNOWN_FORMATS`] can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Format(u8);

impl Format {
    /// IDs, names and uncompressed sizes; 32-bit offsets. The common case
    /// for both generations.
    pub const IDS_NAMES_SIZES: Format = Format(0x74);
    /// IDs and names only.
    pub const IDS_NAMES: Format = Format(0x60);
    /// Names with 64-bit offsets and uncompressed sizes.
    pub const NAMES_LONG_OFFSETS: Format = Format(0x2E);
    /// Names only, with the trailing ID quirk in generation-4 headers.
    pub const NAMES_WITH_TRAILING_ID: Format = Format(0x20);
    /// Forced big-endian with IDs and names.
    pub const BIG_ENDIAN_IDS_NAMES: Format = Format(0xE0);

    /// Accept `code` if it is one of the known formats.
    pub fn new(code: u8) -> Option<Self> {
        KNOWN_FORMATS.contains(&code).then_some(Format(code))
    }

    /// The raw byte as stored in the container header.
    #[inline]
    pub fn code(self) -> u8 {
        self.0
    }

    /// Multi-byte fields are big-endian regardless of the header flag.
    pub fn force_big_endian(self) -> bool {
        matches!(self.0, 0x80 | 0xA0 | 0xC0 | 0xE0 | 0xE4 | 0xF0)
    }

    /// Entry headers carry an `i32` ID.
    pub fn has_id(self) -> bool {
        matches!(
            self.0,
            0x40 | 0x54 | 0x60 | 0x64 | 0x6C | 0x70 | 0x74 | 0x7C | 0x7E | 0xC0 | 0xE0 | 0xE4 | 0xF0
        )
    }

    /// Entry headers carry a name offset.
    pub fn has_name(self) -> bool {
        matches!(
            self.0,
            0x10 | 0x20
                | 0x24
                | 0x26
                | 0x2C
                | 0x2E
                | 0x30
                | 0x3C
                | 0x3E
                | 0x54
                | 0x60
                | 0x64
                | 0x6C
                | 0x70
                | 0x74
                | 0x7C
                | 0x7E
                | 0xA0
                | 0xE0
                | 0xE4
                | 0xF0
        )
    }

    /// Entry headers carry the logical (uncompressed) size.
    pub fn has_uncompressed_size(self) -> bool {
        matches!(
            self.0,
            0x0C | 0x0E | 0x24 | 0x26 | 0x2C | 0x2E | 0x3C | 0x3E | 0x54 | 0x64 | 0x6C | 0x74 | 0x7C | 0x7E | 0xE4
        )
    }

    /// Data offsets are `i64` instead of `u32`.
    pub fn has_long_offsets(self) -> bool {
        matches!(self.0, 0x0C | 0x0E | 0x2C | 0x2E | 0x3C | 0x3E | 0x6C | 0x7C | 0x7E)
    }

    /// Generation-4 headers append an `id, 0` pair after the name offset.
    pub fn has_trailing_id(self) -> bool {
        self.0 == 0x20
    }

    /// Size in bytes of one generation-4 entry header.
    pub fn header_size(self) -> usize {
        0x10 + if self.has_uncompressed_size() { 8 } else { 0 }
            + if self.has_long_offsets() { 8 } else { 4 }
            + if self.has_id() { 4 } else { 0 }
            + if self.has_name() { 4 } else { 0 }
            + if self.has_trailing_id() { 8 } else { 0 }
    }

    /// Size in bytes of one generation-3 entry header.
    pub fn narrow_header_size(self) -> usize {
        0x08 + if self.has_long_offsets() { 8 } else { 4 }
            + if self.has_id() { 4 } else { 0 }
            + if self.has_name() { 4 } else { 0 }
            + if self.has_uncompressed_size() { 4 } else { 0 }
    }
}

impl TryFrom<u8> for Format {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self> {
        Format::new(code).ok_or(Error::UnsupportedFormat(code))
    }
}

impl From<Format> for u8 {
    fn from(format: Format) -> u8 {
        format.0
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#04x}", self.0)
    }
}

/// Per-entry flag byte.
///
/// Any value is accepted and preserved; only [`FileFlags::is_compressed`] is
/// interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileFlags(pub u8);

impl FileFlags {
    /// Plain, uncompressed entry.
    pub const PLAIN: FileFlags = FileFlags(0x40);
    /// Compressed entry.
    pub const COMPRESSED: FileFlags = FileFlags(0xC0);

    /// Stored bytes must go through the compression codec.
    pub fn is_compressed(self) -> bool {
        matches!(self.0, 0x03 | 0xC0)
    }
}

impl Default for FileFlags {
    fn default() -> Self {
        FileFlags::PLAIN
    }
}
