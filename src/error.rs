//! Library-wide error and result types.

use std::io;

use thiserror::Error;

/// Result alias used throughout fsbinder.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Every error is fatal to the read or write call that raised it. Offsets in
/// a binder depend on each other, so there is no partial result to hand back.
#[derive(Debug, Error)]
pub enum Error {
    /// The leading four bytes are not a marker of any binder kind.
    #[error("bad magic: {0:02X?}")]
    BadMagic([u8; 4]),

    /// The container's format byte is not one of the known codes.
    #[error("unsupported format code {0:#04x}")]
    UnsupportedFormat(u8),

    /// A constant or reserved field held a value no known variant uses.
    #[error("unexpected value {found:#x} for {field} at offset {offset:#x}")]
    Assert {
        field: &'static str,
        offset: usize,
        found: i64,
    },

    /// A read ran past the end of the buffer.
    #[error("unexpected end of data")]
    UnexpectedEof,

    /// An offset or size field points outside the valid region.
    #[error("invalid offset or size")]
    InvalidRange,

    /// A null-terminated string had no terminator before the end of data.
    #[error("unterminated string at offset {0:#x}")]
    UnterminatedString(usize),

    /// A string could not be represented in its target encoding.
    #[error("text encoding error: {0}")]
    Text(&'static str),

    /// `finish` was called while reservations were still outstanding.
    #[error("unfilled reservations: {0:?}")]
    UnfilledSlots(Vec<&'static str>),

    /// A reservation handle was presented to a writer that did not issue it.
    #[error("reservation belongs to another writer")]
    ForeignSlot,

    /// A split-stream header was given without its data stream.
    #[error("split-stream header; the data stream must be read alongside it")]
    NeedsDataStream,

    /// Container fields contradict each other and cannot be written.
    #[error("inconsistent container: {0}")]
    Inconsistent(&'static str),

    /// The compression collaborator rejected an entry.
    #[error("compression error: {0}")]
    Compression(String),

    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
