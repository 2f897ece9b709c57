//! Header-table reading and the three-phase write shared by every binder.
//!
//! Writes run in a fixed order: every entry header, then every name, then
//! every payload, each phase visiting entries in container order. The
//! phases are separate types so they cannot be run out of order. Reads walk
//! the header table sequentially and resolve names and payloads through
//! absolute offsets, so the pools may be laid out in any order.

use log::trace;

use crate::compression::Codec;
use crate::formats::file::BinderFile;
use crate::formats::format::Format;
use crate::formats::header::{EntryHeader, Generation, PendingEntry};
use crate::io::{BinaryReader, BinaryWriter, TextEncoding};
use crate::{Error, Result};

/// How a container shapes its entry headers.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Layout {
    pub generation: Generation,
    pub format: Format,
    pub names: TextEncoding,
}

impl Layout {
    pub(crate) fn record_size(&self) -> usize {
        match self.generation {
            Generation::Narrow => self.format.narrow_header_size(),
            Generation::Wide => self.format.header_size(),
        }
    }
}

/// Read a container's `i32` entry count.
pub(crate) fn read_count(r: &mut BinaryReader<'_>) -> Result<usize> {
    let offset = r.position();
    let count = r.i32()?;
    usize::try_from(count).map_err(|_| Error::Assert {
        field: "entry count",
        offset,
        found: count as i64,
    })
}

pub(crate) fn write_count(w: &mut BinaryWriter, files: &[BinderFile]) -> Result<()> {
    w.write_i32(i32::try_from(files.len()).map_err(|_| Error::InvalidRange)?);
    Ok(())
}

/// Decode `count` consecutive entry headers at the reader's position.
pub(crate) fn read_headers(
    r: &mut BinaryReader<'_>,
    count: usize,
    layout: Layout,
) -> Result<Vec<EntryHeader>> {
    let table = count
        .checked_mul(layout.record_size())
        .ok_or(Error::InvalidRange)?;
    if table > r.remaining() {
        return Err(Error::UnexpectedEof);
    }
    (0..count)
        .map(|_| EntryHeader::read(r, layout.generation, layout.format, layout.names))
        .collect()
}

/// Turn decoded headers into entries, reading payloads from `data`.
pub(crate) fn resolve_files(
    headers: Vec<EntryHeader>,
    data: &BinaryReader<'_>,
    codec: &dyn Codec,
) -> Result<Vec<BinderFile>> {
    headers
        .into_iter()
        .map(|header| header.into_file(data, codec))
        .collect()
}

/// Headers written; names come next.
pub(crate) struct NamePhase<'f> {
    files: &'f [BinderFile],
    layout: Layout,
    pending: Vec<PendingEntry>,
}

/// Names written; payloads come next.
pub(crate) struct DataPhase<'f> {
    files: &'f [BinderFile],
    pending: Vec<PendingEntry>,
}

/// Write every entry header of `files` into `w`.
pub(crate) fn write_headers<'f>(
    w: &mut BinaryWriter,
    files: &'f [BinderFile],
    layout: Layout,
) -> NamePhase<'f> {
    trace!("writing {} headers at {:#x}", files.len(), w.position());
    let pending = files
        .iter()
        .map(|file| PendingEntry::write_header(w, file, layout.generation, layout.format))
        .collect();
    NamePhase {
        files,
        layout,
        pending,
    }
}

impl<'f> NamePhase<'f> {
    /// Write the name pool into the header stream.
    pub(crate) fn write_names(mut self, w: &mut BinaryWriter) -> Result<DataPhase<'f>> {
        trace!("writing name pool at {:#x}", w.position());
        for (pending, file) in self.pending.iter_mut().zip(self.files) {
            pending.write_name(w, file, self.layout.names)?;
        }
        Ok(DataPhase {
            files: self.files,
            pending: self.pending,
        })
    }
}

impl DataPhase<'_> {
    /// Write every payload and settle all size and offset slots.
    ///
    /// With `data` set, payloads go to that stream instead of `headers`.
    pub(crate) fn write_data(
        self,
        headers: &mut BinaryWriter,
        mut data: Option<&mut BinaryWriter>,
        codec: &dyn Codec,
    ) -> Result<()> {
        trace!("writing data pool");
        for (pending, file) in self.pending.into_iter().zip(self.files) {
            pending.write_data(headers, data.as_deref_mut(), file, codec)?;
        }
        Ok(())
    }
}
