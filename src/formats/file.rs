//! Binder entries.

use crate::compression::CompressionType;
use crate::formats::format::FileFlags;

/// One named file inside a binder.
///
/// `bytes` is always the logical payload. Stored sizes and offsets are
/// recomputed on every write and never kept here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BinderFile {
    /// Per-entry flag byte, preserved as read.
    pub flags: FileFlags,
    /// Entry ID; [`None`] when the container's format has no ID field.
    ///
    /// In a format that stores IDs, [`None`] is written as `-1` and reads
    /// back as `Some(-1)`.
    pub id: Option<i32>,
    /// Entry name; [`None`] when the container's format has no names.
    pub name: Option<String>,
    /// Scheme used when `flags` mark the entry as compressed.
    pub compression: CompressionType,
    /// Logical (decompressed) payload.
    pub bytes: Vec<u8>,
}

impl BinderFile {
    /// Plain entry with an ID and a name.
    pub fn new(id: i32, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            flags: FileFlags::PLAIN,
            id: Some(id),
            name: Some(name.into()),
            compression: CompressionType::default(),
            bytes: bytes.into(),
        }
    }

    /// Mark the entry compressed with `kind`.
    pub fn compressed(mut self, kind: CompressionType) -> Self {
        self.flags = FileFlags::COMPRESSED;
        self.compression = kind;
        self
    }

    /// Logical size in bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// First entry whose name matches exactly.
pub(crate) fn find_by_name<'a>(files: &'a [BinderFile], name: &str) -> Option<&'a BinderFile> {
    files.iter().find(|f| f.name.as_deref() == Some(name))
}

/// First entry with the given ID.
pub(crate) fn find_by_id(files: &[BinderFile], id: i32) -> Option<&BinderFile> {
    files.iter().find(|f| f.id == Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_use_first_match() {
        let files = vec![
            BinderFile::new(3, "a.txt", b"one".to_vec()),
            BinderFile::new(4, "b.txt", b"two".to_vec()),
            BinderFile::new(3, "a.txt", b"dup".to_vec()),
        ];
        assert_eq!(find_by_name(&files, "a.txt").unwrap().bytes, b"one");
        assert_eq!(find_by_id(&files, 4).unwrap().name.as_deref(), Some("b.txt"));
        assert!(find_by_name(&files, "missing").is_none());
    }

    #[test]
    fn compressed_builder_sets_flags() {
        let file = BinderFile::new(0, "x", Vec::new()).compressed(CompressionType::Zstd);
        assert!(file.flags.is_compressed());
        assert_eq!(file.compression, CompressionType::Zstd);
    }
}
