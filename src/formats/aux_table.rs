//! Auxiliary tables of extended generation-4 binders.
//!
//! When a BND4/BHF4 header's extended byte is `4`, two tables of integer
//! pairs follow the name pool. Their meaning is not interpreted here; they
//! are read, kept and written back unchanged.
//!
//! ## Layout
//! ```text
//! [0x00] SecondOffset              (i64, absolute)
//! [0x08] FirstCount                (i32)
//! [0x0C] Marker                    (u32)
//! [0x10] First table               (FirstCount × (i32, i32))
//! [SecondOffset]
//!        Second table              (EntryCount × (u32, i32))
//! ```
//! The second table has one pair per binder entry.

use crate::io::{BinaryReader, BinaryWriter};
use crate::{Error, Result};

/// Alignment applied before the tables are written.
pub(crate) const AUX_ALIGNMENT: usize = 0x8;

/// Opaque pair tables preserved byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuxTables {
    /// Four bytes following the first table's count.
    pub marker: u32,
    /// First table, in stored order.
    pub first: Vec<(i32, i32)>,
    /// Second table, in stored order.
    pub second: Vec<(u32, i32)>,
}

impl AuxTables {
    /// Read the tables at `offset` without moving the reader.
    pub(crate) fn read(r: &mut BinaryReader<'_>, offset: usize, entry_count: usize) -> Result<Self> {
        r.peek_at(offset, |r| {
            let second_offset =
                usize::try_from(r.i64()?).map_err(|_| Error::InvalidRange)?;
            let count_offset = r.position();
            let first_count = r.i32()?;
            let first_count = usize::try_from(first_count).map_err(|_| Error::Assert {
                field: "aux table count",
                offset: count_offset,
                found: first_count as i64,
            })?;
            let marker = r.u32()?;
            let first = (0..first_count)
                .map(|_| -> Result<(i32, i32)> { Ok((r.i32()?, r.i32()?)) })
                .collect::<Result<Vec<_>>>()?;

            r.seek(second_offset)?;
            let second = (0..entry_count)
                .map(|_| -> Result<(u32, i32)> { Ok((r.u32()?, r.i32()?)) })
                .collect::<Result<Vec<_>>>()?;

            Ok(Self {
                marker,
                first,
                second,
            })
        })
    }

    /// Write both tables at the current position.
    pub(crate) fn write(&self, w: &mut BinaryWriter) -> Result<()> {
        let second_offset = w.reserve::<i64>("aux second offset");
        w.write_i32(i32::try_from(self.first.len()).map_err(|_| Error::InvalidRange)?);
        w.write_u32(self.marker);
        for &(a, b) in &self.first {
            w.write_i32(a);
            w.write_i32(b);
        }

        let position = i64::try_from(w.position()).map_err(|_| Error::InvalidRange)?;
        w.fill(second_offset, position)?;
        for &(a, b) in &self.second {
            w.write_u32(a);
            w.write_i32(b);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_survive_a_write_and_read() {
        let tables = AuxTables {
            marker: 0x0008_0810,
            first: vec![(1, 0), (0, 1)],
            second: vec![(0xDEAD_BEEF, 0), (0x1234_5678, 1)],
        };
        let mut w = BinaryWriter::new(false);
        w.write_zeros(8);
        tables.write(&mut w).unwrap();
        let bytes = w.finish().unwrap();
        assert_eq!(bytes.len(), 8 + 0x10 + 2 * 8 + 2 * 8);
        assert_eq!(&bytes[8..16], &0x28i64.to_le_bytes());

        let mut r = BinaryReader::new(&bytes);
        let back = AuxTables::read(&mut r, 8, 2).unwrap();
        assert_eq!(back, tables);
        assert_eq!(r.position(), 0);
    }

    #[test]
    fn negative_count_is_corruption() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&0x10i64.to_le_bytes());
        bytes.extend_from_slice(&(-1i32).to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        let mut r = BinaryReader::new(&bytes);
        assert!(matches!(
            AuxTables::read(&mut r, 0, 0),
            Err(Error::Assert { field: "aux table count", offset: 8, found: -1 })
        ));
    }
}
