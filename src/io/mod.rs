//! Byte-level I/O shared by every container kind.
//!
//! * [`reader::BinaryReader`] - cursor over a borrowed slice with absolute
//!   offset lookups and value assertions.
//! * [`writer::BinaryWriter`] - append-only writer with reserve-then-fill
//!   slots for forward references.
//! * [`text::TextEncoding`] - ASCII / Shift-JIS / UTF-16 string codecs.

pub mod reader;
pub mod text;
pub mod writer;

pub use reader::BinaryReader;
pub use text::TextEncoding;
pub use writer::{BinaryWriter, Slot, SlotValue};
