//! **fsbinder** - reading and writing FromSoftware binder archives.
//!
//! A binder packs named, optionally compressed files behind a table of
//! entry headers. Which fields each header carries is decided by a single
//! format byte; see [`formats::format`].
//!
//! # Supported formats
//! | Module | Format |
//! |--------|--------|
//! | [`formats::bnd3`] | BND3 - generation-3 single-file binder |
//! | [`formats::bnd4`] | BND4 - generation-4 single-file binder |
//! | [`formats::bxf3`] | BHF3/BDF3 - generation-3 split binder (`.bhd` + `.bdt`) |
//! | [`formats::bxf4`] | BHF4/BDF4 - generation-4 split binder (`.bhd` + `.bdt`) |
//!
//! # Example
//! ```no_run
//! use fsbinder::formats::{BinderFile, Bnd4, Format};
//!
//! let mut bnd = Bnd4::new("07D7R6", Format::IDS_NAMES_SIZES);
//! bnd.files.push(BinderFile::new(0, "a.txt", b"hello".to_vec()));
//! let bytes = bnd.write()?;
//! assert_eq!(Bnd4::read(&bytes)?["a.txt"].bytes, b"hello");
//! # Ok::<(), fsbinder::Error>(())
//! ```

pub mod compression;
pub mod error;
pub mod formats;
pub mod io;

pub use error::{Error, Result};
pub use formats::{Binder, BinderKind, read_binder, sniff};
