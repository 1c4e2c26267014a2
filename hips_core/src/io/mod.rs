//! Binary readers and writers used by the image container codec.
//!
//! # Overview
//!
//! FITS-like records are always big-endian. The [`ValueReader`]/[`ValueWriter`]
//! traits are generic over [`byteorder::ByteOrder`] so the same code could, in
//! principle, target a little-endian container too — the container codec picks
//! `BigEndian` explicitly.
//!
//! # Examples
//!
//! ```rust
//! use hips_core::io::*;
//! ```

mod value_reader;
mod value_reader_blob;
mod value_reader_slice;
mod value_writer;
mod value_writer_blob;
mod value_writer_file;

pub use value_reader::*;
pub use value_reader_blob::*;
pub use value_reader_slice::*;
pub use value_writer::*;
pub use value_writer_blob::*;
pub use value_writer_file::*;
