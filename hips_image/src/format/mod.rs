//! Byte-plane image codecs underlying the `bytePng`/`byteJpeg` tile
//! encodings: thin wrappers around the [`image`] crate's PNG and JPEG
//! support, scoped to exactly the pixel layouts those two tile encodings use.

pub mod jpeg;
pub mod png;
