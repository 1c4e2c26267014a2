//! The tile codec: a canonical in-memory [`Tile`] of float
//! samples, and the three on-disk tile encodings it round-trips through —
//! `floatImage`, `bytePng` and `byteJpeg`.

pub mod codec;
pub mod format;
pub mod tile;

pub use codec::{decode, encode};
pub use tile::Tile;
