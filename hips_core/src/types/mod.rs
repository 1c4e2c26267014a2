//! Core value types: byte buffers, tile identity, and frame/encoding enums.

mod blob;
pub use blob::*;

mod byte_range;
pub use byte_range::*;

mod frame;
pub use frame::*;

mod tile_encoding;
pub use tile_encoding::*;

mod tile_key;
pub use tile_key::*;
