//! 2880-byte padded blocks: every header and every data segment in the
//! image container codec is padded up to a multiple of this size, the same
//! framing unit used by real FITS-style tooling (see `next_36_chunks_of_80_bytes`
//! in the CDS MOC deserializer this module is grounded on).

use super::record::RECORD_LEN;

pub const BLOCK_LEN: usize = 2880;
/// Number of 80-byte keyword records per header block.
pub const RECORDS_PER_BLOCK: usize = BLOCK_LEN / RECORD_LEN;

/// Rounds `len` up to the next multiple of [`BLOCK_LEN`].
#[must_use]
pub fn padded_len(len: usize) -> usize {
	len.div_ceil(BLOCK_LEN) * BLOCK_LEN
}

/// Appends zero padding to `buf` until its length is a multiple of [`BLOCK_LEN`].
pub fn pad_to_block_boundary(buf: &mut Vec<u8>) {
	let target = padded_len(buf.len());
	buf.resize(target, 0);
}

/// Appends ASCII-space padding (the FITS convention for header blocks, vs.
/// zero padding for data blocks) until `buf`'s length is a multiple of
/// [`BLOCK_LEN`].
pub fn pad_header_to_block_boundary(buf: &mut Vec<u8>) {
	let target = padded_len(buf.len());
	buf.resize(target, b' ');
}
