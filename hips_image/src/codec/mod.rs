//! The tile codec's format dispatch: `encode`/`decode` route to the
//! `floatImage`/`bytePng`/`byteJpeg` implementation named by a
//! [`TileEncoding`](hips_core::TileEncoding).

mod byte_jpeg;
mod byte_png;
mod float_image;

use crate::tile::Tile;
use anyhow::Result;
use hips_core::{TileEncoding, TileKey, hips_bail};
use hips_core::{HipsError, HipsErrorKind};

/// Encodes `pixels` (row-major, `width*width*depth` samples) for `key`'s tile
/// encoding, failing with [`HipsErrorKind::Encode`] on a length mismatch.
pub fn encode(key: &TileKey, pixels: &[f32], width: usize, depth: usize) -> Result<Vec<u8>> {
	if pixels.len() != width * width * depth {
		hips_bail!(
			HipsErrorKind::Encode,
			"pixel buffer length {} does not match width*width*depth = {}",
			pixels.len(),
			width * width * depth
		);
	}
	match key.encoding {
		TileEncoding::FloatImage => float_image::encode(key, pixels, width, depth),
		TileEncoding::BytePng => byte_png::encode(pixels, width, depth),
		TileEncoding::ByteJpeg => byte_jpeg::encode(pixels, width, depth),
	}
}

/// Decodes `bytes` into a canonical [`Tile`] per `key`'s tile encoding,
/// failing with [`HipsErrorKind::Decode`] if the container unit is not an
/// image.
pub fn decode(key: &TileKey, bytes: &[u8]) -> Result<Tile> {
	let err_not_image = || HipsError::new(HipsErrorKind::Decode, "container unit is not an image");
	match key.encoding {
		TileEncoding::FloatImage => float_image::decode(bytes).map_err(|_| anyhow::Error::new(err_not_image())),
		TileEncoding::BytePng => byte_png::decode(bytes).map_err(|_| anyhow::Error::new(err_not_image())),
		TileEncoding::ByteJpeg => byte_jpeg::decode(bytes).map_err(|_| anyhow::Error::new(err_not_image())),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use hips_core::Frame;
	use rstest::rstest;

	#[test]
	fn rejects_length_mismatch_before_dispatch() {
		let key = TileKey::new(1, 0, Frame::Equatorial, TileEncoding::FloatImage).unwrap();
		let err = encode(&key, &[0.0; 3], 4, 1).unwrap_err();
		assert!(err.to_string().contains("E-ENCODE"));
	}

	#[rstest]
	#[case(TileEncoding::FloatImage)]
	#[case(TileEncoding::BytePng)]
	#[case(TileEncoding::ByteJpeg)]
	fn dispatches_to_the_encoding_named_by_the_key(#[case] encoding: TileEncoding) {
		let key = TileKey::new(2, 7, Frame::Equatorial, encoding).unwrap();
		let pixels = vec![10.0f32, 20.0, 30.0, 40.0];
		let encoded = encode(&key, &pixels, 2, 1).unwrap();
		let tile = decode(&key, &encoded).unwrap();
		assert_eq!(tile.width, 2);
	}
}
